use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{
    downloader::Downloader,
    types::{AudioArtifact, DownloadQuality},
    video::{Ffmpeg, VideoProcessor},
};

const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "m4a", "wav", "aac", "flac", "ogg", "opus"];

/// Media source for files already on disk. The "url" is a filesystem path.
#[derive(Debug, Clone, Default)]
pub struct LocalDownloader {
    ffmpeg: Ffmpeg,
}

impl LocalDownloader {
    pub fn new(ffmpeg: Ffmpeg) -> Self {
        Self { ffmpeg }
    }

    fn is_audio(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn stem(path: &Path) -> anyhow::Result<String> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("invalid local media path: {}", path.display()))
    }
}

#[async_trait]
impl Downloader for LocalDownloader {
    #[tracing::instrument(skip(self))]
    async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        quality: DownloadQuality,
        need_video: bool,
    ) -> anyhow::Result<AudioArtifact> {
        let source = PathBuf::from(url);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            anyhow::bail!("local media file not found: {}", source.display());
        }
        let video_id = Self::stem(&source)?;

        let (audio_path, video_path) = if Self::is_audio(&source) {
            (source.clone(), None)
        } else {
            tokio::fs::create_dir_all(output_dir).await?;
            let audio_mp3_path = output_dir.join(format!("{video_id}.mp3"));
            if !tokio::fs::try_exists(&audio_mp3_path).await.unwrap_or(false) {
                self.ffmpeg
                    .extract_audio(&source, &audio_mp3_path, quality.bitrate_kbps())
                    .await?;
            }
            (audio_mp3_path, need_video.then(|| source.clone()))
        };

        let duration = self
            .ffmpeg
            .probe_duration(&audio_path)
            .await
            .inspect_err(|e| tracing::warn!(error = ?e, "Could not probe duration"))
            .unwrap_or(0.0);

        let mut raw_info = Map::new();
        raw_info.insert(
            "path".into(),
            Value::String(source.display().to_string()),
        );

        Ok(AudioArtifact {
            file_path: audio_path,
            title: video_id.clone(),
            duration,
            cover_url: None,
            platform: "local".into(),
            video_id,
            raw_info,
            video_path,
        })
    }

    async fn download_video(&self, url: &str, _output_dir: &Path) -> anyhow::Result<PathBuf> {
        let source = PathBuf::from(url);
        if Self::is_audio(&source) {
            anyhow::bail!("{} is an audio file, no video track", source.display());
        }
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            anyhow::bail!("local media file not found: {}", source.display());
        }
        Ok(source)
    }
}
