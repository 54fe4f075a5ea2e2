use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::process::Command;

use crate::{
    downloader::Downloader,
    types::{AudioArtifact, DownloadQuality},
};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Failed to spawn yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("yt-dlp exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("Invalid yt-dlp metadata: {0}")]
    InvalidInfo(#[from] serde_json::Error),
    #[error("yt-dlp metadata is missing `{0}`")]
    MissingField(&'static str),
    #[error("yt-dlp did not produce expected file: {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Media source backed by the `yt-dlp` executable.
///
/// One instance serves one platform key; yt-dlp itself handles every site it
/// knows about.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    platform: String,
    binary: PathBuf,
    cookies_path: Option<PathBuf>,
}

impl YtDlpDownloader {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            binary: PathBuf::from("yt-dlp"),
            cookies_path: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_cookies(mut self, cookies_path: Option<PathBuf>) -> Self {
        self.cookies_path = cookies_path;
        self
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>, DownloadError> {
        let mut command = Command::new(&self.binary);
        if let Some(cookies) = &self.cookies_path {
            command.arg("--cookies").arg(cookies);
        }
        let output = command
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(DownloadError::Spawn)?;

        if !output.status.success() {
            return Err(DownloadError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// yt-dlp's info dictionary for `url`
    #[tracing::instrument(skip(self))]
    async fn fetch_info(&self, url: &str) -> Result<Map<String, Value>, DownloadError> {
        let stdout = self
            .run(vec![
                "--dump-single-json".into(),
                "--no-playlist".into(),
                "--skip-download".into(),
                url.into(),
            ])
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch video info"))?;

        Ok(serde_json::from_slice::<Map<String, Value>>(&stdout)?)
    }

    fn video_id(info: &Map<String, Value>) -> Result<String, DownloadError> {
        info.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(DownloadError::MissingField("id"))
    }

    async fn fetch_video(
        &self,
        url: &str,
        output_dir: &Path,
        video_id: &str,
    ) -> Result<PathBuf, DownloadError> {
        let video_output_template = output_dir.join(format!("{video_id}.%(ext)s"));
        let video_mp4_path = output_dir.join(format!("{video_id}.mp4"));

        if tokio::fs::try_exists(&video_mp4_path).await.unwrap_or(false) {
            tracing::debug!("Video already exists at {}", video_mp4_path.display());
            return Ok(video_mp4_path);
        }

        self.run(vec![
            "-f".into(),
            "bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]/bv*+ba/b".into(),
            "--merge-output-format".into(),
            "mp4".into(),
            "--no-playlist".into(),
            "-o".into(),
            video_output_template.into_os_string(),
            url.into(),
        ])
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to download video"))?;

        if !tokio::fs::try_exists(&video_mp4_path).await.unwrap_or(false) {
            return Err(DownloadError::MissingOutput(video_mp4_path));
        }
        Ok(video_mp4_path)
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    #[tracing::instrument(skip(self), fields(platform = %self.platform))]
    async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        quality: DownloadQuality,
        need_video: bool,
    ) -> anyhow::Result<AudioArtifact> {
        tokio::fs::create_dir_all(output_dir).await?;

        let info = self.fetch_info(url).await?;
        let video_id = Self::video_id(&info)?;

        let audio_output_template = output_dir.join(format!("{video_id}.%(ext)s"));
        let audio_mp3_path = output_dir.join(format!("{video_id}.mp3"));

        // download audio if needed
        if !tokio::fs::try_exists(&audio_mp3_path).await.unwrap_or(false) {
            self.run(vec![
                "-x".into(),
                "--audio-format".into(),
                "mp3".into(),
                "--audio-quality".into(),
                format!("{}K", quality.bitrate_kbps()).into(),
                "--no-playlist".into(),
                "-o".into(),
                audio_output_template.into_os_string(),
                url.into(),
            ])
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to download audio"))?;

            if !tokio::fs::try_exists(&audio_mp3_path).await.unwrap_or(false) {
                return Err(DownloadError::MissingOutput(audio_mp3_path).into());
            }
        } else {
            tracing::debug!("Audio already exists at {}", audio_mp3_path.display());
        }

        let video_path = if need_video {
            Some(self.fetch_video(url, output_dir, &video_id).await?)
        } else {
            None
        };

        Ok(AudioArtifact {
            file_path: audio_mp3_path,
            title: info
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(&video_id)
                .to_string(),
            duration: info.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
            cover_url: info
                .get("thumbnail")
                .and_then(Value::as_str)
                .map(str::to_string),
            platform: self.platform.clone(),
            video_id,
            raw_info: info,
            video_path,
        })
    }

    #[tracing::instrument(skip(self), fields(platform = %self.platform))]
    async fn download_video(&self, url: &str, output_dir: &Path) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(output_dir).await?;
        let info = self.fetch_info(url).await?;
        let video_id = Self::video_id(&info)?;
        Ok(self.fetch_video(url, output_dir, &video_id).await?)
    }
}
