use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use note_pulse::{
    downloader::Downloader,
    types::{AudioArtifact, DownloadQuality},
};
use serde_json::json;

use super::StatusProbe;

/// Writes placeholder media files into the requested output directory
#[derive(Clone)]
pub struct MockDownloader {
    pub platform: String,
    pub video_id: String,
    pub calls: Arc<Mutex<Vec<(String, DownloadQuality, bool)>>>,
    pub video_calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
    pub probe: Option<StatusProbe>,
}

impl MockDownloader {
    pub fn new(platform: &str, video_id: &str) -> Self {
        Self {
            platform: platform.to_string(),
            video_id: video_id.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            video_calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            probe: None,
        }
    }

    pub fn failing(platform: &str, msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(platform, "abc123")
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        match self.fail_with {
            Some(ref msg) => Err(anyhow::anyhow!("{}", msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        quality: DownloadQuality,
        need_video: bool,
    ) -> anyhow::Result<AudioArtifact> {
        StatusProbe::record(&self.probe).await;
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), quality, need_video));
        self.check()?;

        tokio::fs::create_dir_all(output_dir).await?;
        let file_path = output_dir.join(format!("{}.mp3", self.video_id));
        tokio::fs::write(&file_path, b"ID3").await?;

        let raw_info = json!({"id": self.video_id, "tags": ["rust", "async"]});
        Ok(AudioArtifact {
            file_path,
            title: "Fearless Concurrency".into(),
            duration: 95.0,
            cover_url: None,
            platform: self.platform.clone(),
            video_id: self.video_id.clone(),
            raw_info: raw_info.as_object().cloned().unwrap_or_default(),
            video_path: None,
        })
    }

    async fn download_video(&self, url: &str, output_dir: &Path) -> anyhow::Result<PathBuf> {
        self.video_calls.lock().unwrap().push(url.to_string());
        self.check()?;

        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(format!("{}.mp4", self.video_id));
        tokio::fs::write(&path, b"mp4").await?;
        Ok(path)
    }
}
