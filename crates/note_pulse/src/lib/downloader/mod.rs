pub mod local;
pub mod url;
pub mod ytdlp;

use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use crate::types::{AudioArtifact, DownloadQuality};

pub use local::LocalDownloader;
pub use url::{extract_video_id, is_known_platform};
pub use ytdlp::YtDlpDownloader;

/// A media source for one or more platforms
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetches the audio track (and the companion video when `need_video`)
    /// into `output_dir`. Must tolerate an `output_dir` that already holds the
    /// artifact.
    async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        quality: DownloadQuality,
        need_video: bool,
    ) -> anyhow::Result<AudioArtifact>;

    /// Fetches the full video, returning its local path
    async fn download_video(&self, url: &str, output_dir: &Path) -> anyhow::Result<PathBuf>;
}

/// Static platform -> downloader map assembled at bootstrap
#[derive(Clone, Default)]
pub struct DownloaderRegistry {
    downloaders: BTreeMap<String, Arc<dyn Downloader>>,
}

impl DownloaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, platform: impl Into<String>, downloader: Arc<dyn Downloader>) -> Self {
        self.downloaders.insert(platform.into(), downloader);
        self
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn Downloader>> {
        self.downloaders.get(platform).cloned()
    }
}

impl Debug for DownloaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloaderRegistry")
            .field("platforms", &self.downloaders.keys().collect::<Vec<_>>())
            .finish()
    }
}
