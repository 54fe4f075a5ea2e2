use std::fmt;

/// A fault-boundary stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    Transcribing,
    Summarizing,
    Saving,
}

impl Stage {
    pub fn error(self, source: anyhow::Error) -> Error {
        Error::Stage {
            stage: self,
            source,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Downloading => "download",
            Stage::Transcribing => "transcription",
            Stage::Summarizing => "summarization",
            Stage::Saving => "saving",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Platform not supported: {0}")]
    PlatformNotSupported(String),
    #[error("Summarization provider not found or not configured: {0}")]
    ProviderNotFound(String),
    #[error("{stage} failed: {source:#}")]
    Stage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
    #[error("Status store error: {0}")]
    Status(#[from] std::io::Error),
    #[error("A note for {platform} video {video_id} already exists (task {task_id})")]
    DuplicateTask {
        video_id: String,
        platform: String,
        task_id: String,
    },
    #[error("Could not extract a video id from {url} for platform {platform}")]
    InvalidUrl { url: String, platform: String },
    #[error("Datastore error: {0:#}")]
    DataStore(#[source] anyhow::Error),
    #[error("Task {task_id} aborted: {message}")]
    Aborted { task_id: String, message: String },
}

impl Error {
    /// Configuration errors are raised before any stage work begins
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::PlatformNotSupported(_) | Error::ProviderNotFound(_)
        )
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
