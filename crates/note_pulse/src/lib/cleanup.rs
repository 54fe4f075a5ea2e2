use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

/// Transient files left behind by a finished task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskArtifacts {
    pub task_id: String,
    pub platform: String,
    pub audio_path: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
    /// Per-task scratch directories of frame-grid capture
    pub scratch_dirs: Vec<PathBuf>,
}

/// Invoked by the processor once a task reaches SUCCESS.
///
/// Errors are logged by the caller and never change the task outcome.
#[async_trait]
pub trait CleanupHook: Send + Sync {
    async fn on_success(&self, artifacts: &TaskArtifacts) -> anyhow::Result<()>;
}

/// Keeps every artifact
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCleanup;

#[async_trait]
impl CleanupHook for NoopCleanup {
    async fn on_success(&self, _artifacts: &TaskArtifacts) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Deletes downloaded media and capture scratch directories.
///
/// Local uploads are the user's own files and are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempMediaCleanup;

impl TempMediaCleanup {
    async fn remove_path(path: &Path) -> io::Result<()> {
        let result = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => {
                tracing::debug!(path = ?path, "Removed");
                Ok(())
            }
        }
    }

    /// `{stem}.*` files and the `{stem}_chunks` directory next to `audio_path`
    async fn siblings(audio_path: &Path) -> io::Result<Vec<PathBuf>> {
        let Some(stem) = audio_path.file_stem().and_then(|s| s.to_str()) else {
            return Ok(Vec::new());
        };
        let dir = audio_path.parent().unwrap_or_else(|| Path::new("."));
        let chunks_dir = format!("{stem}_chunks");

        let mut siblings = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let same_stem = path.file_stem().and_then(|s| s.to_str()) == Some(stem);
            let is_chunks = entry.file_name().to_str() == Some(chunks_dir.as_str());
            if same_stem || is_chunks {
                siblings.push(path);
            }
        }
        Ok(siblings)
    }
}

#[async_trait]
impl CleanupHook for TempMediaCleanup {
    #[tracing::instrument(skip_all, fields(task_id = %artifacts.task_id))]
    async fn on_success(&self, artifacts: &TaskArtifacts) -> anyhow::Result<()> {
        let mut targets = artifacts.scratch_dirs.clone();

        if artifacts.platform != "local" {
            if let Some(audio_path) = &artifacts.audio_path {
                match Self::siblings(audio_path).await {
                    Ok(siblings) => targets.extend(siblings),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                targets.push(audio_path.clone());
            }
            targets.extend(artifacts.video_path.clone());
        }

        targets.sort();
        targets.dedup();

        let mut failures = 0;
        for target in &targets {
            if let Err(e) = Self::remove_path(target).await {
                tracing::warn!(error = ?e, path = ?target, "Failed to remove task artifact");
                failures += 1;
            }
        }
        if failures > 0 {
            anyhow::bail!("{failures} of {} artifacts could not be removed", targets.len());
        }
        tracing::info!(count = targets.len(), "Cleaned up task artifacts");
        Ok(())
    }
}
