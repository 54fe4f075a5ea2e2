use std::{
    io,
    path::{Path, PathBuf},
};

use crate::types::{StatusRecord, TaskStatus};

/// Writes `contents` to `path` through a temp file in the same directory and
/// a rename, so readers never observe a partial file.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;

    tokio::fs::create_dir_all(dir).await?;
    let tmp_path = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Per-task `{task_id}.status.json` files, each replaced atomically on every
/// transition
#[derive(Debug, Clone)]
pub struct StatusStore {
    dir: PathBuf,
}

impl StatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}.status.json"))
    }

    #[tracing::instrument(skip(self, message))]
    pub async fn write(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: Option<String>,
    ) -> io::Result<()> {
        let record = StatusRecord { status, message };
        let contents = serde_json::to_vec(&record)?;
        write_atomic(&self.path(task_id), &contents)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to write task status"))
    }

    /// Missing status file means the task has not started yet
    pub async fn read(&self, task_id: &str) -> io::Result<StatusRecord> {
        match tokio::fs::read(self.path(task_id)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(io::Error::from),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StatusRecord::pending()),
            Err(e) => Err(e),
        }
    }

    pub async fn remove(&self, task_id: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path(task_id)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
