use std::{
    io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    processor::status::write_atomic,
    types::{AudioArtifact, NoteResult, TranscriptResult},
};

/// Per-task stage checkpoints in the note output directory.
///
/// Reads never fail: a missing, unreadable or corrupt file is a cache miss.
#[derive(Debug, Clone)]
pub struct TaskCache {
    dir: PathBuf,
}

impl TaskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn audio_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}_audio.json"))
    }

    pub fn transcript_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}_transcript.json"))
    }

    pub fn markdown_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}_markdown.md"))
    }

    pub fn note_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}.json"))
    }

    async fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(error = ?e, path = ?path, "Unreadable cache file, ignoring");
                return None;
            }
        };
        serde_json::from_slice(&bytes)
            .inspect_err(|e| tracing::warn!(error = ?e, path = ?path, "Corrupt cache file, ignoring"))
            .ok()
    }

    /// Failed cache writes are logged and otherwise ignored
    async fn store_json<T: Serialize>(path: &Path, value: &T) {
        let result = match serde_json::to_vec_pretty(value) {
            Ok(contents) => write_atomic(path, &contents).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(error = ?e, path = ?path, "Failed to write cache file");
        }
    }

    pub async fn load_audio(&self, task_id: &str) -> Option<AudioArtifact> {
        Self::load_json(&self.audio_path(task_id)).await
    }

    pub async fn store_audio(&self, task_id: &str, audio: &AudioArtifact) {
        Self::store_json(&self.audio_path(task_id), audio).await
    }

    pub async fn load_transcript(&self, task_id: &str) -> Option<TranscriptResult> {
        Self::load_json(&self.transcript_path(task_id)).await
    }

    pub async fn store_transcript(&self, task_id: &str, transcript: &TranscriptResult) {
        Self::store_json(&self.transcript_path(task_id), transcript).await
    }

    /// Empty markdown counts as a miss
    pub async fn load_markdown(&self, task_id: &str) -> Option<String> {
        let path = self.markdown_path(task_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(markdown) if !markdown.trim().is_empty() => Some(markdown),
            Ok(_) => None,
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = ?e, path = ?path, "Unreadable cache file, ignoring");
                None
            }
        }
    }

    pub async fn store_markdown(&self, task_id: &str, markdown: &str) {
        let path = self.markdown_path(task_id);
        if let Err(e) = write_atomic(&path, markdown.as_bytes()).await {
            tracing::warn!(error = ?e, path = ?path, "Failed to write cache file");
        }
    }

    pub async fn load_note(&self, task_id: &str) -> Option<NoteResult> {
        Self::load_json(&self.note_path(task_id)).await
    }

    pub async fn store_note(&self, task_id: &str, note: &NoteResult) {
        Self::store_json(&self.note_path(task_id), note).await
    }

    /// Removes every checkpoint of `task_id`
    #[tracing::instrument(skip(self))]
    pub async fn purge(&self, task_id: &str) -> io::Result<()> {
        for path in [
            self.audio_path(task_id),
            self.transcript_path(task_id),
            self.markdown_path(task_id),
            self.note_path(task_id),
        ] {
            match tokio::fs::remove_file(&path).await {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}
