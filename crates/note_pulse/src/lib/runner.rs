use std::sync::Arc;

use note_datastore::DataStore;
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};

use crate::{
    downloader::{extract_video_id, is_known_platform},
    error::Error,
    llm::{summarizer::SummarizerFactory, transcriber::Transcriber},
    processor::NoteProcessor,
    types::{NoteRequest, NoteResult, TaskStatus},
};

/// What a status poll returns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPoll {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Present once the task reached SUCCESS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<NoteResult>,
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "task was cancelled".into();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    format!("task panicked: {detail}")
}

/// Accepts note requests, runs each on its own tokio task and answers
/// status polls
pub struct TaskRunner<D, T, S>
where
    D: DataStore + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    S: SummarizerFactory + Send + Sync + 'static,
{
    processor: Arc<NoteProcessor<D, T, S>>,
}

impl<D, T, S> Clone for TaskRunner<D, T, S>
where
    D: DataStore + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    S: SummarizerFactory + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
        }
    }
}

impl<D, T, S> TaskRunner<D, T, S>
where
    D: DataStore + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    S: SummarizerFactory + Send + Sync + 'static,
{
    pub fn new(processor: NoteProcessor<D, T, S>) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }

    pub fn processor(&self) -> &NoteProcessor<D, T, S> {
        &self.processor
    }

    /// Rejects a video that already has a note, then starts the task in the
    /// background. A task that panics or is cancelled is recorded as FAILED.
    ///
    /// Platforms without a registered downloader are not rejected here; the
    /// task itself fails with a configuration error and records FAILED.
    #[tracing::instrument(skip_all, fields(task_id = %request.task_id, platform = %request.platform))]
    pub async fn submit(
        &self,
        request: NoteRequest,
    ) -> Result<JoinHandle<Result<NoteResult, Error>>, Error> {
        if is_known_platform(&request.platform) {
            let video_id = extract_video_id(&request.video_url, &request.platform).ok_or_else(
                || Error::InvalidUrl {
                    url: request.video_url.clone(),
                    platform: request.platform.clone(),
                },
            )?;

            let existing = self
                .processor
                .store()
                .get_task_by_video(&video_id, &request.platform)
                .await
                .inspect_err(|e| tracing::error!(error = ?e, "Failed to look up video task"))
                .map_err(Error::DataStore)?;

            if let Some(task_id) = existing {
                tracing::warn!(%video_id, existing_task = %task_id, "Duplicate submission rejected");
                return Err(Error::DuplicateTask {
                    video_id,
                    platform: request.platform,
                    task_id,
                });
            }
        }

        let task_id = request.task_id.clone();
        let processor = Arc::clone(&self.processor);
        let worker = tokio::spawn(async move { processor.generate(&request).await });

        let processor = Arc::clone(&self.processor);
        Ok(tokio::spawn(async move {
            match worker.await {
                Ok(result) => result,
                Err(e) => {
                    let message = join_error_message(e);
                    tracing::error!(%task_id, %message, "Note task aborted");
                    if let Err(status_err) = processor
                        .status_store()
                        .write(&task_id, TaskStatus::Failed, Some(message.clone()))
                        .await
                    {
                        tracing::error!(error = ?status_err, "Failed to record task failure");
                    }
                    Err(Error::Aborted { task_id, message })
                }
            }
        }))
    }

    pub async fn poll(&self, task_id: &str) -> Result<TaskPoll, Error> {
        let record = self.processor.status_store().read(task_id).await?;
        let result = match record.status {
            TaskStatus::Success => self.processor.cache().load_note(task_id).await,
            _ => None,
        };
        Ok(TaskPoll {
            task_id: task_id.to_string(),
            status: record.status,
            message: record.message,
            result,
        })
    }

    /// Forgets the note of `(video_id, platform)` so it can be generated again,
    /// purging the checkpoints of the most recent task. Returns the number of
    /// association records removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_note(&self, video_id: &str, platform: &str) -> Result<u64, Error> {
        let store = self.processor.store();
        let latest = store
            .get_task_by_video(video_id, platform)
            .await
            .map_err(Error::DataStore)?;

        let removed = store
            .delete_task_by_video(video_id, platform)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to delete video task"))
            .map_err(Error::DataStore)?;

        if let Some(task_id) = latest {
            self.processor.purge_task(&task_id).await?;
        }
        tracing::info!(removed, "Deleted note");
        Ok(removed)
    }
}
