#![allow(dead_code)]

pub mod cleanup;
pub mod datastore;
pub mod downloader;
pub mod summarizer;
pub mod transcriber;
pub mod video;

use std::sync::{Arc, Mutex};

use note_pulse::{types::TaskStatus, StatusStore};

/// Records the status a task has on disk at the moment a backend is called
#[derive(Clone)]
pub struct StatusProbe {
    pub store: StatusStore,
    pub task_id: String,
    pub seen: Arc<Mutex<Vec<TaskStatus>>>,
}

impl StatusProbe {
    pub fn new(store: StatusStore, task_id: &str) -> Self {
        Self {
            store,
            task_id: task_id.to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn record(probe: &Option<StatusProbe>) {
        if let Some(probe) = probe {
            let record = probe.store.read(&probe.task_id).await.unwrap();
            probe.seen.lock().unwrap().push(record.status);
        }
    }
}
