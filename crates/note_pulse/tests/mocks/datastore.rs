use std::sync::{Arc, Mutex};

use note_datastore::DataStore;

use super::StatusProbe;

#[derive(Clone, Default)]
pub struct MockDataStore {
    /// `(video_id, platform, task_id)` in insertion order
    pub tasks: Arc<Mutex<Vec<(String, String, String)>>>,
    pub fail_with: Option<String>,
    pub probe: Option<StatusProbe>,
}

impl MockDataStore {
    pub fn with_task(video_id: &str, platform: &str, task_id: &str) -> Self {
        let store = Self::default();
        store.tasks.lock().unwrap().push((
            video_id.to_string(),
            platform.to_string(),
            task_id.to_string(),
        ));
        store
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl DataStore for MockDataStore {
    async fn insert_video_task(
        &self,
        video_id: &str,
        platform: &str,
        task_id: &str,
    ) -> anyhow::Result<()> {
        StatusProbe::record(&self.probe).await;
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        self.tasks.lock().unwrap().push((
            video_id.to_string(),
            platform.to_string(),
            task_id.to_string(),
        ));
        Ok(())
    }

    async fn get_task_by_video(
        &self,
        video_id: &str,
        platform: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(v, p, _)| v == video_id && p == platform)
            .map(|(_, _, t)| t.clone()))
    }

    async fn delete_task_by_video(&self, video_id: &str, platform: &str) -> anyhow::Result<u64> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|(v, p, _)| !(v == video_id && p == platform));
        Ok((before - tasks.len()) as u64)
    }
}
