use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use note_pulse::cleanup::{CleanupHook, TaskArtifacts};

use super::StatusProbe;

#[derive(Clone, Default)]
pub struct RecordingCleanup {
    pub calls: Arc<Mutex<Vec<TaskArtifacts>>>,
    pub fail_with: Option<String>,
    pub probe: Option<StatusProbe>,
}

#[async_trait]
impl CleanupHook for RecordingCleanup {
    async fn on_success(&self, artifacts: &TaskArtifacts) -> anyhow::Result<()> {
        StatusProbe::record(&self.probe).await;
        self.calls.lock().unwrap().push(artifacts.clone());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(())
    }
}
