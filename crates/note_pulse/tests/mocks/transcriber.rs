use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use note_pulse::{
    types::{TranscriptResult, TranscriptSegment},
    Transcriber,
};

use super::StatusProbe;

#[derive(Clone)]
pub struct MockTranscriber {
    pub transcript: TranscriptResult,
    pub calls: Arc<Mutex<Vec<PathBuf>>>,
    pub fail_with: Option<String>,
    pub panic_with: Option<String>,
    pub probe: Option<StatusProbe>,
}

impl MockTranscriber {
    pub fn new(text: &str) -> Self {
        Self {
            transcript: TranscriptResult {
                language: Some("en".into()),
                full_text: text.to_string(),
                segments: vec![
                    TranscriptSegment {
                        start: 0.0,
                        end: 5.0,
                        text: "Welcome to the show.".into(),
                    },
                    TranscriptSegment {
                        start: 62.0,
                        end: 70.0,
                        text: text.to_string(),
                    },
                ],
                raw: None,
            },
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            panic_with: None,
            probe: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }

    pub fn panicking(msg: &str) -> Self {
        Self {
            panic_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }
}

impl Transcriber for MockTranscriber {
    type Error = anyhow::Error;

    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult, Self::Error> {
        StatusProbe::record(&self.probe).await;
        self.calls.lock().unwrap().push(audio_path.to_path_buf());
        if let Some(ref msg) = self.panic_with {
            panic!("{}", msg);
        }
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.transcript.clone())
    }
}
