use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use note_pulse::{SummarizationRequest, Summarizer, SummarizerFactory};

use super::StatusProbe;

#[derive(Clone)]
pub struct MockSummarizer {
    pub markdown: String,
    pub calls: Arc<Mutex<Vec<SummarizationRequest>>>,
    pub fail_with: Option<String>,
    pub probe: Option<StatusProbe>,
}

impl MockSummarizer {
    pub fn new(markdown: &str) -> Self {
        Self {
            markdown: markdown.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            probe: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, request: &SummarizationRequest) -> anyhow::Result<String> {
        StatusProbe::record(&self.probe).await;
        self.calls.lock().unwrap().push(request.clone());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.markdown.clone())
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["mock-gpt".into()])
    }
}

/// Serves `summarizer` for a single provider id
#[derive(Clone)]
pub struct MockSummarizerFactory {
    pub provider_id: String,
    pub summarizer: MockSummarizer,
}

impl MockSummarizerFactory {
    pub const PROVIDER_ID: &'static str = "mock-provider";

    pub fn new(summarizer: MockSummarizer) -> Self {
        Self {
            provider_id: Self::PROVIDER_ID.into(),
            summarizer,
        }
    }
}

impl SummarizerFactory for MockSummarizerFactory {
    fn summarizer(&self, provider_id: &str, _model_name: &str) -> Option<Arc<dyn Summarizer>> {
        (provider_id == self.provider_id).then(|| Arc::new(self.summarizer.clone()) as Arc<dyn Summarizer>)
    }
}
