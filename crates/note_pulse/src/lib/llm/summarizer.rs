use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{NoteFormat, NoteStyle, TranscriptSegment};

/// Everything a summarization backend needs to write one note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizationRequest {
    pub title: String,
    pub segments: Vec<TranscriptSegment>,
    pub tags: String,
    pub formats: Vec<NoteFormat>,
    pub style: Option<NoteStyle>,
    pub extras: Option<String>,
    /// Inline images (usually `data:` URLs of frame grids) sent alongside the prompt
    pub video_img_urls: Vec<String>,
}

impl SummarizationRequest {
    pub fn screenshot(&self) -> bool {
        self.formats.contains(&NoteFormat::Screenshot)
    }

    pub fn link(&self) -> bool {
        self.formats.contains(&NoteFormat::Link)
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns the note as markdown
    async fn summarize(&self, request: &SummarizationRequest) -> anyhow::Result<String>;

    async fn list_models(&self) -> anyhow::Result<Vec<String>>;
}

/// Resolves a summarizer for a configured provider and model
pub trait SummarizerFactory {
    /// `None` when the provider is unknown or not usable (e.g. no api key)
    fn summarizer(&self, provider_id: &str, model_name: &str) -> Option<Arc<dyn Summarizer>>;
}

impl<F: SummarizerFactory> SummarizerFactory for &F {
    fn summarizer(&self, provider_id: &str, model_name: &str) -> Option<Arc<dyn Summarizer>> {
        (**self).summarizer(provider_id, model_name)
    }
}
