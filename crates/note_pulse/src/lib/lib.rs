//! Video to structured-note pipeline.
//!
//! A [`NoteProcessor`] downloads a video's audio, transcribes it, has a
//! language model summarize it into markdown and enriches the result with
//! screenshots and timestamp links. Each stage is checkpointed under the note
//! output directory and every transition is recorded in a per-task status
//! file that clients poll through a [`TaskRunner`].

pub mod cleanup;
pub mod downloader;
mod error;
mod llm;
pub mod postprocess;
mod processor;
mod runner;
pub mod tracing;
pub mod types;
pub mod video;

pub use error::{Error, Stage};
pub use llm::{
    openai::{self, OpenAIClient},
    prompt,
    provider::{ProviderConfig, ProviderRegistry},
    summarizer::{SummarizationRequest, Summarizer, SummarizerFactory},
    transcriber::Transcriber,
};
pub use processor::{
    builder::NoteProcessorBuilder, cache::TaskCache, status::StatusStore, NoteProcessor,
    PipelineConfig,
};
pub use runner::{TaskPoll, TaskRunner};
