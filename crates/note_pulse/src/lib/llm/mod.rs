pub mod openai;
pub mod prompt;
pub mod provider;
pub mod summarizer;
pub mod transcriber;
