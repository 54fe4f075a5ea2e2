use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    llm::{
        prompt::{build_prompt, strip_code_fence},
        summarizer::{SummarizationRequest, Summarizer},
        transcriber::Transcriber,
    },
    types::{TranscriptResult, TranscriptSegment},
    video::Ffmpeg,
};

/// Client for OpenAI-compatible APIs, usable both as a [`Transcriber`] and a
/// [`Summarizer`]
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    transcription_model: String,
    chat_model: String,
    temperature: f32,
    chunking: Option<ChunkingConfig>,
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub ffmpeg: Ffmpeg,
    pub chunk_duration_seconds: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl OpenAIClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const TRANSCRIPTION_MODEL: &'static str = "whisper-1";
    pub const CHAT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            transcription_model: Self::TRANSCRIPTION_MODEL.into(),
            chat_model: Self::CHAT_MODEL.into(),
            temperature: 0.7,
            chunking: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_transcription_model(mut self, model: impl Into<String>) -> Self {
        self.transcription_model = model.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Split audio into `chunk_duration_seconds` pieces before uploading,
    /// for endpoints with an upload size limit
    pub fn with_chunking(mut self, ffmpeg: Ffmpeg, chunk_duration_seconds: u16) -> Self {
        self.chunking = Some(ChunkingConfig {
            ffmpeg,
            chunk_duration_seconds,
        });
        self
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, OpenAIError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api { status, message });
        }
        Ok(resp)
    }

    pub async fn send_transcribe_request(
        &self,
        file: &Path,
        prompt: Option<String>,
    ) -> Result<(TranscribeResponse, serde_json::Value), OpenAIError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        let mime = match file.extension().and_then(|e| e.to_str()) {
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("wav") => "audio/wav",
            _ => "application/octet-stream",
        };
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)?;

        let mut form = reqwest::multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .part("file", part);

        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt);
        }

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        let raw = Self::check_response(resp)
            .await?
            .json::<serde_json::Value>()
            .await?;
        let response = serde_json::from_value::<TranscribeResponse>(raw.clone())?;

        Ok((response, raw))
    }

    pub async fn send_completion_request(
        &self,
        content: serde_json::Value,
    ) -> Result<CompletionResponse, OpenAIError> {
        let body = serde_json::json!({
            "model": self.chat_model,
            "temperature": self.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": content
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        Ok(Self::check_response(resp)
            .await?
            .json::<CompletionResponse>()
            .await?)
    }

    /// Chunk files for `file_path`, splitting it first if no chunks exist yet.
    ///
    /// Chunks are split into a temporary directory that is renamed to
    /// `{stem}_chunks` once ffmpeg succeeds, so an existing chunk directory is
    /// always complete.
    async fn prepare_chunks(
        &self,
        chunking: &ChunkingConfig,
        file_path: &Path,
    ) -> Result<Vec<PathBuf>, OpenAIError> {
        let base_name = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| OpenAIError::Ffmpeg("Invalid file path".into()))?;
        let parent = file_path.parent().unwrap_or_else(|| Path::new("."));
        let chunks_dir_path = parent.join(format!("{base_name}_chunks"));

        if tokio::fs::try_exists(&chunks_dir_path).await? {
            tracing::debug!("Reusing chunks at {}", chunks_dir_path.display());
            return Self::list_chunks(&chunks_dir_path).await;
        }

        let tmp_dir_path = parent.join(format!(
            ".{base_name}_chunks.{}.tmp",
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::create_dir_all(&tmp_dir_path).await?;

        tracing::info!("Splitting audio to chunks");
        let split = chunking
            .ffmpeg
            .split_audio_to_chunks(
                file_path,
                chunking.chunk_duration_seconds,
                &tmp_dir_path.join(format!("{base_name}_%03d.mp3")),
            )
            .await;
        if let Err(e) = split {
            if let Err(rm_err) = tokio::fs::remove_dir_all(&tmp_dir_path).await {
                tracing::warn!(error = ?rm_err, "Failed to remove partial chunks");
            }
            return Err(OpenAIError::Ffmpeg(format!("{e:#}")));
        }

        if let Err(e) = tokio::fs::rename(&tmp_dir_path, &chunks_dir_path).await {
            // another task finished the same split first
            tokio::fs::remove_dir_all(&tmp_dir_path).await?;
            if !tokio::fs::try_exists(&chunks_dir_path).await? {
                return Err(e.into());
            }
        }

        Self::list_chunks(&chunks_dir_path).await
    }

    async fn list_chunks(dir: &Path) -> Result<Vec<PathBuf>, OpenAIError> {
        let mut chunks = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            chunks.push(entry.path());
        }
        chunks.sort();
        Ok(chunks)
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscribeResponse {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    pub text: String,
    #[serde(default)]
    pub segments: Option<Vec<TranscribeSegment>>,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl Transcriber for OpenAIClient {
    type Error = OpenAIError;

    #[tracing::instrument(skip(self))]
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult, Self::Error> {
        let (chunks, chunk_duration) = match &self.chunking {
            Some(chunking) => (
                self.prepare_chunks(chunking, audio_path).await?,
                f64::from(chunking.chunk_duration_seconds),
            ),
            None => (vec![audio_path.to_path_buf()], 0.0),
        };

        let mut segments = Vec::new();
        let mut full_text = String::new();
        let mut raw_responses = Vec::with_capacity(chunks.len());
        let mut language = None;
        let mut time_offset = 0.0_f64;
        let mut previous_text = None;

        for chunk in &chunks {
            let (response, raw) = self
                .send_transcribe_request(chunk, previous_text)
                .await
                .inspect_err(|e| tracing::error!(error = %e, "Failed to transcribe audio"))?;

            language = language.or(response.language);
            segments.extend(response.segments.unwrap_or_default().into_iter().map(|seg| {
                TranscriptSegment {
                    start: seg.start + time_offset,
                    end: seg.end + time_offset,
                    text: seg.text.trim().to_string(),
                }
            }));

            full_text.push_str(response.text.trim());
            full_text.push(' ');
            previous_text = Some(response.text);
            raw_responses.push(raw);
            time_offset += chunk_duration;
        }

        let raw = if raw_responses.len() == 1 {
            raw_responses.pop()
        } else {
            Some(serde_json::Value::Array(raw_responses))
        };

        Ok(TranscriptResult {
            language,
            full_text: full_text.trim().to_string(),
            segments,
            raw,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAIClient {
    #[tracing::instrument(skip_all, fields(model = %self.chat_model, title = %request.title))]
    async fn summarize(&self, request: &SummarizationRequest) -> anyhow::Result<String> {
        let mut content = vec![serde_json::json!({
            "type": "text",
            "text": build_prompt(request),
        })];
        content.extend(request.video_img_urls.iter().map(|url| {
            serde_json::json!({
                "type": "image_url",
                "image_url": { "url": url, "detail": "auto" }
            })
        }));

        let response = self
            .send_completion_request(serde_json::Value::Array(content))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to summarize content"))?;

        let summary = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Api {
                status: 0,
                message: "No content in response".into(),
            })?;

        Ok(strip_code_fence(&summary).to_string())
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))
            .map_err(OpenAIError::from)?;

        let models = Self::check_response(resp)
            .await?
            .json::<ModelList>()
            .await
            .map_err(OpenAIError::from)?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}
