pub mod builder;
pub mod cache;
pub mod status;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use note_datastore::DataStore;

use crate::{
    cleanup::{CleanupHook, TaskArtifacts},
    downloader::{Downloader, DownloaderRegistry},
    error::{Error, Stage},
    llm::{
        summarizer::{SummarizationRequest, Summarizer, SummarizerFactory},
        transcriber::Transcriber,
    },
    postprocess::{insert_links, PostProcessWarning, ScreenshotInserter},
    types::{AudioArtifact, NoteFormat, NoteRequest, NoteResult, TaskStatus, TranscriptResult},
    video::{FrameGridCapture, VideoProcessor},
};

use cache::TaskCache;
use status::StatusStore;

/// Directories and knobs the processor runs with
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Status files and stage checkpoints
    pub note_output_dir: PathBuf,
    /// Default download directory and root of the frame-grid scratch dirs
    pub data_dir: PathBuf,
    /// Where screenshots are written
    pub static_dir: PathBuf,
    /// Public prefix screenshots are served under
    pub image_base_url: String,
    pub grid_unit_width: u32,
    pub grid_unit_height: u32,
    pub grid_save_quality: u8,
}

impl PipelineConfig {
    pub fn new(note_output_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            note_output_dir: note_output_dir.into(),
            data_dir: data_dir.into(),
            static_dir: PathBuf::from("static/screenshots"),
            image_base_url: "/static/screenshots".into(),
            grid_unit_width: 1280,
            grid_unit_height: 720,
            grid_save_quality: 90,
        }
    }

    fn frame_dir(&self, task_id: &str) -> PathBuf {
        self.data_dir.join("frames").join(task_id)
    }

    fn grid_dir(&self, task_id: &str) -> PathBuf {
        self.data_dir.join("grids").join(task_id)
    }
}

/// Media produced by the DOWNLOADING stage
struct Media {
    audio: AudioArtifact,
    video_path: Option<PathBuf>,
    video_img_urls: Vec<String>,
    scratch_dirs: Vec<PathBuf>,
}

/// Drives one note generation task through
/// `PARSING -> DOWNLOADING -> TRANSCRIBING -> SUMMARIZING -> SAVING -> SUCCESS`,
/// checkpointing each stage so a re-run resumes where the last one stopped.
pub struct NoteProcessor<D, T, S>
where
    D: DataStore + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    S: SummarizerFactory + Send + Sync + 'static,
{
    config: PipelineConfig,
    store: D,
    transcriber: T,
    summarizers: S,
    downloaders: DownloaderRegistry,
    video: Arc<dyn VideoProcessor>,
    cleanup: Arc<dyn CleanupHook>,
    cache: TaskCache,
    status: StatusStore,
}

impl<D, T, S> NoteProcessor<D, T, S>
where
    D: DataStore + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    S: SummarizerFactory + Send + Sync + 'static,
{
    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn status_store(&self) -> &StatusStore {
        &self.status
    }

    pub fn cache(&self) -> &TaskCache {
        &self.cache
    }

    /// Runs the task to completion.
    ///
    /// On any error the status is set to FAILED with the error message before
    /// the error is returned.
    #[tracing::instrument(skip_all, fields(task_id = %request.task_id, platform = %request.platform))]
    pub async fn generate(&self, request: &NoteRequest) -> Result<NoteResult, Error> {
        let result = self.run_stages(request).await;

        if let Err(e) = &result {
            tracing::error!(error = %e, "Note generation failed");
            if let Err(status_err) = self
                .status
                .write(&request.task_id, TaskStatus::Failed, Some(e.to_string()))
                .await
            {
                tracing::error!(error = ?status_err, "Failed to record task failure");
            }
        }
        result
    }

    async fn run_stages(&self, request: &NoteRequest) -> Result<NoteResult, Error> {
        let task_id = request.task_id.as_str();

        self.status.write(task_id, TaskStatus::Parsing, None).await?;
        let downloader = self
            .downloaders
            .get(&request.platform)
            .ok_or_else(|| Error::PlatformNotSupported(request.platform.clone()))?;
        let summarizer = self
            .summarizers
            .summarizer(&request.provider_id, &request.model_name)
            .ok_or_else(|| Error::ProviderNotFound(request.provider_id.clone()))?;

        self.status.write(task_id, TaskStatus::Downloading, None).await?;
        let media = self
            .download(request, downloader.as_ref())
            .await
            .map_err(|e| Stage::Downloading.error(e))?;

        self.status.write(task_id, TaskStatus::Transcribing, None).await?;
        let transcript = self
            .transcribe(task_id, &media.audio)
            .await
            .map_err(|e| Stage::Transcribing.error(e))?;

        self.status.write(task_id, TaskStatus::Summarizing, None).await?;
        let markdown = self
            .summarize(request, summarizer.as_ref(), &media, &transcript)
            .await
            .map_err(|e| Stage::Summarizing.error(e))?;

        let (markdown, warnings) = self.post_process(request, &media, markdown).await;

        self.status.write(task_id, TaskStatus::Saving, None).await?;
        self.store
            .insert_video_task(&media.audio.video_id, &request.platform, task_id)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to record video task"))
            .map_err(|e| Stage::Saving.error(e))?;

        let Media {
            audio,
            video_path,
            scratch_dirs,
            ..
        } = media;
        let note = NoteResult {
            markdown,
            transcript,
            audio_meta: audio,
            warnings,
        };
        self.cache.store_note(task_id, &note).await;

        self.status.write(task_id, TaskStatus::Success, None).await?;
        tracing::info!("Note generated");

        let artifacts = TaskArtifacts {
            task_id: task_id.to_string(),
            platform: request.platform.clone(),
            audio_path: Some(note.audio_meta.file_path.clone()),
            video_path,
            scratch_dirs,
        };
        if let Err(e) = self.cleanup.on_success(&artifacts).await {
            tracing::warn!(error = ?e, "Cleanup hook failed");
        }

        Ok(note)
    }

    /// Companion video, frame grids, then audio (cached or freshly downloaded)
    #[tracing::instrument(skip_all)]
    async fn download(
        &self,
        request: &NoteRequest,
        downloader: &dyn Downloader,
    ) -> anyhow::Result<Media> {
        let task_id = request.task_id.as_str();
        let options = &request.options;
        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.data_dir.clone());

        let mut video_path = None;
        let mut video_img_urls = Vec::new();
        let mut scratch_dirs = Vec::new();

        if options.needs_video() {
            let path = downloader
                .download_video(&request.video_url, &output_dir)
                .await
                .context("Failed to download video")?;
            tracing::info!(path = %path.display(), "Downloaded video");

            if let Some(grid) = options.grid {
                let frame_dir = self.config.frame_dir(task_id);
                let grid_dir = self.config.grid_dir(task_id);
                scratch_dirs = vec![frame_dir.clone(), grid_dir.clone()];

                video_img_urls =
                    FrameGridCapture::new(self.video.as_ref(), path.clone(), frame_dir, grid_dir, grid)
                        .with_unit_size(self.config.grid_unit_width, self.config.grid_unit_height)
                        .with_save_quality(self.config.grid_save_quality)
                        .run()
                        .await
                        .context("Frame grid capture failed")?;
            }
            video_path = Some(path);
        }

        let audio = match self.cache.load_audio(task_id).await {
            Some(audio) => {
                tracing::info!("Using cached audio");
                audio
            }
            None => {
                let audio = downloader
                    .download(
                        &request.video_url,
                        &output_dir,
                        request.quality,
                        options.wants(NoteFormat::Screenshot),
                    )
                    .await
                    .context("Failed to download audio")?;
                self.cache.store_audio(task_id, &audio).await;
                audio
            }
        };

        let video_path = video_path.or_else(|| audio.video_path.clone());
        Ok(Media {
            audio,
            video_path,
            video_img_urls,
            scratch_dirs,
        })
    }

    #[tracing::instrument(skip_all)]
    async fn transcribe(
        &self,
        task_id: &str,
        audio: &AudioArtifact,
    ) -> anyhow::Result<TranscriptResult> {
        if let Some(transcript) = self.cache.load_transcript(task_id).await {
            tracing::info!("Using cached transcript");
            return Ok(transcript);
        }

        let transcript = self
            .transcriber
            .transcribe(&audio.file_path)
            .await
            .map_err(anyhow::Error::msg)?;
        self.cache.store_transcript(task_id, &transcript).await;
        Ok(transcript)
    }

    #[tracing::instrument(skip_all)]
    async fn summarize(
        &self,
        request: &NoteRequest,
        summarizer: &dyn Summarizer,
        media: &Media,
        transcript: &TranscriptResult,
    ) -> anyhow::Result<String> {
        let task_id = request.task_id.as_str();
        if let Some(markdown) = self.cache.load_markdown(task_id).await {
            tracing::info!("Using cached markdown");
            return Ok(markdown);
        }

        let summarization = SummarizationRequest {
            title: media.audio.title.clone(),
            segments: transcript.segments.clone(),
            tags: media.audio.tags().unwrap_or_default(),
            formats: request.options.formats.clone(),
            style: request.options.style,
            extras: request.options.extras.clone(),
            video_img_urls: media.video_img_urls.clone(),
        };
        let markdown = summarizer.summarize(&summarization).await?;
        self.cache.store_markdown(task_id, &markdown).await;
        Ok(markdown)
    }

    /// Screenshot substitution, then timestamp links. Never fails.
    async fn post_process(
        &self,
        request: &NoteRequest,
        media: &Media,
        markdown: String,
    ) -> (String, Vec<PostProcessWarning>) {
        let options = &request.options;
        let mut markdown = markdown;
        let mut warnings = Vec::new();

        if options.wants(NoteFormat::Screenshot) {
            let outcome = ScreenshotInserter::new(
                self.video.as_ref(),
                &self.config.static_dir,
                &self.config.image_base_url,
            )
            .insert(&markdown, media.video_path.as_deref())
            .await;
            markdown = outcome.markdown;
            warnings.extend(outcome.warnings);
        }

        if options.wants(NoteFormat::Link) {
            let outcome = insert_links(&markdown, &media.audio.video_id, &request.platform);
            markdown = outcome.markdown;
            warnings.extend(outcome.warnings);
        }

        for warning in &warnings {
            tracing::warn!(
                feature = %warning.feature,
                marker = ?warning.marker,
                message = %warning.message,
                "Post-processing skipped"
            );
        }
        (markdown, warnings)
    }

    /// Removes the status file and every checkpoint of `task_id`
    pub async fn purge_task(&self, task_id: &str) -> Result<(), Error> {
        self.cache.purge(task_id).await?;
        self.status.remove(task_id).await?;
        Ok(())
    }
}
