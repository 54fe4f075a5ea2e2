use std::{path::PathBuf, sync::Arc};

use note_datastore::DataStore;

use crate::{
    cleanup::{CleanupHook, NoopCleanup},
    downloader::{Downloader, DownloaderRegistry},
    llm::{summarizer::SummarizerFactory, transcriber::Transcriber},
    processor::{cache::TaskCache, status::StatusStore, NoteProcessor, PipelineConfig},
    video::{Ffmpeg, VideoProcessor},
};

pub struct NoteProcessorBuilder<D = (), T = (), S = ()> {
    config: PipelineConfig,
    store: D,
    transcriber: T,
    summarizers: S,
    downloaders: DownloaderRegistry,
    video: Arc<dyn VideoProcessor>,
    cleanup: Arc<dyn CleanupHook>,
}

impl NoteProcessorBuilder {
    pub fn new(note_output_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: PipelineConfig::new(note_output_dir, data_dir),
            store: (),
            transcriber: (),
            summarizers: (),
            downloaders: DownloaderRegistry::new(),
            video: Arc::new(Ffmpeg::default()),
            cleanup: Arc::new(NoopCleanup),
        }
    }
}

impl<D, T, S> NoteProcessorBuilder<D, T, S> {
    pub fn store<D2: DataStore + Send + Sync + 'static>(
        self,
        store: D2,
    ) -> NoteProcessorBuilder<D2, T, S> {
        NoteProcessorBuilder {
            config: self.config,
            store,
            transcriber: self.transcriber,
            summarizers: self.summarizers,
            downloaders: self.downloaders,
            video: self.video,
            cleanup: self.cleanup,
        }
    }

    pub fn transcriber<T2: Transcriber + Send + Sync + 'static>(
        self,
        transcriber: T2,
    ) -> NoteProcessorBuilder<D, T2, S> {
        NoteProcessorBuilder {
            config: self.config,
            store: self.store,
            transcriber,
            summarizers: self.summarizers,
            downloaders: self.downloaders,
            video: self.video,
            cleanup: self.cleanup,
        }
    }

    pub fn summarizers<S2: SummarizerFactory + Send + Sync + 'static>(
        self,
        summarizers: S2,
    ) -> NoteProcessorBuilder<D, T, S2> {
        NoteProcessorBuilder {
            config: self.config,
            store: self.store,
            transcriber: self.transcriber,
            summarizers,
            downloaders: self.downloaders,
            video: self.video,
            cleanup: self.cleanup,
        }
    }

    pub fn downloader(mut self, platform: impl Into<String>, downloader: Arc<dyn Downloader>) -> Self {
        self.downloaders = self.downloaders.register(platform, downloader);
        self
    }

    pub fn downloaders(mut self, downloaders: DownloaderRegistry) -> Self {
        self.downloaders = downloaders;
        self
    }

    pub fn video_processor(mut self, video: Arc<dyn VideoProcessor>) -> Self {
        self.video = video;
        self
    }

    pub fn cleanup(mut self, cleanup: Arc<dyn CleanupHook>) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn static_dir(mut self, static_dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = static_dir.into();
        self
    }

    pub fn image_base_url(mut self, image_base_url: impl Into<String>) -> Self {
        self.config.image_base_url = image_base_url.into();
        self
    }

    pub fn grid_unit_size(mut self, width: u32, height: u32) -> Self {
        self.config.grid_unit_width = width;
        self.config.grid_unit_height = height;
        self
    }

    pub fn grid_save_quality(mut self, quality: u8) -> Self {
        self.config.grid_save_quality = quality;
        self
    }
}

impl<D, T, S> NoteProcessorBuilder<D, T, S>
where
    D: DataStore + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    S: SummarizerFactory + Send + Sync + 'static,
{
    pub fn build(self) -> NoteProcessor<D, T, S> {
        let cache = TaskCache::new(&self.config.note_output_dir);
        let status = StatusStore::new(&self.config.note_output_dir);
        NoteProcessor {
            config: self.config,
            store: self.store,
            transcriber: self.transcriber,
            summarizers: self.summarizers,
            downloaders: self.downloaders,
            video: self.video,
            cleanup: self.cleanup,
            cache,
            status,
        }
    }
}
