mod mocks;

use std::{path::Path, sync::Arc};

use mocks::{
    cleanup::RecordingCleanup,
    datastore::MockDataStore,
    downloader::MockDownloader,
    summarizer::{MockSummarizer, MockSummarizerFactory},
    transcriber::MockTranscriber,
    video::MockVideoProcessor,
    StatusProbe,
};
use note_pulse::{
    types::{GridCapture, NoteFormat, NoteRequest, OutputOptions, TaskStatus},
    video::{CaptureError, FrameGridCapture},
    Error, NoteProcessor, NoteProcessorBuilder, Stage, StatusStore, TaskRunner,
};
use tempfile::TempDir;

const VIDEO_ID: &str = "dQw4w9WgXcQ";
const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

type TestProcessor = NoteProcessor<MockDataStore, MockTranscriber, MockSummarizerFactory>;

fn build_processor(
    workdir: &Path,
    store: MockDataStore,
    transcriber: MockTranscriber,
    summarizer: MockSummarizer,
    downloader: MockDownloader,
    video: MockVideoProcessor,
    cleanup: RecordingCleanup,
) -> TestProcessor {
    NoteProcessorBuilder::new(workdir.join("note_results"), workdir.join("data"))
        .store(store)
        .transcriber(transcriber)
        .summarizers(MockSummarizerFactory::new(summarizer))
        .downloader(downloader.platform.clone(), Arc::new(downloader))
        .video_processor(Arc::new(video))
        .cleanup(Arc::new(cleanup))
        .static_dir(workdir.join("static"))
        .image_base_url("/static/screenshots")
        .grid_unit_size(32, 18)
        .build()
}

fn request(task_id: &str, formats: Vec<NoteFormat>) -> NoteRequest {
    NoteRequest {
        task_id: task_id.to_string(),
        video_url: VIDEO_URL.into(),
        platform: "youtube".into(),
        quality: Default::default(),
        provider_id: MockSummarizerFactory::PROVIDER_ID.into(),
        model_name: "mock-gpt".into(),
        options: OutputOptions {
            formats,
            ..Default::default()
        },
    }
}

fn status_store(workdir: &Path) -> StatusStore {
    StatusStore::new(workdir.join("note_results"))
}

async fn status_of(workdir: &Path, task_id: &str) -> (TaskStatus, Option<String>) {
    let record = status_store(workdir).read(task_id).await.unwrap();
    (record.status, record.message)
}

// ─── Happy path ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_happy_path_generates_note() {
    let dir = TempDir::new().unwrap();
    let store = MockDataStore::default();
    let transcriber = MockTranscriber::new("Ownership moves values.");
    let summarizer = MockSummarizer::new("## Ownership\nValues have one owner.");
    let downloader = MockDownloader::new("youtube", VIDEO_ID);
    let cleanup = RecordingCleanup::default();

    let tasks = store.tasks.clone();
    let summarizer_calls = summarizer.calls.clone();
    let download_calls = downloader.calls.clone();
    let video_calls = downloader.video_calls.clone();
    let cleanup_calls = cleanup.calls.clone();

    let processor = build_processor(
        dir.path(),
        store,
        transcriber,
        summarizer,
        downloader,
        MockVideoProcessor::new(60.0),
        cleanup,
    );

    let note = processor.generate(&request("t1", vec![])).await.unwrap();

    assert_eq!(note.markdown, "## Ownership\nValues have one owner.");
    assert_eq!(note.audio_meta.video_id, VIDEO_ID);
    assert_eq!(note.transcript.full_text, "Ownership moves values.");
    assert!(note.warnings.is_empty());

    assert_eq!(status_of(dir.path(), "t1").await, (TaskStatus::Success, None));
    assert_eq!(
        *tasks.lock().unwrap(),
        vec![(VIDEO_ID.to_string(), "youtube".to_string(), "t1".to_string())]
    );

    // no video needed without screenshots or video understanding
    assert!(video_calls.lock().unwrap().is_empty());
    assert!(!download_calls.lock().unwrap()[0].2);

    let calls = summarizer_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].title, "Fearless Concurrency");
    assert_eq!(calls[0].tags, "rust, async");
    assert_eq!(calls[0].segments.len(), 2);
    assert!(calls[0].video_img_urls.is_empty());

    assert_eq!(cleanup_calls.lock().unwrap().len(), 1);

    let cache = processor.cache();
    assert!(cache.audio_path("t1").exists());
    assert!(cache.transcript_path("t1").exists());
    assert!(cache.markdown_path("t1").exists());
    assert_eq!(cache.load_note("t1").await, Some(note));
}

// ─── Caching and resume ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let transcriber = MockTranscriber::new("transcript");
    let summarizer = MockSummarizer::new("## Notes");
    let downloader = MockDownloader::new("youtube", VIDEO_ID);

    let transcriber_calls = transcriber.calls.clone();
    let summarizer_calls = summarizer.calls.clone();
    let download_calls = downloader.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        transcriber,
        summarizer,
        downloader,
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );

    let first = processor.generate(&request("t1", vec![])).await.unwrap();
    let second = processor.generate(&request("t1", vec![])).await.unwrap();

    assert_eq!(first.markdown, second.markdown);
    assert_eq!(transcriber_calls.lock().unwrap().len(), 1);
    assert_eq!(summarizer_calls.lock().unwrap().len(), 1);
    assert_eq!(download_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resume_after_summarization_failure_skips_finished_stages() {
    let dir = TempDir::new().unwrap();
    let transcriber = MockTranscriber::new("transcript");
    let transcriber_calls = transcriber.calls.clone();

    let failing = build_processor(
        dir.path(),
        MockDataStore::default(),
        transcriber.clone(),
        MockSummarizer::failing("rate limited"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );
    failing.generate(&request("t1", vec![])).await.unwrap_err();

    let downloader = MockDownloader::new("youtube", VIDEO_ID);
    let download_calls = downloader.calls.clone();
    let retry = build_processor(
        dir.path(),
        MockDataStore::default(),
        transcriber,
        MockSummarizer::new("## Recovered"),
        downloader,
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );
    let note = retry.generate(&request("t1", vec![])).await.unwrap();

    assert_eq!(note.markdown, "## Recovered");
    assert_eq!(transcriber_calls.lock().unwrap().len(), 1);
    assert!(download_calls.lock().unwrap().is_empty());
    assert_eq!(status_of(dir.path(), "t1").await.0, TaskStatus::Success);
}

#[tokio::test]
async fn test_truncated_transcript_cache_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let transcriber = MockTranscriber::new("fresh transcript");
    let transcriber_calls = transcriber.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        transcriber,
        MockSummarizer::new("## Notes"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );

    let transcript_path = processor.cache().transcript_path("t1");
    std::fs::create_dir_all(transcript_path.parent().unwrap()).unwrap();
    std::fs::write(&transcript_path, r#"{"language": "en", "full_text": "tru"#).unwrap();

    let note = processor.generate(&request("t1", vec![])).await.unwrap();

    assert_eq!(transcriber_calls.lock().unwrap().len(), 1);
    assert_eq!(note.transcript.full_text, "fresh transcript");

    let rewritten: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&transcript_path).unwrap()).unwrap();
    assert_eq!(rewritten["full_text"], "fresh transcript");
}

// ─── Status transitions ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_follows_success_chain() {
    let dir = TempDir::new().unwrap();
    let probe = StatusProbe::new(status_store(dir.path()), "t1");
    let seen = probe.seen.clone();

    let mut store = MockDataStore::default();
    store.probe = Some(probe.clone());
    let mut transcriber = MockTranscriber::new("transcript");
    transcriber.probe = Some(probe.clone());
    let mut summarizer = MockSummarizer::new("## Notes");
    summarizer.probe = Some(probe.clone());
    let mut downloader = MockDownloader::new("youtube", VIDEO_ID);
    downloader.probe = Some(probe.clone());
    let cleanup = RecordingCleanup {
        probe: Some(probe),
        ..Default::default()
    };

    let processor = build_processor(
        dir.path(),
        store,
        transcriber,
        summarizer,
        downloader,
        MockVideoProcessor::new(60.0),
        cleanup,
    );
    processor.generate(&request("t1", vec![])).await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            TaskStatus::Downloading,
            TaskStatus::Transcribing,
            TaskStatus::Summarizing,
            TaskStatus::Saving,
            TaskStatus::Success,
        ]
    );

    // every observation appears in chain order
    let positions = seen
        .iter()
        .map(|s| TaskStatus::SUCCESS_CHAIN.iter().position(|c| c == s).unwrap())
        .collect::<Vec<_>>();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

// ─── Failure containment ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_transcription_failure_marks_task_failed() {
    let dir = TempDir::new().unwrap();
    let summarizer = MockSummarizer::new("## Notes");
    let cleanup = RecordingCleanup::default();
    let summarizer_calls = summarizer.calls.clone();
    let cleanup_calls = cleanup.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::failing("model crashed"),
        summarizer,
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        cleanup,
    );

    let err = processor.generate(&request("t1", vec![])).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Transcribing));
    assert!(!err.is_configuration());

    let (status, message) = status_of(dir.path(), "t1").await;
    assert_eq!(status, TaskStatus::Failed);
    let message = message.unwrap();
    assert!(message.contains("transcription"), "{message}");
    assert!(message.contains("model crashed"), "{message}");

    assert!(summarizer_calls.lock().unwrap().is_empty());
    assert!(cleanup_calls.lock().unwrap().is_empty());
    assert!(!processor.cache().markdown_path("t1").exists());
    assert!(processor.cache().audio_path("t1").exists());
}

#[tokio::test]
async fn test_download_failure_marks_task_failed() {
    let dir = TempDir::new().unwrap();
    let transcriber = MockTranscriber::new("transcript");
    let transcriber_calls = transcriber.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        transcriber,
        MockSummarizer::new("## Notes"),
        MockDownloader::failing("youtube", "HTTP 403"),
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );

    let err = processor.generate(&request("t1", vec![])).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Downloading));

    let (status, message) = status_of(dir.path(), "t1").await;
    assert_eq!(status, TaskStatus::Failed);
    assert!(message.unwrap().starts_with("download failed"));
    assert!(transcriber_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_summarization_failure_marks_task_failed() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::failing("context length exceeded"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );

    let err = processor.generate(&request("t1", vec![])).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Summarizing));
    assert!(processor.cache().transcript_path("t1").exists());
    assert!(!processor.cache().markdown_path("t1").exists());

    let (status, message) = status_of(dir.path(), "t1").await;
    assert_eq!(status, TaskStatus::Failed);
    assert!(message.unwrap().contains("summarization failed"));
}

#[tokio::test]
async fn test_datastore_failure_marks_task_failed() {
    let dir = TempDir::new().unwrap();
    let cleanup = RecordingCleanup::default();
    let cleanup_calls = cleanup.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::failing("connection refused"),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Notes"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        cleanup,
    );

    let err = processor.generate(&request("t1", vec![])).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Saving));
    assert_eq!(status_of(dir.path(), "t1").await.0, TaskStatus::Failed);
    assert!(cleanup_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_platform_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let downloader = MockDownloader::new("youtube", VIDEO_ID);
    let download_calls = downloader.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Notes"),
        downloader,
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );

    let mut req = request("t1", vec![]);
    req.platform = "vimeo".into();
    let err = processor.generate(&req).await.unwrap_err();

    assert!(matches!(err, Error::PlatformNotSupported(ref p) if p == "vimeo"));
    assert!(err.is_configuration());
    let (status, message) = status_of(dir.path(), "t1").await;
    assert_eq!(status, TaskStatus::Failed);
    assert!(message.unwrap().contains("vimeo"));
    assert!(download_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_provider_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let downloader = MockDownloader::new("youtube", VIDEO_ID);
    let download_calls = downloader.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Notes"),
        downloader,
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    );

    let mut req = request("t1", vec![]);
    req.provider_id = "missing".into();
    let err = processor.generate(&req).await.unwrap_err();

    assert!(matches!(err, Error::ProviderNotFound(ref p) if p == "missing"));
    assert_eq!(status_of(dir.path(), "t1").await.0, TaskStatus::Failed);
    assert!(download_calls.lock().unwrap().is_empty());
}

// ─── Post-processing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_screenshots_and_links_are_inserted() {
    let dir = TempDir::new().unwrap();
    let video = MockVideoProcessor::new(120.0);
    let frame_calls = video.frame_calls.clone();
    let downloader = MockDownloader::new("youtube", VIDEO_ID);
    let video_calls = downloader.video_calls.clone();
    let download_calls = downloader.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Setup *Content-[01:02]\nInstall it.\n*Screenshot-[00:05]"),
        downloader,
        video,
        RecordingCleanup::default(),
    );

    let note = processor
        .generate(&request("t1", vec![NoteFormat::Screenshot, NoteFormat::Link]))
        .await
        .unwrap();

    assert!(note.warnings.is_empty(), "{:?}", note.warnings);
    assert!(note
        .markdown
        .contains("(https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=62s)"));
    assert!(note.markdown.contains("![](/static/screenshots/screenshot_0_"));
    assert!(!note.markdown.contains("Screenshot-["));

    assert_eq!(*frame_calls.lock().unwrap(), vec![5.0]);
    assert_eq!(video_calls.lock().unwrap().len(), 1);
    assert!(download_calls.lock().unwrap()[0].2);

    let screenshots = std::fs::read_dir(dir.path().join("static")).unwrap().count();
    assert_eq!(screenshots, 1);

    // cached markdown keeps the raw markers
    let cached = processor.cache().load_markdown("t1").await.unwrap();
    assert!(cached.contains("*Screenshot-[00:05]"));
}

#[tokio::test]
async fn test_screenshot_failure_does_not_fail_task() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Setup\n*Screenshot-[00:05]\n## Next *Content-[00:30]"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::failing("ffmpeg missing"),
        RecordingCleanup::default(),
    );

    let note = processor
        .generate(&request("t1", vec![NoteFormat::Screenshot, NoteFormat::Link]))
        .await
        .unwrap();

    assert_eq!(status_of(dir.path(), "t1").await.0, TaskStatus::Success);
    assert_eq!(note.warnings.len(), 1);
    assert_eq!(note.warnings[0].marker.as_deref(), Some("*Screenshot-[00:05]"));
    assert!(note.markdown.contains("*Screenshot-[00:05]"));
    assert!(note.markdown.contains("t=30s"));
}

#[tokio::test]
async fn test_bare_screenshot_marker_is_replaced() {
    let dir = TempDir::new().unwrap();
    let video = MockVideoProcessor::new(120.0);
    let frame_calls = video.frame_calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("intro *Screenshot-01:05 more text"),
        MockDownloader::new("youtube", VIDEO_ID),
        video,
        RecordingCleanup::default(),
    );

    let note = processor
        .generate(&request("t1", vec![NoteFormat::Screenshot]))
        .await
        .unwrap();

    assert!(note.warnings.is_empty(), "{:?}", note.warnings);
    assert!(note
        .markdown
        .starts_with("intro ![](/static/screenshots/screenshot_0_"));
    assert!(note.markdown.ends_with(".jpg) more text"));
    assert!(!note.markdown.contains("*Screenshot-01:05"));
    assert_eq!(*frame_calls.lock().unwrap(), vec![65.0]);
}

// ─── Frame grids ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_video_understanding_sends_frame_grids() {
    let dir = TempDir::new().unwrap();
    let summarizer = MockSummarizer::new("## Notes");
    let summarizer_calls = summarizer.calls.clone();
    let cleanup = RecordingCleanup::default();
    let cleanup_calls = cleanup.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        summarizer,
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(9.5),
        cleanup,
    );

    let mut req = request("t1", vec![]);
    req.options.video_understanding = true;
    req.options.grid = Some(GridCapture {
        cols: 2,
        rows: 2,
        interval_secs: 1,
        ..Default::default()
    });
    processor.generate(&req).await.unwrap();

    // 9 frames -> 2 complete grids of 4
    let calls = summarizer_calls.lock().unwrap();
    assert_eq!(calls[0].video_img_urls.len(), 2);
    assert!(calls[0]
        .video_img_urls
        .iter()
        .all(|url| url.starts_with("data:image/jpeg;base64,")));

    let artifacts = &cleanup_calls.lock().unwrap()[0];
    assert_eq!(
        artifacts.scratch_dirs,
        vec![
            dir.path().join("data").join("frames").join("t1"),
            dir.path().join("data").join("grids").join("t1"),
        ]
    );
    assert!(artifacts.video_path.is_some());
}

#[tokio::test]
async fn test_grid_capture_failure_fails_download_stage() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Notes"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::failing("decoder error"),
        RecordingCleanup::default(),
    );

    let mut req = request("t1", vec![]);
    req.options.video_understanding = true;
    req.options.grid = Some(GridCapture::default());
    let err = processor.generate(&req).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Downloading));
    assert_eq!(status_of(dir.path(), "t1").await.0, TaskStatus::Failed);
}

#[tokio::test]
async fn test_grid_capture_caps_frames_and_purges_scratch() {
    let dir = TempDir::new().unwrap();
    let frame_dir = dir.path().join("frames");
    let grid_dir = dir.path().join("grids");
    std::fs::create_dir_all(&frame_dir).unwrap();
    std::fs::create_dir_all(&grid_dir).unwrap();
    std::fs::write(frame_dir.join("frame_59_59.jpg"), b"stale").unwrap();
    std::fs::write(grid_dir.join("grid_7.jpg"), b"stale").unwrap();
    std::fs::write(grid_dir.join("keep.txt"), b"unrelated").unwrap();

    let video = MockVideoProcessor::new(100.0);
    let frame_calls = video.frame_calls.clone();
    let grid = GridCapture {
        cols: 2,
        rows: 2,
        interval_secs: 1,
        max_frames: 10,
    };

    let urls = FrameGridCapture::new(&video, "video.mp4", &frame_dir, &grid_dir, grid)
        .with_unit_size(32, 18)
        .run()
        .await
        .unwrap();

    // 10 frames -> 2 complete grids, the trailing 2 frames are dropped
    assert_eq!(urls.len(), 2);
    assert_eq!(frame_calls.lock().unwrap().len(), 10);

    let mut grids = std::fs::read_dir(&grid_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    grids.sort();
    assert_eq!(grids, vec!["grid_1.jpg", "grid_2.jpg", "keep.txt"]);
    assert!(!frame_dir.join("frame_59_59.jpg").exists());
}

#[tokio::test]
async fn test_grid_capture_rejects_empty_grid() {
    let dir = TempDir::new().unwrap();
    let video = MockVideoProcessor::new(10.0);
    let grid = GridCapture {
        cols: 0,
        rows: 2,
        interval_secs: 1,
        ..Default::default()
    };

    let err = FrameGridCapture::new(
        &video,
        "video.mp4",
        dir.path().join("frames"),
        dir.path().join("grids"),
        grid,
    )
    .run()
    .await
    .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidGrid { cols: 0, .. }));
}

#[tokio::test]
async fn test_grid_capture_rejects_overflowing_grid() {
    let dir = TempDir::new().unwrap();
    let video = MockVideoProcessor::new(10.0);
    let frame_calls = video.frame_calls.clone();
    let grid = GridCapture {
        cols: 65536,
        rows: 65536,
        interval_secs: 1,
        ..Default::default()
    };

    let err = FrameGridCapture::new(
        &video,
        "video.mp4",
        dir.path().join("frames"),
        dir.path().join("grids"),
        grid,
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, CaptureError::InvalidGrid { cols: 65536, .. }));
    assert!(frame_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_grid_capture_rejects_oversized_canvas() {
    let dir = TempDir::new().unwrap();
    let video = MockVideoProcessor::new(10.0);
    let grid = GridCapture {
        cols: 4096,
        rows: 4096,
        interval_secs: 1,
        ..Default::default()
    };

    let err = FrameGridCapture::new(
        &video,
        "video.mp4",
        dir.path().join("frames"),
        dir.path().join("grids"),
        grid,
    )
    .with_unit_size(1280, 720)
    .run()
    .await
    .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidGrid { .. }));
}

// ─── Cleanup ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cleanup_failure_does_not_fail_task() {
    let dir = TempDir::new().unwrap();
    let cleanup = RecordingCleanup {
        fail_with: Some("permission denied".into()),
        ..Default::default()
    };
    let cleanup_calls = cleanup.calls.clone();

    let processor = build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Notes"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        cleanup,
    );

    processor.generate(&request("t1", vec![])).await.unwrap();

    let calls = cleanup_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].task_id, "t1");
    assert_eq!(calls[0].platform, "youtube");
    assert_eq!(
        calls[0].audio_path.as_deref(),
        Some(dir.path().join("data").join(format!("{VIDEO_ID}.mp3")).as_path())
    );
    assert_eq!(status_of(dir.path(), "t1").await.0, TaskStatus::Success);
}

// ─── Task runner ─────────────────────────────────────────────────────────────

fn build_runner(
    workdir: &Path,
    store: MockDataStore,
) -> TaskRunner<MockDataStore, MockTranscriber, MockSummarizerFactory> {
    TaskRunner::new(build_processor(
        workdir,
        store,
        MockTranscriber::new("transcript"),
        MockSummarizer::new("## Notes"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        RecordingCleanup::default(),
    ))
}

#[tokio::test]
async fn test_submit_then_poll_returns_note() {
    let dir = TempDir::new().unwrap();
    let runner = build_runner(dir.path(), MockDataStore::default());

    let before = runner.poll("t1").await.unwrap();
    assert_eq!(before.status, TaskStatus::Pending);
    assert!(before.result.is_none());

    let handle = runner.submit(request("t1", vec![])).await.unwrap();
    handle.await.unwrap().unwrap();

    let poll = runner.poll("t1").await.unwrap();
    assert_eq!(poll.status, TaskStatus::Success);
    assert_eq!(poll.result.unwrap().markdown, "## Notes");
}

#[tokio::test]
async fn test_duplicate_submission_is_rejected() {
    let dir = TempDir::new().unwrap();
    let runner = build_runner(
        dir.path(),
        MockDataStore::with_task(VIDEO_ID, "youtube", "earlier-task"),
    );

    let err = runner.submit(request("t2", vec![])).await.unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateTask { ref task_id, .. } if task_id == "earlier-task"
    ));
    // never started
    assert_eq!(runner.poll("t2").await.unwrap().status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_unparsable_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let runner = build_runner(dir.path(), MockDataStore::default());

    let mut req = request("t1", vec![]);
    req.video_url = "https://www.youtube.com/".into();
    let err = runner.submit(req).await.unwrap_err();
    assert!(matches!(err, Error::InvalidUrl { .. }));
}

#[tokio::test]
async fn test_delete_note_allows_regeneration() {
    let dir = TempDir::new().unwrap();
    let store = MockDataStore::default();
    let runner = build_runner(dir.path(), store.clone());

    runner
        .submit(request("t1", vec![]))
        .await
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    assert!(runner.submit(request("t2", vec![])).await.is_err());

    let removed = runner.delete_note(VIDEO_ID, "youtube").await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(runner.poll("t1").await.unwrap().status, TaskStatus::Pending);
    assert!(!runner.processor().cache().markdown_path("t1").exists());

    runner
        .submit(request("t2", vec![]))
        .await
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(store.tasks.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_overflowing_grid_fails_submitted_task() {
    let dir = TempDir::new().unwrap();
    let runner = build_runner(dir.path(), MockDataStore::default());

    let mut req = request("t1", vec![]);
    req.options.video_understanding = true;
    req.options.grid = Some(GridCapture {
        cols: 65536,
        rows: 65536,
        interval_secs: 1,
        ..Default::default()
    });

    let err = runner.submit(req).await.unwrap().await.unwrap().unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Downloading));

    let poll = runner.poll("t1").await.unwrap();
    assert_eq!(poll.status, TaskStatus::Failed);
    assert!(poll.message.unwrap().contains("Invalid grid"));
}

#[tokio::test]
async fn test_panicking_task_is_marked_failed() {
    let dir = TempDir::new().unwrap();
    let cleanup = RecordingCleanup::default();
    let cleanup_calls = cleanup.calls.clone();
    let runner = TaskRunner::new(build_processor(
        dir.path(),
        MockDataStore::default(),
        MockTranscriber::panicking("decoder state corrupted"),
        MockSummarizer::new("## Notes"),
        MockDownloader::new("youtube", VIDEO_ID),
        MockVideoProcessor::new(60.0),
        cleanup,
    ));

    let handle = runner.submit(request("t1", vec![])).await.unwrap();
    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Aborted { ref task_id, .. } if task_id == "t1"));

    let poll = runner.poll("t1").await.unwrap();
    assert_eq!(poll.status, TaskStatus::Failed);
    let message = poll.message.unwrap();
    assert!(message.contains("panicked"), "{message}");
    assert!(message.contains("decoder state corrupted"), "{message}");
    assert!(cleanup_calls.lock().unwrap().is_empty());
}
