use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use note_datastore::PgDataStore;
use note_pulse::{
    cleanup::{CleanupHook, NoopCleanup, TempMediaCleanup},
    downloader::{DownloaderRegistry, LocalDownloader, YtDlpDownloader},
    tracing::init_tracing_subscriber,
    types::{
        DownloadQuality, GridCapture, NoteFormat, NoteRequest, NoteStyle, OutputOptions,
        TaskStatus,
    },
    video::Ffmpeg,
    NoteProcessorBuilder, OpenAIClient, ProviderRegistry, StatusStore, SummarizerFactory,
    TaskCache, TaskPoll, TaskRunner,
};

const YT_DLP_PLATFORMS: [&str; 5] = ["bilibili", "youtube", "douyin", "tiktok", "kuaishou"];

#[derive(Parser)]
#[command(name = "note-pulse", about = "Turns videos into structured markdown notes")]
struct Cli {
    /// Status files and stage checkpoints
    #[arg(long, env = "NOTE_OUTPUT_DIR", default_value = "note_results")]
    note_output_dir: PathBuf,

    /// Downloads and frame-grid scratch space
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a note and wait for it to finish
    Generate(GenerateArgs),
    /// Print the status of a task
    Status {
        task_id: String,
    },
    /// Forget the note of a video so it can be generated again
    Delete {
        #[command(flatten)]
        backend: BackendArgs,
        #[arg(long)]
        video_id: String,
        #[arg(long)]
        platform: String,
    },
    /// List the models a provider offers
    Models {
        /// JSON file with the configured summarization providers
        #[arg(long, env = "PROVIDERS_PATH", default_value = "providers.json")]
        providers: PathBuf,
        #[arg(long)]
        provider_id: String,
    },
}

#[derive(Args)]
struct BackendArgs {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// JSON file with the configured summarization providers
    #[arg(long, env = "PROVIDERS_PATH", default_value = "providers.json")]
    providers: PathBuf,

    /// API key of the transcription backend
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_key: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = OpenAIClient::DEFAULT_BASE_URL)]
    openai_base_url: String,

    #[arg(long, env = "TRANSCRIBER_MODEL", default_value = OpenAIClient::TRANSCRIPTION_MODEL)]
    transcriber_model: String,

    /// Audio chunk duration in seconds for transcription uploads
    #[arg(long, default_value = "600")]
    chunk_duration: u16,

    #[arg(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    /// Path to yt-dlp cookies file
    #[arg(long, env = "YTDLP_COOKIES_PATH")]
    cookies_path: Option<PathBuf>,

    /// Where screenshots are written
    #[arg(long, env = "STATIC_DIR", default_value = "static/screenshots")]
    static_dir: PathBuf,

    /// Public prefix screenshots are served under
    #[arg(long, env = "IMAGE_BASE_URL", default_value = "/static/screenshots")]
    image_base_url: String,

    /// Delete downloaded media once a note is generated
    #[arg(long, env = "CLEANUP_MEDIA")]
    cleanup_media: bool,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    backend: BackendArgs,

    #[arg(long)]
    url: String,

    #[arg(long)]
    platform: String,

    #[arg(long)]
    provider_id: String,

    #[arg(long)]
    model: String,

    /// Defaults to a random id
    #[arg(long)]
    task_id: Option<String>,

    #[arg(long, default_value = "medium")]
    quality: DownloadQuality,

    /// toc, link, screenshot or summary; repeatable
    #[arg(long = "format")]
    formats: Vec<NoteFormat>,

    #[arg(long)]
    style: Option<NoteStyle>,

    /// Free-form instructions appended to the prompt
    #[arg(long)]
    extras: Option<String>,

    /// Send frame grids of the video along with the transcript
    #[arg(long)]
    video_understanding: bool,

    /// Seconds between sampled frames; enables frame grids
    #[arg(long)]
    frame_interval: Option<u32>,

    #[arg(long, default_value = "3")]
    grid_cols: u32,

    #[arg(long, default_value = "3")]
    grid_rows: u32,

    /// Download directory for this task
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

async fn build_runner(
    cli: &Cli,
    backend: &BackendArgs,
) -> anyhow::Result<TaskRunner<PgDataStore, OpenAIClient, ProviderRegistry>> {
    let store = PgDataStore::init(&backend.database_url)
        .await
        .context("Failed to initialise datastore")?;
    let providers = ProviderRegistry::from_json_file(&backend.providers).await?;

    let ffmpeg = Ffmpeg::default();
    let transcriber = OpenAIClient::new(&backend.openai_key)
        .with_base_url(&backend.openai_base_url)
        .with_transcription_model(&backend.transcriber_model)
        .with_chunking(ffmpeg.clone(), backend.chunk_duration);

    let downloaders = YT_DLP_PLATFORMS.iter().fold(
        DownloaderRegistry::new().register("local", Arc::new(LocalDownloader::new(ffmpeg.clone()))),
        |registry, platform| {
            let downloader = YtDlpDownloader::new(*platform)
                .with_binary(&backend.yt_dlp)
                .with_cookies(backend.cookies_path.clone());
            registry.register(*platform, Arc::new(downloader))
        },
    );

    let cleanup: Arc<dyn CleanupHook> = if backend.cleanup_media {
        Arc::new(TempMediaCleanup)
    } else {
        Arc::new(NoopCleanup)
    };

    let processor = NoteProcessorBuilder::new(&cli.note_output_dir, &cli.data_dir)
        .store(store)
        .transcriber(transcriber)
        .summarizers(providers)
        .downloaders(downloaders)
        .video_processor(Arc::new(ffmpeg))
        .cleanup(cleanup)
        .static_dir(&backend.static_dir)
        .image_base_url(&backend.image_base_url)
        .build();

    Ok(TaskRunner::new(processor))
}

fn print_poll(poll: &TaskPoll) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(poll)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    match &cli.command {
        Command::Generate(args) => {
            let runner = build_runner(&cli, &args.backend).await?;
            let grid = args.frame_interval.map(|interval_secs| GridCapture {
                cols: args.grid_cols,
                rows: args.grid_rows,
                interval_secs,
                ..Default::default()
            });
            let request = NoteRequest {
                task_id: args
                    .task_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                video_url: args.url.clone(),
                platform: args.platform.clone(),
                quality: args.quality,
                provider_id: args.provider_id.clone(),
                model_name: args.model.clone(),
                options: OutputOptions {
                    formats: args.formats.clone(),
                    style: args.style,
                    extras: args.extras.clone(),
                    video_understanding: args.video_understanding,
                    grid,
                    output_dir: args.output_dir.clone(),
                },
            };
            let task_id = request.task_id.clone();
            tracing::info!(%task_id, url = %request.video_url, "Submitting note task");

            let handle = runner.submit(request).await?;
            if let Err(e) = handle.await? {
                tracing::error!(error = %e, %task_id, "Note task failed");
            }
            print_poll(&runner.poll(&task_id).await?)?;
        }
        Command::Status { task_id } => {
            let status = StatusStore::new(&cli.note_output_dir).read(task_id).await?;
            let result = if status.status == TaskStatus::Success {
                TaskCache::new(&cli.note_output_dir).load_note(task_id).await
            } else {
                None
            };
            print_poll(&TaskPoll {
                task_id: task_id.clone(),
                status: status.status,
                message: status.message,
                result,
            })?;
        }
        Command::Delete {
            backend,
            video_id,
            platform,
        } => {
            let runner = build_runner(&cli, backend).await?;
            let removed = runner.delete_note(video_id, platform).await?;
            println!("removed {removed} record(s)");
        }
        Command::Models {
            providers,
            provider_id,
        } => {
            let registry = ProviderRegistry::from_json_file(providers).await?;
            let summarizer = registry
                .summarizer(provider_id, "")
                .with_context(|| format!("Provider {provider_id} is not configured"))?;
            for model in summarizer.list_models().await? {
                println!("{model}");
            }
        }
    }

    Ok(())
}
