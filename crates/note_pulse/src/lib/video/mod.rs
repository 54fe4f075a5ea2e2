//! Still-frame extraction: the `VideoProcessor` seam, its ffmpeg-backed
//! implementation, on-demand screenshots and frame-grid capture.

pub mod glyphs;
pub mod grid;

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Output,
};

use async_trait::async_trait;
use tokio::process::Command;

pub use grid::{CaptureError, FrameGridCapture};

#[async_trait]
pub trait VideoProcessor: Send + Sync {
    /// Duration of the media file in seconds
    async fn probe_duration(&self, video_path: &Path) -> anyhow::Result<f64>;

    /// Writes one still image taken at `timestamp_secs` to `output_path`
    async fn extract_frame(
        &self,
        video_path: &Path,
        timestamp_secs: f64,
        output_path: &Path,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("Could not parse duration from ffprobe output: {0:?}")]
    InvalidDuration(String),
}

/// Thin wrapper over the `ffmpeg` and `ffprobe` executables
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run<I, S>(&self, program: &Path, args: I) -> Result<Output, FfmpegError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program_name = program.display().to_string();
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FfmpegError::Spawn {
                program: program_name.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FfmpegError::Failed {
                program: program_name,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Re-encodes the audio track of `input` to an mp3 at `bitrate_kbps`
    #[tracing::instrument(skip(self))]
    pub async fn extract_audio(
        &self,
        input: &Path,
        output: &Path,
        bitrate_kbps: u32,
    ) -> anyhow::Result<()> {
        let bitrate = format!("{bitrate_kbps}k");
        self.run(
            &self.ffmpeg,
            [
                OsStr::new("-hide_banner"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                OsStr::new("-y"),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-acodec"),
                OsStr::new("libmp3lame"),
                OsStr::new("-b:a"),
                OsStr::new(&bitrate),
                output.as_os_str(),
            ],
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to extract audio"))?;
        Ok(())
    }

    /// Splits `input` into fixed-length mp3 segments named after `output_template`
    /// (an ffmpeg pattern such as `chunks/episode_%03d.mp3`)
    #[tracing::instrument(skip(self))]
    pub async fn split_audio_to_chunks(
        &self,
        input: &Path,
        chunk_duration_seconds: u16,
        output_template: &Path,
    ) -> anyhow::Result<()> {
        let segment_time = chunk_duration_seconds.to_string();
        self.run(
            &self.ffmpeg,
            [
                OsStr::new("-hide_banner"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                OsStr::new("-y"),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-f"),
                OsStr::new("segment"),
                OsStr::new("-segment_time"),
                OsStr::new(&segment_time),
                OsStr::new("-c"),
                OsStr::new("copy"),
                output_template.as_os_str(),
            ],
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to split audio to chunks"))?;
        Ok(())
    }
}

#[async_trait]
impl VideoProcessor for Ffmpeg {
    async fn probe_duration(&self, video_path: &Path) -> anyhow::Result<f64> {
        let output = self
            .run(
                &self.ffprobe,
                [
                    OsStr::new("-v"),
                    OsStr::new("error"),
                    OsStr::new("-show_entries"),
                    OsStr::new("format=duration"),
                    OsStr::new("-of"),
                    OsStr::new("default=noprint_wrappers=1:nokey=1"),
                    video_path.as_os_str(),
                ],
            )
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration = stdout
            .trim()
            .parse::<f64>()
            .map_err(|_| FfmpegError::InvalidDuration(stdout.trim().to_string()))?;
        Ok(duration)
    }

    async fn extract_frame(
        &self,
        video_path: &Path,
        timestamp_secs: f64,
        output_path: &Path,
    ) -> anyhow::Result<()> {
        let timestamp = timestamp_secs.to_string();
        self.run(
            &self.ffmpeg,
            [
                OsStr::new("-hide_banner"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                OsStr::new("-ss"),
                OsStr::new(&timestamp),
                OsStr::new("-i"),
                video_path.as_os_str(),
                OsStr::new("-frames:v"),
                OsStr::new("1"),
                OsStr::new("-q:v"),
                OsStr::new("2"),
                OsStr::new("-y"),
                output_path.as_os_str(),
            ],
        )
        .await?;
        Ok(())
    }
}

/// Extracts a single screenshot at `timestamp_secs` into `output_dir`.
///
/// File names embed a random component, so repeated calls for the same
/// timestamp and index never collide.
#[tracing::instrument(skip(processor))]
pub async fn generate_screenshot(
    processor: &dyn VideoProcessor,
    video_path: &Path,
    output_dir: &Path,
    timestamp_secs: u32,
    index: usize,
) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let file_name = format!("screenshot_{index}_{}.jpg", uuid::Uuid::new_v4().simple());
    let output_path = output_dir.join(file_name);

    processor
        .extract_frame(video_path, f64::from(timestamp_secs), &output_path)
        .await?;

    if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
        anyhow::bail!(
            "frame extractor did not produce expected file: {}",
            output_path.display()
        );
    }
    Ok(output_path)
}
