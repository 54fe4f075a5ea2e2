//! Frame-grid capture: samples frames across a video, tiles them into
//! timestamped `cols x rows` grids and hands the grids back as inline
//! `data:` URLs usable as multimodal summarization context.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{codecs::jpeg::JpegEncoder, imageops, imageops::FilterType, RgbImage};
use itertools::Itertools;
use regex::Regex;

use crate::{
    types::GridCapture,
    video::{glyphs, VideoProcessor},
};

static FRAME_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^frame_(\d{2,})_(\d{2})\.jpg$").unwrap());

const FRAME_PREFIX: &str = "frame_";
const GRID_PREFIX: &str = "grid_";
/// Upper bound on a composed grid, in pixels
const MAX_CANVAS_PIXELS: u64 = 1 << 28;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Invalid grid {cols}x{rows} with interval {interval_secs}s")]
    InvalidGrid {
        cols: u32,
        rows: u32,
        interval_secs: u32,
    },
    #[error("Failed to prepare scratch directory {path}: {source}")]
    Scratch {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to probe video duration: {0:#}")]
    Probe(anyhow::Error),
    #[error("Failed to extract frame at {timestamp}s: {source:#}")]
    Extract {
        timestamp: u32,
        source: anyhow::Error,
    },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Grid composition task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Timestamps sampled every `interval` seconds from 0: `floor(duration / interval)`
/// of them, capped at `max_frames`
pub fn frame_timestamps(duration_secs: f64, interval_secs: u32, max_frames: usize) -> Vec<u32> {
    if interval_secs == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Vec::new();
    }
    let count = (duration_secs / f64::from(interval_secs)).floor() as usize;
    (0..count.min(max_frames))
        .map(|i| i as u32 * interval_secs)
        .collect()
}

/// `MM_SS`, the timestamp part of a frame file name
pub fn format_time_label(secs: u32) -> String {
    format!("{:02}_{:02}", secs / 60, secs % 60)
}

pub fn frame_file_name(secs: u32) -> String {
    format!("{FRAME_PREFIX}{}.jpg", format_time_label(secs))
}

/// Recovers the timestamp encoded in a `frame_MM_SS.jpg` file name
pub fn parse_frame_timestamp(file_name: &str) -> Option<u32> {
    let caps = FRAME_NAME_RE.captures(file_name)?;
    let mm = caps[1].parse::<u32>().ok()?;
    let ss = caps[2].parse::<u32>().ok()?;
    Some(mm * 60 + ss)
}

/// Orders frames by timestamp and splits them into groups of `group_size`;
/// a trailing incomplete group is dropped
pub fn group_frames(frames: Vec<PathBuf>, group_size: usize) -> Vec<Vec<PathBuf>> {
    if group_size == 0 {
        return Vec::new();
    }
    let frame_ts = |p: &PathBuf| {
        p.file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_frame_timestamp)
            .unwrap_or(u32::MAX)
    };

    let sorted = frames.into_iter().sorted_by_key(frame_ts).collect::<Vec<_>>();
    sorted
        .chunks(group_size)
        .filter(|group| {
            let complete = group.len() == group_size;
            if !complete {
                tracing::warn!(
                    frames = group.len(),
                    group_size,
                    "Skipping incomplete frame group"
                );
            }
            complete
        })
        .map(<[PathBuf]>::to_vec)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    cols: u32,
    rows: u32,
    unit_width: u32,
    unit_height: u32,
    save_quality: u8,
}

fn compose_grid(frames: &[PathBuf], layout: Layout, out_path: &Path) -> Result<(), CaptureError> {
    let mut canvas = RgbImage::from_pixel(
        layout.unit_width * layout.cols,
        layout.unit_height * layout.rows,
        image::Rgb([255, 255, 255]),
    );
    let scale = glyphs::scale_for_height(layout.unit_height);

    for (i, frame_path) in frames.iter().enumerate() {
        let mut cell = imageops::resize(
            &image::open(frame_path)?.to_rgb8(),
            layout.unit_width,
            layout.unit_height,
            FilterType::Lanczos3,
        );

        if let Some(ts) = frame_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_frame_timestamp)
        {
            let label = format!("{:02}:{:02}", ts / 60, ts % 60);
            glyphs::stamp_label(&mut cell, &label, 10, 10, scale);
        }

        let i = i as u32;
        let x = (i % layout.cols) * layout.unit_width;
        let y = (i / layout.cols) * layout.unit_height;
        imageops::replace(&mut canvas, &cell, i64::from(x), i64::from(y));
    }

    let mut writer = BufWriter::new(File::create(out_path)?);
    JpegEncoder::new_with_quality(&mut writer, layout.save_quality).encode_image(&canvas)?;
    Ok(())
}

fn encode_data_url(path: &Path) -> Result<String, CaptureError> {
    let bytes = std::fs::read(path)?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)))
}

/// Builds timestamped frame grids for one video.
///
/// `frame_dir` and `grid_dir` are scratch directories owned by a single
/// capture at a time; their `frame_*`/`grid_*` files are purged at the start
/// of every run.
pub struct FrameGridCapture<'a> {
    processor: &'a dyn VideoProcessor,
    video_path: PathBuf,
    frame_dir: PathBuf,
    grid_dir: PathBuf,
    grid: GridCapture,
    unit_width: u32,
    unit_height: u32,
    save_quality: u8,
}

impl<'a> FrameGridCapture<'a> {
    pub fn new(
        processor: &'a dyn VideoProcessor,
        video_path: impl Into<PathBuf>,
        frame_dir: impl Into<PathBuf>,
        grid_dir: impl Into<PathBuf>,
        grid: GridCapture,
    ) -> Self {
        Self {
            processor,
            video_path: video_path.into(),
            frame_dir: frame_dir.into(),
            grid_dir: grid_dir.into(),
            grid,
            unit_width: 960,
            unit_height: 540,
            save_quality: 90,
        }
    }

    pub fn with_unit_size(mut self, width: u32, height: u32) -> Self {
        self.unit_width = width;
        self.unit_height = height;
        self
    }

    pub fn with_save_quality(mut self, quality: u8) -> Self {
        self.save_quality = quality;
        self
    }

    async fn purge_scratch(dir: &Path, prefix: &str) -> Result<(), CaptureError> {
        let scratch_err = |source: std::io::Error| CaptureError::Scratch {
            path: dir.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(scratch_err)?;
        let mut entries = tokio::fs::read_dir(dir).await.map_err(scratch_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(scratch_err)? {
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                tokio::fs::remove_file(entry.path())
                    .await
                    .map_err(scratch_err)?;
            }
        }
        Ok(())
    }

    /// Extracts the sampled frames, returning their paths in extraction order
    #[tracing::instrument(skip(self), fields(video = %self.video_path.display()))]
    pub async fn extract_frames(&self) -> Result<Vec<PathBuf>, CaptureError> {
        let duration = self
            .processor
            .probe_duration(&self.video_path)
            .await
            .map_err(CaptureError::Probe)?;

        let timestamps =
            frame_timestamps(duration, self.grid.interval_secs, self.grid.max_frames);
        tracing::debug!(duration, frames = timestamps.len(), "Extracting frames");

        let mut frames = Vec::with_capacity(timestamps.len());
        for ts in timestamps {
            let output_path = self.frame_dir.join(frame_file_name(ts));
            self.processor
                .extract_frame(&self.video_path, f64::from(ts), &output_path)
                .await
                .map_err(|source| CaptureError::Extract {
                    timestamp: ts,
                    source,
                })?;
            frames.push(output_path);
        }
        Ok(frames)
    }

    async fn list_frames(&self) -> Result<Vec<PathBuf>, CaptureError> {
        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.frame_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FRAME_PREFIX) && name.ends_with(".jpg") {
                frames.push(entry.path());
            }
        }
        Ok(frames)
    }

    /// Runs the whole capture and returns one `data:image/jpeg;base64,...`
    /// URL per complete grid. Any failure aborts the capture.
    #[tracing::instrument(skip(self), fields(video = %self.video_path.display()))]
    pub async fn run(&self) -> Result<Vec<String>, CaptureError> {
        let GridCapture {
            cols,
            rows,
            interval_secs,
            ..
        } = self.grid;
        let invalid = || CaptureError::InvalidGrid {
            cols,
            rows,
            interval_secs,
        };
        if cols == 0 || rows == 0 || interval_secs == 0 {
            return Err(invalid());
        }
        let group_size = self.grid.group_size().ok_or_else(invalid)?;
        let canvas_width = self.unit_width.checked_mul(cols).ok_or_else(invalid)?;
        let canvas_height = self.unit_height.checked_mul(rows).ok_or_else(invalid)?;
        if u64::from(canvas_width) * u64::from(canvas_height) > MAX_CANVAS_PIXELS {
            return Err(invalid());
        }
        tracing::debug!(group_size, canvas_width, canvas_height, "Grid layout");

        Self::purge_scratch(&self.frame_dir, FRAME_PREFIX).await?;
        Self::purge_scratch(&self.grid_dir, GRID_PREFIX).await?;

        self.extract_frames().await?;

        let groups = group_frames(self.list_frames().await?, group_size);
        tracing::info!(grids = groups.len(), "Composing frame grids");

        let layout = Layout {
            cols,
            rows,
            unit_width: self.unit_width,
            unit_height: self.unit_height,
            save_quality: self.save_quality,
        };

        let mut urls = Vec::with_capacity(groups.len());
        for (idx, group) in groups.into_iter().enumerate() {
            let out_path = self.grid_dir.join(format!("{GRID_PREFIX}{}.jpg", idx + 1));
            let url = tokio::task::spawn_blocking(move || {
                compose_grid(&group, layout, &out_path)?;
                encode_data_url(&out_path)
            })
            .await??;
            urls.push(url);
        }

        Ok(urls)
    }
}
