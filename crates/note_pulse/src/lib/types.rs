use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle of a note generation task.
///
/// ```text
/// PENDING -> PARSING -> DOWNLOADING -> TRANSCRIBING -> SUMMARIZING -> SAVING -> SUCCESS
///    any-state -> FAILED
/// ```
///
/// `Pending` is never written to disk; it is what a poll returns when no
/// status file exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Parsing,
    Downloading,
    Transcribing,
    Summarizing,
    Saving,
    Success,
    Failed,
}

impl TaskStatus {
    /// The order a successful run walks through
    pub const SUCCESS_CHAIN: [TaskStatus; 6] = [
        TaskStatus::Parsing,
        TaskStatus::Downloading,
        TaskStatus::Transcribing,
        TaskStatus::Summarizing,
        TaskStatus::Saving,
        TaskStatus::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Parsing => "PARSING",
            TaskStatus::Downloading => "DOWNLOADING",
            TaskStatus::Transcribing => "TRANSCRIBING",
            TaskStatus::Summarizing => "SUMMARIZING",
            TaskStatus::Saving => "SAVING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk shape of `{task_id}.status.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusRecord {
    pub fn pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadQuality {
    Fast,
    #[default]
    Medium,
    Slow,
}

impl DownloadQuality {
    /// Target audio bitrate handed to the media source
    pub fn bitrate_kbps(&self) -> u32 {
        match self {
            DownloadQuality::Fast => 32,
            DownloadQuality::Medium => 64,
            DownloadQuality::Slow => 128,
        }
    }
}

impl FromStr for DownloadQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(DownloadQuality::Fast),
            "medium" => Ok(DownloadQuality::Medium),
            "slow" => Ok(DownloadQuality::Slow),
            other => Err(format!("unknown download quality: {other}")),
        }
    }
}

/// Output toggles understood by the prompt builder and post-processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFormat {
    Toc,
    Link,
    Screenshot,
    Summary,
}

impl FromStr for NoteFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toc" => Ok(NoteFormat::Toc),
            "link" => Ok(NoteFormat::Link),
            "screenshot" => Ok(NoteFormat::Screenshot),
            "summary" => Ok(NoteFormat::Summary),
            other => Err(format!("unknown note format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStyle {
    Minimal,
    Detailed,
    Academic,
    Tutorial,
    Xiaohongshu,
    LifeJournal,
    TaskOriented,
    Business,
    MeetingMinutes,
}

impl FromStr for NoteStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_ascii_lowercase()))
            .map_err(|_| format!("unknown note style: {s}"))
    }
}

/// Frame-grid capture parameters: `cols x rows` frames per grid, one frame
/// every `interval_secs`, at most `max_frames` frames per video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCapture {
    pub cols: u32,
    pub rows: u32,
    pub interval_secs: u32,
    #[serde(default = "GridCapture::default_max_frames")]
    pub max_frames: usize,
}

impl GridCapture {
    pub const DEFAULT_MAX_FRAMES: usize = 1000;

    fn default_max_frames() -> usize {
        Self::DEFAULT_MAX_FRAMES
    }

    /// Frames per grid, `None` when `cols * rows` overflows
    pub fn group_size(&self) -> Option<usize> {
        self.cols
            .checked_mul(self.rows)
            .and_then(|n| usize::try_from(n).ok())
    }
}

impl Default for GridCapture {
    fn default() -> Self {
        Self {
            cols: 3,
            rows: 3,
            interval_secs: 2,
            max_frames: Self::DEFAULT_MAX_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputOptions {
    #[serde(default)]
    pub formats: Vec<NoteFormat>,
    #[serde(default)]
    pub style: Option<NoteStyle>,
    #[serde(default)]
    pub extras: Option<String>,
    #[serde(default)]
    pub video_understanding: bool,
    #[serde(default)]
    pub grid: Option<GridCapture>,
    /// Where the media source writes its artifacts; falls back to the pipeline data dir
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl OutputOptions {
    pub fn wants(&self, format: NoteFormat) -> bool {
        self.formats.contains(&format)
    }

    /// A companion video file is needed for screenshots and for visual context
    pub fn needs_video(&self) -> bool {
        self.wants(NoteFormat::Screenshot) || self.video_understanding
    }
}

/// One note generation request, identified by a caller-supplied `task_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRequest {
    pub task_id: String,
    pub video_url: String,
    pub platform: String,
    #[serde(default)]
    pub quality: DownloadQuality,
    pub provider_id: String,
    pub model_name: String,
    #[serde(default)]
    pub options: OutputOptions,
}

/// Media source output for a single video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub file_path: PathBuf,
    pub title: String,
    pub duration: f64,
    pub cover_url: Option<String>,
    pub platform: String,
    pub video_id: String,
    pub raw_info: Map<String, Value>,
    #[serde(default)]
    pub video_path: Option<PathBuf>,
}

impl AudioArtifact {
    /// Renders the `tags` entry of the raw metadata as a comma separated list
    pub fn tags(&self) -> Option<String> {
        match self.raw_info.get("tags")? {
            Value::String(tags) => Some(tags.clone()),
            Value::Array(tags) => {
                let tags = tags
                    .iter()
                    .filter_map(|t| match t {
                        Value::String(s) => Some(s.clone()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect::<Vec<_>>();
                (!tags.is_empty()).then(|| tags.join(", "))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub language: Option<String>,
    pub full_text: String,
    pub segments: Vec<TranscriptSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// The externally visible output of a successful task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteResult {
    pub markdown: String,
    pub transcript: TranscriptResult,
    pub audio_meta: AudioArtifact,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<crate::postprocess::PostProcessWarning>,
}
