//! Best-effort rewrites of generated markdown.
//!
//! Each feature returns a [`PostProcessOutcome`]: the (possibly partially)
//! rewritten markdown plus the non-fatal problems it ran into. Nothing here
//! can fail a task.

pub mod markers;
mod screenshots;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use markers::{extract_screenshot_markers, replace_content_markers, ScreenshotMarker};
pub use screenshots::ScreenshotInserter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostProcessFeature {
    Screenshot,
    Link,
}

impl fmt::Display for PostProcessFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostProcessFeature::Screenshot => f.write_str("screenshot"),
            PostProcessFeature::Link => f.write_str("link"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcessWarning {
    pub feature: PostProcessFeature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessOutcome {
    pub markdown: String,
    pub warnings: Vec<PostProcessWarning>,
}

impl PostProcessOutcome {
    pub fn unchanged(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            warnings: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Applies timestamp deep links for `platform`.
///
/// The rewrite itself cannot fail; a missing video id skips it with a warning
/// so markers are not turned into links pointing nowhere.
pub fn insert_links(markdown: &str, video_id: &str, platform: &str) -> PostProcessOutcome {
    if video_id.trim().is_empty() {
        return PostProcessOutcome {
            markdown: markdown.to_string(),
            warnings: vec![PostProcessWarning {
                feature: PostProcessFeature::Link,
                marker: None,
                message: "video id is empty, timestamp links skipped".into(),
            }],
        };
    }
    PostProcessOutcome::unchanged(replace_content_markers(markdown, video_id, platform))
}
