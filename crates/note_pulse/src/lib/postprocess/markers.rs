//! Regex-driven rewrites of the placeholder markers the summarizer is asked
//! to emit: `*Screenshot-[mm:ss]` and `*Content-[mm:ss]`.

use std::{ops::Range, sync::LazyLock};

use regex::{Captures, Regex};

static SCREENSHOT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*Screenshot-(\d{2}):(\d{2})|\*?Screenshot-\[(\d{2}):(\d{2})\]").unwrap()
});

static CONTENT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*?Content-(?:\[(\d{2}):(\d{2})\]|(\d{2}):(\d{2}))").unwrap()
});

/// Label of a deep link back into the source video
const ORIGINAL_LABEL: &str = "原片";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotMarker {
    /// The literal marker text as it appears in the markdown
    pub marker: String,
    /// Byte range of the marker in the scanned markdown
    pub span: Range<usize>,
    pub timestamp_secs: u32,
}

/// Picks whichever of the two `(mm, ss)` alternatives matched
fn mm_ss<'h>(caps: &Captures<'h>) -> Option<(&'h str, &'h str)> {
    let mm = caps.get(1).or_else(|| caps.get(3))?.as_str();
    let ss = caps.get(2).or_else(|| caps.get(4))?.as_str();
    Some((mm, ss))
}

fn to_seconds(mm: &str, ss: &str) -> Option<u32> {
    Some(mm.parse::<u32>().ok()? * 60 + ss.parse::<u32>().ok()?)
}

/// Lists screenshot markers in document order
pub fn extract_screenshot_markers(markdown: &str) -> Vec<ScreenshotMarker> {
    SCREENSHOT_MARKER_RE
        .captures_iter(markdown)
        .filter_map(|caps| {
            let (mm, ss) = mm_ss(&caps)?;
            let whole = caps.get(0)?;
            Some(ScreenshotMarker {
                marker: whole.as_str().to_string(),
                span: whole.range(),
                timestamp_secs: to_seconds(mm, ss)?,
            })
        })
        .collect()
}

/// Deep link into `video_id` at `seconds`, or `None` when the platform has no
/// addressable video page
pub fn platform_video_url(platform: &str, video_id: &str, seconds: u32) -> Option<String> {
    match platform {
        "bilibili" => Some(format!(
            "https://www.bilibili.com/video/{video_id}?t={seconds}"
        )),
        "youtube" => Some(format!(
            "https://www.youtube.com/watch?v={video_id}&t={seconds}s"
        )),
        // no native time deep links, link to the video itself
        "douyin" | "tiktok" => Some(format!("https://www.douyin.com/video/{video_id}")),
        _ => None,
    }
}

/// Rewrites `*Content-mm:ss`, `Content-mm:ss` and `Content-[mm:ss]` into
/// platform deep links; unknown platforms get a plain `(mm:ss)`.
pub fn replace_content_markers(markdown: &str, video_id: &str, platform: &str) -> String {
    CONTENT_MARKER_RE
        .replace_all(markdown, |caps: &Captures| {
            let Some((mm, ss)) = mm_ss(caps) else {
                return caps[0].to_string();
            };
            let Some(seconds) = to_seconds(mm, ss) else {
                return caps[0].to_string();
            };
            match platform_video_url(platform, video_id, seconds) {
                Some(url) => format!("[{ORIGINAL_LABEL} @ {mm}:{ss}]({url})"),
                None => format!("({mm}:{ss})"),
            }
        })
        .into_owned()
}
