use std::{path::Path, sync::LazyLock};

use regex::Regex;

static BILIBILI_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BV([0-9A-Za-z]+)").unwrap());
static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:v=|youtu\.be/|shorts/)([0-9A-Za-z_-]{11})").unwrap()
});
static DOUYIN_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/video/(\d+)").unwrap());
static KUAISHOU_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:short-video|fw/photo)/([0-9A-Za-z_-]+)").unwrap());

/// Platforms [`extract_video_id`] knows how to parse
pub const KNOWN_PLATFORMS: [&str; 6] = [
    "bilibili", "youtube", "douyin", "tiktok", "kuaishou", "local",
];

pub fn is_known_platform(platform: &str) -> bool {
    KNOWN_PLATFORMS.contains(&platform)
}

/// Extracts the platform's video id from `url`.
///
/// Used by the duplicate-submission guard, so it must agree with the
/// `video_id` the platform's downloader reports.
pub fn extract_video_id(url: &str, platform: &str) -> Option<String> {
    match platform {
        "bilibili" => BILIBILI_ID_RE
            .captures(url)
            .map(|caps| format!("BV{}", &caps[1])),
        "youtube" => YOUTUBE_ID_RE.captures(url).map(|caps| caps[1].to_string()),
        "douyin" | "tiktok" => DOUYIN_ID_RE.captures(url).map(|caps| caps[1].to_string()),
        "kuaishou" => KUAISHOU_ID_RE.captures(url).map(|caps| caps[1].to_string()),
        "local" => Path::new(url)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string),
        _ => None,
    }
}
