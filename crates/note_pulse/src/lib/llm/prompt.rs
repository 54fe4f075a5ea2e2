use std::sync::LazyLock;

use itertools::Itertools;
use regex::{Captures, Regex};

use crate::{
    llm::summarizer::SummarizationRequest,
    types::{NoteFormat, NoteStyle, TranscriptSegment},
};

const BASE_PROMPT: &str = include_str!("./prompts/base.txt");

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(video_title|tags|segment_text)\}").unwrap());

fn format_directive(format: NoteFormat) -> &'static str {
    match format {
        NoteFormat::Toc => {
            "- Table of contents: start the notes with a table of contents built from the `##` headings. Do not put timestamp markers in it."
        }
        NoteFormat::Link => {
            "- Timestamps: after the text of every `##` heading, append the start time of that section as `*Content-[mm:ss]`, e.g. `## History of AI *Content-[01:23]`. The heading text always comes first, the marker last."
        }
        NoteFormat::Screenshot => {
            "- Screenshots: where a section relies on something visual (a demo, code on screen, a UI walkthrough), add a screenshot cue at the end of that section as `*Screenshot-[mm:ss]`. Insert at least one and at most three."
        }
        NoteFormat::Summary => {
            "- Summary: finish with a short section titled `## AI 总结` summarizing the whole video."
        }
    }
}

fn style_directive(style: NoteStyle) -> &'static str {
    match style {
        NoteStyle::Minimal => "Style: minimal. Record only the most important points, briefly.",
        NoteStyle::Detailed => {
            "Style: detailed. Discuss every part in depth and keep its timestamps."
        }
        NoteStyle::Academic => "Style: academic. Formal and structured, suitable for a report.",
        NoteStyle::Tutorial => {
            "Style: tutorial. Capture every step in detail, especially the key points and conclusions."
        }
        NoteStyle::Xiaohongshu => {
            "Style: Xiaohongshu. Friendly and conversational, suitable for sharing on social media."
        }
        NoteStyle::LifeJournal => {
            "Style: life journal. Personal reflections with an emotional tone."
        }
        NoteStyle::TaskOriented => {
            "Style: task oriented. Emphasize goals, tasks and action items."
        }
        NoteStyle::Business => "Style: business. Formal and precise, suitable for a business report.",
        NoteStyle::MeetingMinutes => {
            "Style: meeting minutes. Record decisions, owners and follow-ups formally."
        }
    }
}

/// `MM:SS` with minutes allowed to exceed 59
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn build_segment_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|seg| format!("{} - {}", format_timestamp(seg.start), seg.text.trim()))
        .join("\n")
}

/// Assembles the user prompt: base instructions, one directive per requested
/// format, the style directive, then free-form extras.
pub fn build_prompt(request: &SummarizationRequest) -> String {
    let segment_text = build_segment_text(&request.segments);
    // single pass, inserted values are never rescanned
    let mut prompt = PLACEHOLDER_RE
        .replace_all(BASE_PROMPT, |caps: &Captures| match &caps[1] {
            "video_title" => request.title.clone(),
            "tags" => request.tags.clone(),
            _ => segment_text.clone(),
        })
        .into_owned();

    if !request.formats.is_empty() {
        prompt.push_str("\nAdditional requirements:\n");
        prompt.push_str(
            &request
                .formats
                .iter()
                .unique()
                .map(|f| format_directive(*f))
                .join("\n"),
        );
        prompt.push('\n');
    }

    if let Some(style) = request.style {
        prompt.push('\n');
        prompt.push_str(style_directive(style));
        prompt.push('\n');
    }

    if let Some(extras) = request.extras.as_deref().filter(|e| !e.trim().is_empty()) {
        prompt.push('\n');
        prompt.push_str(extras.trim());
        prompt.push('\n');
    }

    prompt
}

/// Drops a ```` ```markdown ```` fence some models wrap their answer in
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // skip the info string, e.g. `markdown`
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => trimmed,
    }
}
