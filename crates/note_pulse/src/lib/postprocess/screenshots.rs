use std::path::Path;

use crate::{
    postprocess::{
        extract_screenshot_markers, PostProcessFeature, PostProcessOutcome, PostProcessWarning,
    },
    video::{generate_screenshot, VideoProcessor},
};

/// Replaces screenshot markers with image links to frames grabbed from the
/// task's companion video
pub struct ScreenshotInserter<'a> {
    processor: &'a dyn VideoProcessor,
    output_dir: &'a Path,
    image_base_url: &'a str,
}

impl<'a> ScreenshotInserter<'a> {
    pub fn new(
        processor: &'a dyn VideoProcessor,
        output_dir: &'a Path,
        image_base_url: &'a str,
    ) -> Self {
        Self {
            processor,
            output_dir,
            image_base_url,
        }
    }

    fn image_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.image_base_url.trim_end_matches('/'), file_name)
    }

    /// Each marker is replaced at its own position, in document order. A
    /// marker whose screenshot cannot be produced is left in place and
    /// reported.
    #[tracing::instrument(skip_all, fields(video = ?video_path))]
    pub async fn insert(&self, markdown: &str, video_path: Option<&Path>) -> PostProcessOutcome {
        let markers = extract_screenshot_markers(markdown);
        if markers.is_empty() {
            return PostProcessOutcome::unchanged(markdown);
        }

        let Some(video_path) = video_path else {
            return PostProcessOutcome {
                markdown: markdown.to_string(),
                warnings: vec![PostProcessWarning {
                    feature: PostProcessFeature::Screenshot,
                    marker: None,
                    message: format!(
                        "no video available for {} screenshot marker(s)",
                        markers.len()
                    ),
                }],
            };
        };

        let mut replacements = Vec::with_capacity(markers.len());
        let mut warnings = Vec::new();

        for (idx, marker) in markers.iter().enumerate() {
            let generated = generate_screenshot(
                self.processor,
                video_path,
                self.output_dir,
                marker.timestamp_secs,
                idx,
            )
            .await
            .and_then(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| self.image_url(n))
                    .ok_or_else(|| anyhow::anyhow!("invalid screenshot path {}", path.display()))
            });

            match generated {
                Ok(url) => replacements.push((marker.span.clone(), format!("![]({url})"))),
                Err(e) => {
                    tracing::warn!(error = %e, marker = %marker.marker, "Failed to generate screenshot");
                    warnings.push(PostProcessWarning {
                        feature: PostProcessFeature::Screenshot,
                        marker: Some(marker.marker.clone()),
                        message: format!("{e:#}"),
                    });
                }
            }
        }

        // back to front so earlier spans stay valid
        let mut new_markdown = markdown.to_string();
        for (span, image) in replacements.into_iter().rev() {
            new_markdown.replace_range(span, &image);
        }

        PostProcessOutcome {
            markdown: new_markdown,
            warnings,
        }
    }
}
