use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use note_pulse::video::VideoProcessor;

/// Produces small solid-colour JPEG frames
#[derive(Clone)]
pub struct MockVideoProcessor {
    pub duration: f64,
    pub frame_calls: Arc<Mutex<Vec<f64>>>,
    pub fail_with: Option<String>,
}

impl MockVideoProcessor {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            frame_calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(60.0)
        }
    }
}

#[async_trait]
impl VideoProcessor for MockVideoProcessor {
    async fn probe_duration(&self, _video_path: &Path) -> anyhow::Result<f64> {
        Ok(self.duration)
    }

    async fn extract_frame(
        &self,
        _video_path: &Path,
        timestamp_secs: f64,
        output_path: &Path,
    ) -> anyhow::Result<()> {
        self.frame_calls.lock().unwrap().push(timestamp_secs);
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let shade = (timestamp_secs as u32 % 255) as u8;
        RgbImage::from_pixel(32, 18, Rgb([shade, 64, 128])).save(output_path)?;
        Ok(())
    }
}
