use chrono::{DateTime, Utc};
use serde::Serialize;

/// A `(video_id, platform) -> task_id` association row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct VideoTask {
    pub video_id: String,
    pub platform: String,
    pub task_id: String,
    pub created_at: DateTime<Utc>,
}
