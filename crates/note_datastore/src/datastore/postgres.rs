use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{datastore::DataStore, domain::VideoTask};

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct PgDataStore {
    pub pool: PgPool,
}

impl PgDataStore {
    /// Establish connection to database and create the video_tasks table
    /// if not exists
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgDataStore { pool })
    }
}

impl DataStore for PgDataStore {
    async fn insert_video_task(
        &self,
        video_id: &str,
        platform: &str,
        task_id: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO video_tasks (video_id, platform, task_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (task_id) DO NOTHING
            "#,
        )
        .bind(video_id)
        .bind(platform)
        .bind(task_id)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            tracing::error!(
                error = ?err,
                %video_id,
                %platform,
                %task_id,
                "Failed to insert video task"
            )
        })
        .context("Failed to insert video task")?;

        Ok(())
    }

    async fn get_task_by_video(
        &self,
        video_id: &str,
        platform: &str,
    ) -> anyhow::Result<Option<String>> {
        let row = sqlx::query_as::<_, VideoTask>(
            r#"
            SELECT video_id, platform, task_id, created_at FROM video_tasks
            WHERE video_id = $1 AND platform = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(video_id)
        .bind(platform)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch video task"))
        .context("Failed to fetch video task")?;

        Ok(row.map(|r| r.task_id))
    }

    async fn delete_task_by_video(&self, video_id: &str, platform: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM video_tasks WHERE video_id = $1 AND platform = $2")
            .bind(video_id)
            .bind(platform)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to delete video tasks"))
            .context("Failed to delete video tasks")?;

        Ok(result.rows_affected())
    }
}
