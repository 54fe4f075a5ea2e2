use std::future::Future;

pub mod postgres;

pub trait DataStore {
    /// Records that `task_id` produced a note for `(video_id, platform)`
    fn insert_video_task(
        &self,
        video_id: &str,
        platform: &str,
        task_id: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Returns the most recent task id recorded for `(video_id, platform)`
    fn get_task_by_video(
        &self,
        video_id: &str,
        platform: &str,
    ) -> impl Future<Output = anyhow::Result<Option<String>>> + Send;

    /// Removes every association for `(video_id, platform)`, returning the number of rows removed
    fn delete_task_by_video(
        &self,
        video_id: &str,
        platform: &str,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

impl<T: DataStore + Send + Sync> DataStore for &T {
    async fn insert_video_task(
        &self,
        video_id: &str,
        platform: &str,
        task_id: &str,
    ) -> anyhow::Result<()> {
        (**self)
            .insert_video_task(video_id, platform, task_id)
            .await
    }

    async fn get_task_by_video(
        &self,
        video_id: &str,
        platform: &str,
    ) -> anyhow::Result<Option<String>> {
        (**self).get_task_by_video(video_id, platform).await
    }

    async fn delete_task_by_video(&self, video_id: &str, platform: &str) -> anyhow::Result<u64> {
        (**self).delete_task_by_video(video_id, platform).await
    }
}
