use std::time::Duration;
use tracing::info;

use super::task_spawner::SWEEP_TASK;

impl super::MaintenanceScheduler {
    /// Abort the sweep and health-check tasks.
    ///
    /// The last sweep report survives so it can still be queried.
    pub async fn stop_all_tasks(&self) {
        if let Some(handle) = self.health_check_handle.lock().await.take() {
            handle.abort();
            info!("🛑 Health check task stopped");
        }

        let stopped: Vec<_> = {
            let mut tasks = self.tasks.lock().await;
            tasks
                .drain()
                .map(|(name, handle)| {
                    handle.abort();
                    name
                })
                .collect()
        };

        if let Some(meta) = self.task_metadata.lock().await.get_mut(SWEEP_TASK) {
            meta.interval = Duration::ZERO;
        }

        info!("🛑 Stopped maintenance tasks: {:?}", stopped);
    }

    /// Restart the timer with a new interval, e.g. after a config change.
    pub async fn restart(&self, interval: Duration) {
        info!("🔄 Restarting maintenance sweep every {}s", interval.as_secs());
        self.stop_all_tasks().await;
        self.start(interval).await;
    }

    pub async fn active_task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn shutdown(&self) {
        info!("🛑 Shutting down maintenance scheduler");
        self.stop_all_tasks().await;
    }
}
