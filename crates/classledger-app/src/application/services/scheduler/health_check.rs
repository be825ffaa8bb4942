use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

impl super::MaintenanceScheduler {
    /// Watch the sweep tasks for unexpected exits and missed runs.
    pub(super) async fn start_health_check_task(&self) {
        let tasks = Arc::clone(&self.tasks);
        let metadata = Arc::clone(&self.task_metadata);

        let handle = tokio::spawn(async move {
            let mut check_interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);

            loop {
                check_interval.tick().await;

                let tasks_lock = tasks.lock().await;
                let mut metadata_lock = metadata.lock().await;

                let mut dead_tasks = Vec::new();

                for (name, handle) in tasks_lock.iter() {
                    if handle.is_finished() {
                        warn!("🔴 Health Check: Task {} has terminated unexpectedly", name);
                        dead_tasks.push(*name);
                    } else if let Some(meta) = metadata_lock
                        .get(name)
                        .filter(|meta| !meta.interval.is_zero())
                    {
                        // Two missed intervals means the sweep is stuck
                        if let Some(last_exec) = meta.last_execution {
                            let elapsed = chrono::Utc::now() - last_exec;
                            let allowed = chrono::Duration::from_std(meta.interval * 2)
                                .unwrap_or_else(|_| chrono::Duration::hours(25));
                            if elapsed > allowed {
                                warn!(
                                    "⚠️  Health Check: Task '{}' hasn't executed in {} minutes",
                                    meta.task_name,
                                    elapsed.num_minutes()
                                );
                            }
                        }
                    }
                }

                for name in dead_tasks {
                    metadata_lock.remove(name);
                    error!("🔴 Health Check: Removed dead task metadata for {}", name);
                }
            }
        });

        let mut health_check = self.health_check_handle.lock().await;
        if let Some(old_handle) = health_check.replace(handle) {
            old_handle.abort();
        }

        info!(
            "✅ Health check task started (checking every {} minutes)",
            HEALTH_CHECK_INTERVAL.as_secs() / 60
        );
    }
}
