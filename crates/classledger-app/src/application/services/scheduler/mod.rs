mod health_check;
mod task_manager;
mod task_spawner;
mod types;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use super::{MakeUpService, TransactionService};
use task_spawner::SWEEP_TASK;
use types::{SweepJob, TaskMetadata};

pub use types::MaintenanceReport;

/// Periodic package and make-up expiry
pub struct MaintenanceScheduler {
    job: SweepJob,
    /// Active tasks mapped by name
    tasks: Arc<Mutex<HashMap<&'static str, JoinHandle<()>>>>,
    /// Task metadata for health monitoring
    task_metadata: Arc<Mutex<HashMap<&'static str, TaskMetadata>>>,
    /// Health check task handle
    health_check_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MaintenanceScheduler {
    pub fn new(
        transaction_service: Arc<TransactionService>,
        makeup_service: Arc<MakeUpService>,
    ) -> Self {
        Self {
            job: SweepJob {
                transaction_service,
                makeup_service,
            },
            tasks: Arc::new(Mutex::new(HashMap::new())),
            task_metadata: Arc::new(Mutex::new(HashMap::new())),
            health_check_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn start(&self, interval: Duration) {
        self.spawn_sweep_task(interval).await;
        self.start_health_check_task().await;
        info!("✅ Maintenance scheduler started (using tokio timer)");
    }

    /// Run one sweep inline, outside the timer.
    pub async fn run_once(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let report = self.job.run(now).await;

        let mut metadata = self.task_metadata.lock().await;
        let meta = metadata.entry(SWEEP_TASK).or_insert_with(|| TaskMetadata {
            task_name: SWEEP_TASK,
            interval: Duration::ZERO,
            last_execution: None,
            last_report: None,
        });
        meta.last_execution = Some(now);
        meta.last_report = Some(report.clone());
        report
    }

    /// Report of the most recent timer-driven or inline sweep
    pub async fn last_report(&self) -> Option<MaintenanceReport> {
        self.task_metadata
            .lock()
            .await
            .get(SWEEP_TASK)
            .and_then(|meta| meta.last_report.clone())
    }
}
