use super::types::{MaintenanceReport, SweepJob, TaskMetadata};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::application::dtos::ExpirySummaryDto;

pub(super) const SWEEP_TASK: &str = "maintenance_sweep";

impl SweepJob {
    /// Expire lapsed packages, then overdue make-up selections.
    ///
    /// A failing step is recorded in the report and does not stop the other.
    pub(super) async fn run(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let mut report = MaintenanceReport {
            ran_at: now,
            packages: ExpirySummaryDto::default(),
            make_ups_expired: 0,
            errors: Vec::new(),
        };

        match self.transaction_service.expire_packages(now).await {
            Ok(summary) => report.packages = summary,
            Err(e) => {
                error!("❌ [MAINTENANCE] Package expiry failed: {}", e);
                report.errors.push(format!("package expiry: {}", e));
            }
        }

        match self.makeup_service.expire_overdue(now).await {
            Ok(expired) => report.make_ups_expired = expired,
            Err(e) => {
                error!("❌ [MAINTENANCE] Make-up expiry failed: {}", e);
                report.errors.push(format!("make-up expiry: {}", e));
            }
        }

        report
    }
}

impl super::MaintenanceScheduler {
    pub(super) async fn spawn_sweep_task(&self, interval: Duration) {
        info!(
            "➕ Spawning maintenance sweep every {} seconds",
            interval.as_secs()
        );

        let task_metadata = Arc::clone(&self.task_metadata);
        task_metadata
            .lock()
            .await
            .entry(SWEEP_TASK)
            .and_modify(|meta| meta.interval = interval)
            .or_insert_with(|| TaskMetadata {
                task_name: SWEEP_TASK,
                interval,
                last_execution: None,
                last_report: None,
            });

        let job = self.job.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // The first tick completes immediately, so a sweep runs at start-up
                ticker.tick().await;

                let now = Utc::now();
                info!(
                    "⏰ [MAINTENANCE] Sweep started at {}",
                    now.format("%Y-%m-%d %H:%M:%S %Z")
                );

                let report = job.run(now).await;
                if report.is_clean() {
                    info!(
                        "✅ [MAINTENANCE] {} packages expired ({} hours), {} make-up selections expired",
                        report.packages.packages_expired,
                        report.packages.hours_expired,
                        report.make_ups_expired
                    );
                } else {
                    warn!(
                        "⚠️  [MAINTENANCE] Sweep finished with {} errors and {} package failures",
                        report.errors.len(),
                        report.packages.failures
                    );
                }

                let mut metadata = task_metadata.lock().await;
                if let Some(meta) = metadata.get_mut(SWEEP_TASK) {
                    meta.last_execution = Some(now);
                    meta.last_report = Some(report);
                }
            }
        });

        let mut tasks = self.tasks.lock().await;
        if let Some(old_handle) = tasks.insert(SWEEP_TASK, handle) {
            warn!("⚠️  Aborting previous maintenance sweep task");
            old_handle.abort();
        }

        info!("✅ Maintenance sweep task registered");
    }
}
