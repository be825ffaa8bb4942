use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::dtos::ExpirySummaryDto;
use crate::application::services::{MakeUpService, TransactionService};

/// Result of one maintenance sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub ran_at: DateTime<Utc>,
    pub packages: ExpirySummaryDto,
    pub make_ups_expired: u64,
    /// One entry per sweep step that failed outright
    pub errors: Vec<String>,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.packages.failures == 0
    }
}

/// Task metadata for health monitoring
#[derive(Debug, Clone)]
pub(super) struct TaskMetadata {
    pub task_name: &'static str,
    pub interval: std::time::Duration,
    pub last_execution: Option<DateTime<Utc>>,
    pub last_report: Option<MaintenanceReport>,
}

/// Services a sweep needs; cloned into the spawned task
#[derive(Clone)]
pub(super) struct SweepJob {
    pub transaction_service: Arc<TransactionService>,
    pub makeup_service: Arc<MakeUpService>,
}
