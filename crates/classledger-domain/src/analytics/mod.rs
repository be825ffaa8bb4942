//! Read-side report builders.
//!
//! Every function here is pure: the caller loads rows for a window and the
//! builders only aggregate them.

mod class_efficiency;
mod consumption;
mod performance;
mod repository;
mod revenue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

pub use class_efficiency::{
    class_efficiency_report, ClassEfficiencyReport, EfficiencyBucket, EfficiencyThresholds,
    Recommendation, RecommendationKind,
};
pub use consumption::{consumption_report, ConsumptionDay, ConsumptionReport, StudentConsumption};
pub use performance::{
    performance_report, MetricRating, MetricSummary, PerformanceReport, PerformanceSample,
};
pub use repository::AnalyticsRepository;
pub use revenue::{revenue_report, PackageRevenue, RevenueDay, RevenueReport};

/// Half-open reporting window `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, DomainError> {
        if from >= to {
            return Err(DomainError::Validation(
                "Report window start must be before its end".to_string(),
            ));
        }
        Ok(Self { from, to })
    }

    /// The `days` days ending at `now`
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Result<Self, DomainError> {
        Self::new(now - chrono::Duration::days(days), now)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at < self.to
    }
}

pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
