use async_trait::async_trait;

use super::{PerformanceSample, ReportWindow};
use crate::catalog::ScheduledClass;
use crate::ledger::{HourPurchase, HourTransaction};
use crate::shared::DomainError;

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn list_transactions_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<HourTransaction>, DomainError>;

    async fn list_completed_purchases_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<HourPurchase>, DomainError>;

    async fn list_classes_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<ScheduledClass>, DomainError>;

    async fn record_performance_sample(&self, sample: &PerformanceSample)
        -> Result<(), DomainError>;

    async fn list_performance_samples_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<PerformanceSample>, DomainError>;
}
