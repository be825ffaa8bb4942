use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

use super::catalog_repo::{into_classes, ClassRow, CLASS_COLUMNS};
use super::ledger_repo::types::{
    into_purchases, into_transactions, PurchaseRow, TransactionRow, PURCHASE_COLUMNS,
    TRANSACTION_COLUMNS,
};
use crate::persistence::SqliteRepositoryBase;
use classledger_domain::analytics::{AnalyticsRepository, PerformanceSample, ReportWindow};
use classledger_domain::catalog::ScheduledClass;
use classledger_domain::ledger::{HourPurchase, HourTransaction};
use classledger_domain::shared::DomainError;

#[derive(FromRow)]
struct SampleRow {
    metric: String,
    value: f64,
    page: Option<String>,
    recorded_at: DateTime<Utc>,
}

/// Window-scoped reads for the reporting service, plus the telemetry sink
pub struct SqliteAnalyticsRepository {
    base: SqliteRepositoryBase,
}

impl SqliteAnalyticsRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }
}

#[async_trait]
impl AnalyticsRepository for SqliteAnalyticsRepository {
    async fn list_transactions_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<HourTransaction>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM hour_transactions
            WHERE created_at >= ?1 AND created_at < ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
            TRANSACTION_COLUMNS
        );
        let rows: Vec<TransactionRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query).bind(window.from).bind(window.to),
                "List transactions for report",
            )
            .await?;
        into_transactions(rows)
    }

    async fn list_completed_purchases_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<HourPurchase>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM hour_purchases
            WHERE payment_status = 'completed' AND created_at >= ?1 AND created_at < ?2
            ORDER BY created_at ASC
            "#,
            PURCHASE_COLUMNS
        );
        let rows: Vec<PurchaseRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query).bind(window.from).bind(window.to),
                "List purchases for report",
            )
            .await?;
        into_purchases(rows)
    }

    async fn list_classes_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<ScheduledClass>, DomainError> {
        let query = format!(
            "SELECT {} FROM classes WHERE starts_at >= ?1 AND starts_at < ?2 ORDER BY starts_at ASC",
            CLASS_COLUMNS
        );
        let rows: Vec<ClassRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query).bind(window.from).bind(window.to),
                "List classes for report",
            )
            .await?;
        into_classes(rows)
    }

    async fn record_performance_sample(
        &self,
        sample: &PerformanceSample,
    ) -> Result<(), DomainError> {
        self.base
            .execute(
                sqlx::query(
                    "INSERT INTO performance_samples (metric, value, page, recorded_at) VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&sample.metric)
                .bind(sample.value)
                .bind(sample.page.as_deref())
                .bind(sample.recorded_at),
                "Record performance sample",
            )
            .await?;
        Ok(())
    }

    async fn list_performance_samples_between(
        &self,
        window: &ReportWindow,
    ) -> Result<Vec<PerformanceSample>, DomainError> {
        let rows: Vec<SampleRow> = self
            .base
            .fetch_all(
                sqlx::query_as(
                    r#"
                    SELECT metric, value, page, recorded_at FROM performance_samples
                    WHERE recorded_at >= ?1 AND recorded_at < ?2
                    ORDER BY recorded_at ASC, id ASC
                    "#,
                )
                .bind(window.from)
                .bind(window.to),
                "List performance samples",
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PerformanceSample {
                metric: row.metric,
                value: row.value,
                page: row.page,
                recorded_at: row.recorded_at,
            })
            .collect())
    }
}
