use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::ledger_repo::entries;
use crate::persistence::{ImmediateTransaction, ResultExt, SqliteRepositoryBase};
use classledger_domain::adjustment::{
    AdjustmentRepository, AdjustmentType, ApprovalStatus, HourAdjustment,
};
use classledger_domain::ledger::HourTransaction;
use classledger_domain::shared::{Actor, AdjustmentId, DomainError, StudentId, TransactionId};

const ADJUSTMENT_COLUMNS: &str = r#"
    id, student_id, adjustment_type, hours, reason, approval_status, requested_by,
    approved_by, resolution_notes, transaction_id, created_at, resolved_at
"#;

#[derive(FromRow)]
struct AdjustmentRow {
    id: String,
    student_id: String,
    adjustment_type: String,
    hours: f64,
    reason: String,
    approval_status: String,
    requested_by: String,
    approved_by: Option<String>,
    resolution_notes: Option<String>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl AdjustmentRow {
    fn into_domain(self) -> Result<HourAdjustment, DomainError> {
        Ok(HourAdjustment::restore(
            AdjustmentId::from_string(&self.id),
            StudentId::from_string(&self.student_id),
            AdjustmentType::from_str(&self.adjustment_type)?,
            self.hours,
            self.reason,
            ApprovalStatus::from_str(&self.approval_status)?,
            self.requested_by,
            self.approved_by,
            self.resolution_notes,
            self.transaction_id.as_deref().map(TransactionId::from_string),
            self.created_at,
            self.resolved_at,
        ))
    }
}

pub struct SqliteAdjustmentRepository {
    base: SqliteRepositoryBase,
}

impl SqliteAdjustmentRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }

    async fn load(
        conn: &mut SqliteConnection,
        id: &AdjustmentId,
    ) -> Result<HourAdjustment, DomainError> {
        let query = format!(
            "SELECT {} FROM hour_adjustments WHERE id = ?1",
            ADJUSTMENT_COLUMNS
        );
        let row: Option<AdjustmentRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(conn)
            .await
            .map_repo_error("Find adjustment")?;
        row.ok_or_else(|| DomainError::NotFound(format!("Adjustment {} not found", id)))?
            .into_domain()
    }

    /// Conditional `pending -> resolved` write; zero rows means someone got there first.
    async fn store_resolution(
        conn: &mut SqliteConnection,
        adjustment: &HourAdjustment,
    ) -> Result<(), DomainError> {
        let updated = sqlx::query(
            r#"
            UPDATE hour_adjustments
            SET approval_status = ?2, approved_by = ?3, resolution_notes = ?4,
                transaction_id = ?5, resolved_at = ?6
            WHERE id = ?1 AND approval_status = 'pending'
            "#,
        )
        .bind(adjustment.id().as_str())
        .bind(adjustment.approval_status().as_str())
        .bind(adjustment.approved_by())
        .bind(adjustment.resolution_notes())
        .bind(adjustment.transaction_id().map(|id| id.as_str()))
        .bind(adjustment.resolved_at())
        .execute(conn)
        .await
        .map_repo_error("Resolve adjustment")?
        .rows_affected();

        if updated == 0 {
            return Err(DomainError::AlreadyProcessed(format!(
                "Adjustment {} was already resolved",
                adjustment.id()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AdjustmentRepository for SqliteAdjustmentRepository {
    async fn create(&self, adjustment: &HourAdjustment) -> Result<(), DomainError> {
        let query = format!(
            "INSERT INTO hour_adjustments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            ADJUSTMENT_COLUMNS
        );
        self.base
            .execute(
                sqlx::query(&query)
                    .bind(adjustment.id().as_str())
                    .bind(adjustment.student_id().as_str())
                    .bind(adjustment.adjustment_type().as_str())
                    .bind(adjustment.hours())
                    .bind(adjustment.reason())
                    .bind(adjustment.approval_status().as_str())
                    .bind(adjustment.requested_by())
                    .bind(adjustment.approved_by())
                    .bind(adjustment.resolution_notes())
                    .bind(adjustment.transaction_id().map(|id| id.as_str()))
                    .bind(adjustment.created_at())
                    .bind(adjustment.resolved_at()),
                "Insert adjustment",
            )
            .await?;

        info!(
            adjustment_id = %adjustment.id(),
            student_id = %adjustment.student_id(),
            hours = adjustment.signed_hours(),
            "Adjustment requested"
        );
        Ok(())
    }

    async fn find_by_id(&self, id: &AdjustmentId) -> Result<Option<HourAdjustment>, DomainError> {
        let query = format!(
            "SELECT {} FROM hour_adjustments WHERE id = ?1",
            ADJUSTMENT_COLUMNS
        );
        let row: Option<AdjustmentRow> = self
            .base
            .fetch_optional(sqlx::query_as(&query).bind(id.as_str()), "Find adjustment")
            .await?;
        row.map(AdjustmentRow::into_domain).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<HourAdjustment>, DomainError> {
        let query = format!(
            "SELECT {} FROM hour_adjustments WHERE approval_status = 'pending' ORDER BY created_at ASC, rowid ASC",
            ADJUSTMENT_COLUMNS
        );
        let rows: Vec<AdjustmentRow> = self
            .base
            .fetch_all(sqlx::query_as(&query), "List pending adjustments")
            .await?;
        rows.into_iter().map(AdjustmentRow::into_domain).collect()
    }

    async fn approve(
        &self,
        id: &AdjustmentId,
        approver: &Actor,
        notes: Option<String>,
    ) -> Result<(HourAdjustment, HourTransaction), DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<(HourAdjustment, HourTransaction), DomainError> = async {
            let mut adjustment = Self::load(tx.conn(), id).await?;
            adjustment.ensure_resolvable_by(approver)?;

            let current = entries::balance(tx.conn(), adjustment.student_id()).await?;
            adjustment.check_projection(current)?;

            let txn = entries::append(tx.conn(), adjustment.to_draft(&approver.user_id)).await?;
            adjustment.mark_approved(&approver.user_id, notes, txn.id().clone())?;
            Self::store_resolution(tx.conn(), &adjustment).await?;
            Ok((adjustment, txn))
        }
        .await;

        let (adjustment, txn) = tx.finish(result).await?;
        info!(
            adjustment_id = %id,
            approver = %approver.user_id,
            balance_after = txn.balance_after(),
            "Adjustment approved"
        );
        Ok((adjustment, txn))
    }

    async fn reject(
        &self,
        id: &AdjustmentId,
        approver: &Actor,
        notes: Option<String>,
    ) -> Result<HourAdjustment, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<HourAdjustment, DomainError> = async {
            let mut adjustment = Self::load(tx.conn(), id).await?;
            adjustment.ensure_resolvable_by(approver)?;
            adjustment.mark_rejected(&approver.user_id, notes)?;
            Self::store_resolution(tx.conn(), &adjustment).await?;
            Ok(adjustment)
        }
        .await;

        let adjustment = tx.finish(result).await?;
        info!(adjustment_id = %id, approver = %approver.user_id, "Adjustment rejected");
        Ok(adjustment)
    }
}
