use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::ledger_repo::entries;
use crate::persistence::{ImmediateTransaction, ResultExt, SqliteRepositoryBase};
use classledger_domain::leave::{
    LeaveRequest, LeaveRequestRecord, LeaveRequestRepository, LeaveStatus, LeaveType,
};
use classledger_domain::ledger::HourTransaction;
use classledger_domain::shared::{BookingId, ClassId, DomainError, LeaveRequestId, StudentId};

const LEAVE_COLUMNS: &str = r#"
    id, student_id, class_id, booking_id, class_date, leave_type, reason,
    hours_before_class, meets_48_hour_rule, status, class_hours, refund_percentage,
    hours_to_refund, refund_processed, auto_approved, affected_classes,
    reviewed_by, review_notes, submitted_at, reviewed_at
"#;

#[derive(FromRow)]
struct LeaveRequestRow {
    id: String,
    student_id: String,
    class_id: Option<String>,
    booking_id: Option<String>,
    class_date: DateTime<Utc>,
    leave_type: String,
    reason: Option<String>,
    hours_before_class: f64,
    meets_48_hour_rule: bool,
    status: String,
    class_hours: f64,
    refund_percentage: f64,
    hours_to_refund: f64,
    refund_processed: bool,
    auto_approved: bool,
    affected_classes: i64,
    reviewed_by: Option<String>,
    review_notes: Option<String>,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

impl LeaveRequestRow {
    fn into_domain(self) -> Result<LeaveRequest, DomainError> {
        let leave_type = LeaveType::from_str(&self.leave_type).map_err(|_| {
            DomainError::DataIntegrity(format!("Unknown leave type: {}", self.leave_type))
        })?;
        let affected_classes = u32::try_from(self.affected_classes).map_err(|_| {
            DomainError::DataIntegrity(format!(
                "Invalid affected class count {} on leave request {}",
                self.affected_classes, self.id
            ))
        })?;

        Ok(LeaveRequest::restore(LeaveRequestRecord {
            id: LeaveRequestId::from_string(&self.id),
            student_id: StudentId::from_string(&self.student_id),
            class_id: self.class_id.as_deref().map(ClassId::from_string),
            booking_id: self.booking_id.as_deref().map(BookingId::from_string),
            class_date: self.class_date,
            leave_type,
            reason: self.reason,
            hours_before_class: self.hours_before_class,
            meets_48_hour_rule: self.meets_48_hour_rule,
            status: LeaveStatus::from_str(&self.status)?,
            class_hours: self.class_hours,
            refund_percentage: self.refund_percentage,
            hours_to_refund: self.hours_to_refund,
            refund_processed: self.refund_processed,
            auto_approved: self.auto_approved,
            affected_classes,
            reviewed_by: self.reviewed_by,
            review_notes: self.review_notes,
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
        }))
    }
}

pub struct SqliteLeaveRequestRepository {
    base: SqliteRepositoryBase,
}

impl SqliteLeaveRequestRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }

    async fn load(
        conn: &mut SqliteConnection,
        id: &LeaveRequestId,
    ) -> Result<LeaveRequest, DomainError> {
        let query = format!("SELECT {} FROM leave_requests WHERE id = ?1", LEAVE_COLUMNS);
        let row: Option<LeaveRequestRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(conn)
            .await
            .map_repo_error("Find leave request")?;
        row.ok_or_else(|| DomainError::NotFound(format!("Leave request {} not found", id)))?
            .into_domain()
    }
}

#[async_trait]
impl LeaveRequestRepository for SqliteLeaveRequestRepository {
    async fn create(&self, request: &LeaveRequest) -> Result<(), DomainError> {
        let query = format!(
            r#"
            INSERT INTO leave_requests ({})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            "#,
            LEAVE_COLUMNS
        );
        self.base
            .execute(
                sqlx::query(&query)
                    .bind(request.id().as_str())
                    .bind(request.student_id().as_str())
                    .bind(request.class_id().map(|id| id.as_str()))
                    .bind(request.booking_id().map(|id| id.as_str()))
                    .bind(request.class_date())
                    .bind(request.leave_type().as_str())
                    .bind(request.reason())
                    .bind(request.hours_before_class())
                    .bind(request.meets_48_hour_rule())
                    .bind(request.status().as_str())
                    .bind(request.class_hours())
                    .bind(request.refund_percentage())
                    .bind(request.hours_to_refund())
                    .bind(request.refund_processed())
                    .bind(request.auto_approved())
                    .bind(i64::from(request.affected_classes()))
                    .bind(request.reviewed_by())
                    .bind(request.review_notes())
                    .bind(request.submitted_at())
                    .bind(request.reviewed_at()),
                "Insert leave request",
            )
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &LeaveRequestId) -> Result<Option<LeaveRequest>, DomainError> {
        let query = format!("SELECT {} FROM leave_requests WHERE id = ?1", LEAVE_COLUMNS);
        let row: Option<LeaveRequestRow> = self
            .base
            .fetch_optional(sqlx::query_as(&query).bind(id.as_str()), "Find leave request")
            .await?;
        row.map(LeaveRequestRow::into_domain).transpose()
    }

    async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<LeaveRequest>, DomainError> {
        let query = format!(
            "SELECT {} FROM leave_requests WHERE student_id = ?1 ORDER BY submitted_at DESC, rowid DESC",
            LEAVE_COLUMNS
        );
        let rows: Vec<LeaveRequestRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query).bind(student_id.as_str()),
                "List leave requests",
            )
            .await?;
        rows.into_iter().map(LeaveRequestRow::into_domain).collect()
    }

    async fn list_pending(&self) -> Result<Vec<LeaveRequest>, DomainError> {
        let query = format!(
            "SELECT {} FROM leave_requests WHERE status = 'pending' ORDER BY submitted_at ASC, rowid ASC",
            LEAVE_COLUMNS
        );
        let rows: Vec<LeaveRequestRow> = self
            .base
            .fetch_all(sqlx::query_as(&query), "List pending leave requests")
            .await?;
        rows.into_iter().map(LeaveRequestRow::into_domain).collect()
    }

    async fn count_since(
        &self,
        student_id: &StudentId,
        since: DateTime<Utc>,
    ) -> Result<u32, DomainError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM leave_requests
            WHERE student_id = ?1 AND submitted_at >= ?2 AND status <> 'cancelled'
            "#,
        )
        .bind(student_id.as_str())
        .bind(since)
        .fetch_one(self.base.pool())
        .await
        .map_repo_error("Count recent leave requests")?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn resolve(
        &self,
        id: &LeaveRequestId,
        to: LeaveStatus,
        reviewed_by: &str,
        notes: Option<String>,
    ) -> Result<LeaveRequest, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<LeaveRequest, DomainError> = async {
            let mut request = Self::load(tx.conn(), id).await?;
            match to {
                LeaveStatus::Approved => request.approve(reviewed_by, notes)?,
                LeaveStatus::Rejected => request.reject(reviewed_by, notes)?,
                LeaveStatus::Cancelled => {
                    request.cancel(&StudentId::from_string(reviewed_by))?
                }
                LeaveStatus::Pending => {
                    return Err(DomainError::InvalidState(
                        "A leave request cannot be moved back to pending".to_string(),
                    ))
                }
            }

            let updated = sqlx::query(
                r#"
                UPDATE leave_requests
                SET status = ?2, reviewed_by = ?3, review_notes = ?4, reviewed_at = ?5
                WHERE id = ?1 AND status = 'pending'
                "#,
            )
            .bind(id.as_str())
            .bind(request.status().as_str())
            .bind(request.reviewed_by())
            .bind(request.review_notes())
            .bind(request.reviewed_at())
            .execute(tx.conn())
            .await
            .map_repo_error("Resolve leave request")?
            .rows_affected();

            if updated == 0 {
                return Err(DomainError::AlreadyProcessed(format!(
                    "Leave request {} was already resolved",
                    id
                )));
            }
            Ok(request)
        }
        .await;

        let request = tx.finish(result).await?;
        info!(
            leave_request_id = %id,
            status = request.status().as_str(),
            reviewed_by = reviewed_by,
            "Leave request resolved"
        );
        Ok(request)
    }

    async fn process_refund(
        &self,
        id: &LeaveRequestId,
        processed_by: &str,
    ) -> Result<HourTransaction, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<HourTransaction, DomainError> = async {
            let mut request = Self::load(tx.conn(), id).await?;
            let draft = request.refund_draft(processed_by)?;
            request.mark_refund_processed()?;

            let flagged = sqlx::query(
                "UPDATE leave_requests SET refund_processed = 1 WHERE id = ?1 AND refund_processed = 0",
            )
            .bind(id.as_str())
            .execute(tx.conn())
            .await
            .map_repo_error("Flag leave refund processed")?
            .rows_affected();
            if flagged == 0 {
                return Err(DomainError::AlreadyProcessed(format!(
                    "Refund for leave request {} already processed",
                    id
                )));
            }

            entries::append(tx.conn(), draft).await
        }
        .await;

        let txn = tx.finish(result).await?;
        info!(
            leave_request_id = %id,
            hours = txn.hours_amount(),
            balance_after = txn.balance_after(),
            "Leave refund credited"
        );
        Ok(txn)
    }
}
