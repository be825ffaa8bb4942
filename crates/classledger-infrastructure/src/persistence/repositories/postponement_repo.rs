use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::persistence::{ImmediateTransaction, ResultExt, SqliteRepositoryBase};
use classledger_domain::catalog::BookingStatus;
use classledger_domain::postponement::{
    ClassPostponement, PostponementRepository, PostponementStatus,
};
use classledger_domain::shared::{
    BookingId, ClassId, DomainError, LeaveRequestId, PostponementId, StudentId,
};

const POSTPONEMENT_COLUMNS: &str = r#"
    id, booking_id, student_id, class_id, leave_request_id, postponement_reason,
    status, hours_affected, original_class_date, created_at, updated_at
"#;

#[derive(FromRow)]
struct PostponementRow {
    id: String,
    booking_id: String,
    student_id: String,
    class_id: String,
    leave_request_id: Option<String>,
    postponement_reason: String,
    status: String,
    hours_affected: f64,
    original_class_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostponementRow {
    fn into_domain(self) -> Result<ClassPostponement, DomainError> {
        Ok(ClassPostponement::restore(
            PostponementId::from_string(&self.id),
            BookingId::from_string(&self.booking_id),
            StudentId::from_string(&self.student_id),
            ClassId::from_string(&self.class_id),
            self.leave_request_id.as_deref().map(LeaveRequestId::from_string),
            self.postponement_reason,
            PostponementStatus::from_str(&self.status)?,
            self.hours_affected,
            self.original_class_date,
            self.created_at,
            self.updated_at,
        ))
    }
}

pub(crate) async fn find_postponement(
    conn: &mut SqliteConnection,
    id: &PostponementId,
) -> Result<Option<ClassPostponement>, DomainError> {
    let query = format!(
        "SELECT {} FROM class_postponements WHERE id = ?1",
        POSTPONEMENT_COLUMNS
    );
    let row: Option<PostponementRow> = sqlx::query_as(&query)
        .bind(id.as_str())
        .fetch_optional(conn)
        .await
        .map_repo_error("Find postponement")?;
    row.map(PostponementRow::into_domain).transpose()
}

/// Load, move and store a postponement on an open write transaction.
///
/// The update is conditional on the status that was read, so a concurrent
/// move surfaces as `InvalidState` instead of being overwritten.
pub(crate) async fn transition_postponement(
    conn: &mut SqliteConnection,
    id: &PostponementId,
    to: PostponementStatus,
) -> Result<ClassPostponement, DomainError> {
    let mut postponement = find_postponement(&mut *conn, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Postponement {} not found", id)))?;
    let from = postponement.status();
    postponement.transition_to(to)?;

    let updated = sqlx::query(
        "UPDATE class_postponements SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
    )
    .bind(id.as_str())
    .bind(postponement.status().as_str())
    .bind(postponement.updated_at())
    .bind(from.as_str())
    .execute(&mut *conn)
    .await
    .map_repo_error("Update postponement status")?
    .rows_affected();

    if updated == 0 {
        return Err(DomainError::InvalidState(format!(
            "Postponement {} changed while moving to {}",
            id,
            to.as_str()
        )));
    }

    if to == PostponementStatus::Cancelled {
        set_booking_status(conn, postponement.booking_id(), BookingStatus::Booked).await?;
    }
    Ok(postponement)
}

async fn set_booking_status(
    conn: &mut SqliteConnection,
    booking_id: &BookingId,
    status: BookingStatus,
) -> Result<(), DomainError> {
    let updated = sqlx::query("UPDATE bookings SET status = ?2 WHERE id = ?1")
        .bind(booking_id.as_str())
        .bind(status.as_str())
        .execute(conn)
        .await
        .map_repo_error("Update booking status")?
        .rows_affected();
    if updated == 0 {
        return Err(DomainError::NotFound(format!(
            "Booking {} not found",
            booking_id
        )));
    }
    Ok(())
}

pub struct SqlitePostponementRepository {
    base: SqliteRepositoryBase,
}

impl SqlitePostponementRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }
}

#[async_trait]
impl PostponementRepository for SqlitePostponementRepository {
    async fn create(&self, postponement: &ClassPostponement) -> Result<(), DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<(), DomainError> = async {
            let query = format!(
                "INSERT INTO class_postponements ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                POSTPONEMENT_COLUMNS
            );
            sqlx::query(&query)
                .bind(postponement.id().as_str())
                .bind(postponement.booking_id().as_str())
                .bind(postponement.student_id().as_str())
                .bind(postponement.class_id().as_str())
                .bind(postponement.leave_request_id().map(|id| id.as_str()))
                .bind(postponement.postponement_reason())
                .bind(postponement.status().as_str())
                .bind(postponement.hours_affected())
                .bind(postponement.original_class_date())
                .bind(postponement.created_at())
                .bind(postponement.updated_at())
                .execute(tx.conn())
                .await
                .map_repo_error("Insert postponement")
                .map_err(|e| match e {
                    DomainError::AlreadyProcessed(_) => DomainError::AlreadyProcessed(format!(
                        "Booking {} already has an active postponement",
                        postponement.booking_id()
                    )),
                    other => other,
                })?;

            set_booking_status(tx.conn(), postponement.booking_id(), BookingStatus::Postponed)
                .await
        }
        .await;

        tx.finish(result).await?;
        info!(
            postponement_id = %postponement.id(),
            booking_id = %postponement.booking_id(),
            student_id = %postponement.student_id(),
            "Class postponed"
        );
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PostponementId,
    ) -> Result<Option<ClassPostponement>, DomainError> {
        let query = format!(
            "SELECT {} FROM class_postponements WHERE id = ?1",
            POSTPONEMENT_COLUMNS
        );
        let row: Option<PostponementRow> = self
            .base
            .fetch_optional(sqlx::query_as(&query).bind(id.as_str()), "Find postponement")
            .await?;
        row.map(PostponementRow::into_domain).transpose()
    }

    async fn find_by_leave_request(
        &self,
        leave_request_id: &LeaveRequestId,
    ) -> Result<Option<ClassPostponement>, DomainError> {
        let query = format!(
            "SELECT {} FROM class_postponements WHERE leave_request_id = ?1",
            POSTPONEMENT_COLUMNS
        );
        let row: Option<PostponementRow> = self
            .base
            .fetch_optional(
                sqlx::query_as(&query).bind(leave_request_id.as_str()),
                "Find postponement by leave request",
            )
            .await?;
        row.map(PostponementRow::into_domain).transpose()
    }

    async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<ClassPostponement>, DomainError> {
        let query = format!(
            "SELECT {} FROM class_postponements WHERE student_id = ?1 ORDER BY created_at DESC, rowid DESC",
            POSTPONEMENT_COLUMNS
        );
        let rows: Vec<PostponementRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query).bind(student_id.as_str()),
                "List postponements",
            )
            .await?;
        rows.into_iter().map(PostponementRow::into_domain).collect()
    }

    async fn transition(
        &self,
        id: &PostponementId,
        to: PostponementStatus,
    ) -> Result<ClassPostponement, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;
        let result = transition_postponement(tx.conn(), id, to).await;
        let postponement = tx.finish(result).await?;

        info!(postponement_id = %id, status = to.as_str(), "Postponement updated");
        Ok(postponement)
    }
}
