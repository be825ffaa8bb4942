use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::catalog_repo::insert_booking;
use super::postponement_repo::transition_postponement;
use crate::persistence::{ImmediateTransaction, ResultExt, SqliteRepositoryBase};
use classledger_domain::catalog::{Booking, BookingStatus};
use classledger_domain::makeup::{
    MakeUpClass, MakeUpClassRecord, MakeUpRepository, MakeUpStatus, MakeUpSuggestion,
};
use classledger_domain::postponement::PostponementStatus;
use classledger_domain::shared::{
    BookingId, DomainError, MakeUpClassId, PostponementId, StudentId, SuggestionId,
};

const MAKEUP_COLUMNS: &str = r#"
    id, postponement_id, student_id, alternative_suggestions, selected_suggestion_id,
    student_selected, admin_approved, status, selection_deadline, admin_notes,
    scheduled_booking_id, created_at, updated_at
"#;

#[derive(FromRow)]
struct MakeUpRow {
    id: String,
    postponement_id: String,
    student_id: String,
    alternative_suggestions: String,
    selected_suggestion_id: Option<String>,
    student_selected: bool,
    admin_approved: bool,
    status: String,
    selection_deadline: DateTime<Utc>,
    admin_notes: Option<String>,
    scheduled_booking_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MakeUpRow {
    fn into_domain(self) -> Result<MakeUpClass, DomainError> {
        let alternative_suggestions: Vec<MakeUpSuggestion> =
            serde_json::from_str(&self.alternative_suggestions)
                .map_repo_error("Decode make-up suggestions")?;

        Ok(MakeUpClass::restore(MakeUpClassRecord {
            id: MakeUpClassId::from_string(&self.id),
            postponement_id: PostponementId::from_string(&self.postponement_id),
            student_id: StudentId::from_string(&self.student_id),
            alternative_suggestions,
            selected_suggestion_id: self
                .selected_suggestion_id
                .as_deref()
                .map(SuggestionId::from_string),
            student_selected: self.student_selected,
            admin_approved: self.admin_approved,
            status: MakeUpStatus::from_str(&self.status)?,
            selection_deadline: self.selection_deadline,
            admin_notes: self.admin_notes,
            scheduled_booking_id: self.scheduled_booking_id.as_deref().map(BookingId::from_string),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

async fn find_where(
    conn: &mut SqliteConnection,
    column: &str,
    value: &str,
) -> Result<Option<MakeUpClass>, DomainError> {
    let query = format!(
        "SELECT {} FROM makeup_classes WHERE {} = ?1",
        MAKEUP_COLUMNS, column
    );
    let row: Option<MakeUpRow> = sqlx::query_as(&query)
        .bind(value)
        .fetch_optional(conn)
        .await
        .map_repo_error("Find make-up class")?;
    row.map(MakeUpRow::into_domain).transpose()
}

async fn load(conn: &mut SqliteConnection, id: &MakeUpClassId) -> Result<MakeUpClass, DomainError> {
    find_where(conn, "id", id.as_str())
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Make-up class {} not found", id)))
}

/// Write every mutable column, conditional on the status that was loaded.
async fn store(
    conn: &mut SqliteConnection,
    make_up: &MakeUpClass,
    expected: MakeUpStatus,
) -> Result<(), DomainError> {
    let suggestions = serde_json::to_string(make_up.alternative_suggestions())
        .map_repo_error("Encode make-up suggestions")?;

    let updated = sqlx::query(
        r#"
        UPDATE makeup_classes
        SET alternative_suggestions = ?2, selected_suggestion_id = ?3, student_selected = ?4,
            admin_approved = ?5, status = ?6, selection_deadline = ?7, admin_notes = ?8,
            scheduled_booking_id = ?9, updated_at = ?10
        WHERE id = ?1 AND status = ?11
        "#,
    )
    .bind(make_up.id().as_str())
    .bind(suggestions)
    .bind(make_up.selected_suggestion_id().map(|id| id.as_str()))
    .bind(make_up.student_selected())
    .bind(make_up.admin_approved())
    .bind(make_up.status().as_str())
    .bind(make_up.selection_deadline())
    .bind(make_up.admin_notes())
    .bind(make_up.scheduled_booking_id().map(|id| id.as_str()))
    .bind(make_up.updated_at())
    .bind(expected.as_str())
    .execute(conn)
    .await
    .map_repo_error("Update make-up class")?
    .rows_affected();

    if updated == 0 {
        return Err(DomainError::AlreadyProcessed(format!(
            "Make-up {} changed concurrently",
            make_up.id()
        )));
    }
    Ok(())
}

pub struct SqliteMakeUpRepository {
    base: SqliteRepositoryBase,
}

impl SqliteMakeUpRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }

    /// Load, apply `change`, store; all inside one write transaction.
    async fn update_with<F>(&self, id: &MakeUpClassId, change: F) -> Result<MakeUpClass, DomainError>
    where
        F: FnOnce(&mut MakeUpClass) -> Result<(), DomainError> + Send,
    {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<MakeUpClass, DomainError> = async {
            let mut make_up = load(tx.conn(), id).await?;
            let expected = make_up.status();
            change(&mut make_up)?;
            store(tx.conn(), &make_up, expected).await?;
            Ok(make_up)
        }
        .await;

        tx.finish(result).await
    }
}

#[async_trait]
impl MakeUpRepository for SqliteMakeUpRepository {
    async fn upsert_suggestions(&self, make_up: &MakeUpClass) -> Result<MakeUpClass, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<MakeUpClass, DomainError> = async {
            let suggestions = serde_json::to_string(make_up.alternative_suggestions())
                .map_repo_error("Encode make-up suggestions")?;

            let existing =
                find_where(tx.conn(), "postponement_id", make_up.postponement_id().as_str())
                    .await?;

            match existing {
                None => {
                    let query = format!(
                        r#"
                        INSERT INTO makeup_classes ({})
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                        "#,
                        MAKEUP_COLUMNS
                    );
                    sqlx::query(&query)
                        .bind(make_up.id().as_str())
                        .bind(make_up.postponement_id().as_str())
                        .bind(make_up.student_id().as_str())
                        .bind(&suggestions)
                        .bind(make_up.selected_suggestion_id().map(|id| id.as_str()))
                        .bind(make_up.student_selected())
                        .bind(make_up.admin_approved())
                        .bind(make_up.status().as_str())
                        .bind(make_up.selection_deadline())
                        .bind(make_up.admin_notes())
                        .bind(make_up.scheduled_booking_id().map(|id| id.as_str()))
                        .bind(make_up.created_at())
                        .bind(make_up.updated_at())
                        .execute(tx.conn())
                        .await
                        .map_repo_error("Insert make-up class")?;
                    Ok(make_up.clone())
                }
                Some(current) => {
                    if !current.status().accepts_suggestions() {
                        return Err(DomainError::AlreadyProcessed(format!(
                            "Make-up {} is {}, suggestions are locked",
                            current.id(),
                            current.status().as_str()
                        )));
                    }

                    sqlx::query(
                        r#"
                        UPDATE makeup_classes
                        SET alternative_suggestions = ?2, status = 'suggested',
                            selection_deadline = ?3, updated_at = ?4
                        WHERE id = ?1 AND status IN ('pending', 'suggested')
                        "#,
                    )
                    .bind(current.id().as_str())
                    .bind(&suggestions)
                    .bind(make_up.selection_deadline())
                    .bind(make_up.updated_at())
                    .execute(tx.conn())
                    .await
                    .map_repo_error("Replace make-up suggestions")?;

                    load(tx.conn(), current.id()).await
                }
            }
        }
        .await;

        let stored = tx.finish(result).await?;
        info!(
            make_up_id = %stored.id(),
            postponement_id = %stored.postponement_id(),
            suggestions = stored.alternative_suggestions().len(),
            "Make-up suggestions stored"
        );
        Ok(stored)
    }

    async fn find_by_id(&self, id: &MakeUpClassId) -> Result<Option<MakeUpClass>, DomainError> {
        let query = format!("SELECT {} FROM makeup_classes WHERE id = ?1", MAKEUP_COLUMNS);
        let row: Option<MakeUpRow> = self
            .base
            .fetch_optional(sqlx::query_as(&query).bind(id.as_str()), "Find make-up class")
            .await?;
        row.map(MakeUpRow::into_domain).transpose()
    }

    async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<MakeUpClass>, DomainError> {
        let query = format!(
            "SELECT {} FROM makeup_classes WHERE student_id = ?1 ORDER BY created_at DESC, rowid DESC",
            MAKEUP_COLUMNS
        );
        let rows: Vec<MakeUpRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query).bind(student_id.as_str()),
                "List make-up classes",
            )
            .await?;
        rows.into_iter().map(MakeUpRow::into_domain).collect()
    }

    async fn select_suggestion(
        &self,
        id: &MakeUpClassId,
        suggestion_id: &SuggestionId,
        student_id: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<MakeUpClass, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        // Outer error aborts the write; inner error is committed alongside the
        // expiry the domain applied past the deadline.
        let result: Result<Result<MakeUpClass, DomainError>, DomainError> = async {
            let mut make_up = load(tx.conn(), id).await?;
            let expected = make_up.status();

            match make_up.select(suggestion_id, student_id, now) {
                Ok(()) => {
                    store(tx.conn(), &make_up, expected).await?;
                    Ok(Ok(make_up))
                }
                Err(e) if make_up.status() == MakeUpStatus::Expired => {
                    store(tx.conn(), &make_up, expected).await?;
                    warn!(make_up_id = %id, "Selection after deadline, make-up expired");
                    Ok(Err(e))
                }
                Err(e) => Err(e),
            }
        }
        .await;

        let make_up = tx.finish(result).await??;
        info!(make_up_id = %id, suggestion_id = %suggestion_id, "Make-up suggestion selected");
        Ok(make_up)
    }

    async fn approve(
        &self,
        id: &MakeUpClassId,
        notes: Option<String>,
    ) -> Result<MakeUpClass, DomainError> {
        let make_up = self.update_with(id, |m| m.approve(notes)).await?;
        info!(make_up_id = %id, "Make-up approved");
        Ok(make_up)
    }

    async fn schedule(&self, id: &MakeUpClassId) -> Result<MakeUpClass, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<MakeUpClass, DomainError> = async {
            let mut make_up = load(tx.conn(), id).await?;
            let expected = make_up.status();
            if expected != MakeUpStatus::AdminApproved {
                return Err(DomainError::InvalidState(format!(
                    "Make-up {} is {}, only approved make-ups can be scheduled",
                    id,
                    expected.as_str()
                )));
            }
            let class_id = make_up
                .selected_suggestion()
                .map(|s| s.class_id.clone())
                .ok_or_else(|| {
                    DomainError::DataIntegrity(format!(
                        "Make-up {} has no selected suggestion",
                        id
                    ))
                })?;

            let booking = Booking::new(make_up.student_id().clone(), class_id, BookingStatus::MakeUp);
            insert_booking(tx.conn(), &booking).await?;
            transition_postponement(
                tx.conn(),
                make_up.postponement_id(),
                PostponementStatus::MakeUpScheduled,
            )
            .await?;

            make_up.mark_scheduled(booking.id.clone())?;
            store(tx.conn(), &make_up, expected).await?;
            Ok(make_up)
        }
        .await;

        let make_up = tx.finish(result).await?;
        info!(
            make_up_id = %id,
            booking_id = ?make_up.scheduled_booking_id(),
            "Make-up class scheduled"
        );
        Ok(make_up)
    }

    async fn reject(
        &self,
        id: &MakeUpClassId,
        notes: Option<String>,
    ) -> Result<MakeUpClass, DomainError> {
        let make_up = self.update_with(id, |m| m.reject(notes)).await?;
        info!(make_up_id = %id, "Make-up rejected");
        Ok(make_up)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        self.base
            .execute(
                sqlx::query(
                    r#"
                    UPDATE makeup_classes SET status = 'expired', updated_at = ?1
                    WHERE status IN ('pending', 'suggested') AND selection_deadline < ?1
                    "#,
                )
                .bind(now),
                "Expire overdue make-up classes",
            )
            .await
    }
}
