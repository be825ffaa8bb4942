use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::MakeUpClass;
use crate::shared::{DomainError, MakeUpClassId, StudentId, SuggestionId};

#[async_trait]
pub trait MakeUpRepository: Send + Sync {
    /// Store the suggestion set for a postponement.
    ///
    /// Creates the record, or overwrites suggestions and deadline in place when
    /// one already exists for the postponement and is still `pending` or
    /// `suggested`. A record past that point yields `AlreadyProcessed`.
    /// Concurrent callers for one postponement never produce two records.
    async fn upsert_suggestions(&self, make_up: &MakeUpClass) -> Result<MakeUpClass, DomainError>;

    async fn find_by_id(&self, id: &MakeUpClassId) -> Result<Option<MakeUpClass>, DomainError>;

    /// Newest first
    async fn list_for_student(&self, student_id: &StudentId)
        -> Result<Vec<MakeUpClass>, DomainError>;

    /// Record the student's pick; past the deadline the record is expired instead.
    async fn select_suggestion(
        &self,
        id: &MakeUpClassId,
        suggestion_id: &SuggestionId,
        student_id: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<MakeUpClass, DomainError>;

    async fn approve(
        &self,
        id: &MakeUpClassId,
        notes: Option<String>,
    ) -> Result<MakeUpClass, DomainError>;

    /// Book the selected class, take a seat, and mark the postponement
    /// `make_up_scheduled` and the make-up `scheduled`, all at once.
    async fn schedule(&self, id: &MakeUpClassId) -> Result<MakeUpClass, DomainError>;

    async fn reject(
        &self,
        id: &MakeUpClassId,
        notes: Option<String>,
    ) -> Result<MakeUpClass, DomainError>;

    /// Expire every unselected record whose deadline passed; returns the count.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, DomainError>;
}
