use async_trait::async_trait;

use super::{ClassPostponement, PostponementStatus};
use crate::shared::{DomainError, LeaveRequestId, PostponementId, StudentId};

#[async_trait]
pub trait PostponementRepository: Send + Sync {
    /// Insert the postponement and mark its booking `postponed` together.
    ///
    /// Fails with `AlreadyProcessed` when the booking already has an active
    /// postponement.
    async fn create(&self, postponement: &ClassPostponement) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PostponementId)
        -> Result<Option<ClassPostponement>, DomainError>;

    async fn find_by_leave_request(
        &self,
        leave_request_id: &LeaveRequestId,
    ) -> Result<Option<ClassPostponement>, DomainError>;

    /// Newest first
    async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<ClassPostponement>, DomainError>;

    /// Conditional status change; `InvalidState` when the current status is
    /// not a legal source for `to`.
    async fn transition(
        &self,
        id: &PostponementId,
        to: PostponementStatus,
    ) -> Result<ClassPostponement, DomainError>;
}
