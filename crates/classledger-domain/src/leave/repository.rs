use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{LeaveRequest, LeaveStatus};
use crate::ledger::HourTransaction;
use crate::shared::{DomainError, LeaveRequestId, StudentId};

#[async_trait]
pub trait LeaveRequestRepository: Send + Sync {
    async fn create(&self, request: &LeaveRequest) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &LeaveRequestId) -> Result<Option<LeaveRequest>, DomainError>;

    /// Newest first
    async fn list_for_student(&self, student_id: &StudentId)
        -> Result<Vec<LeaveRequest>, DomainError>;

    /// Oldest first
    async fn list_pending(&self) -> Result<Vec<LeaveRequest>, DomainError>;

    /// Requests submitted since `since`, cancelled ones excluded
    async fn count_since(
        &self,
        student_id: &StudentId,
        since: DateTime<Utc>,
    ) -> Result<u32, DomainError>;

    /// Move a pending request to `to`.
    ///
    /// Conditional on the row still being `pending`; otherwise
    /// `AlreadyProcessed` and nothing changes.
    async fn resolve(
        &self,
        id: &LeaveRequestId,
        to: LeaveStatus,
        reviewed_by: &str,
        notes: Option<String>,
    ) -> Result<LeaveRequest, DomainError>;

    /// Credit the refund and set `refund_processed`, once.
    ///
    /// A second call fails with `AlreadyProcessed` before writing anything.
    async fn process_refund(
        &self,
        id: &LeaveRequestId,
        processed_by: &str,
    ) -> Result<HourTransaction, DomainError>;
}
