use async_trait::async_trait;

use super::HourAdjustment;
use crate::ledger::HourTransaction;
use crate::shared::{Actor, AdjustmentId, DomainError};

#[async_trait]
pub trait AdjustmentRepository: Send + Sync {
    async fn create(&self, adjustment: &HourAdjustment) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &AdjustmentId) -> Result<Option<HourAdjustment>, DomainError>;

    /// Oldest first
    async fn list_pending(&self) -> Result<Vec<HourAdjustment>, DomainError>;

    /// Flip `pending -> approved` and write the ledger entry in one step.
    ///
    /// The projected balance is re-checked against the live ledger; a
    /// negative result fails with `NegativeBalance` and nothing changes.
    async fn approve(
        &self,
        id: &AdjustmentId,
        approver: &Actor,
        notes: Option<String>,
    ) -> Result<(HourAdjustment, HourTransaction), DomainError>;

    /// Flip `pending -> rejected`; never touches the ledger.
    async fn reject(
        &self,
        id: &AdjustmentId,
        approver: &Actor,
        notes: Option<String>,
    ) -> Result<HourAdjustment, DomainError>;
}
