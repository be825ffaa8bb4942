use std::sync::Arc;
use tracing::{info, instrument};

use classledger_domain::adjustment::{AdjustmentRepository, AdjustmentType, HourAdjustment};
use classledger_domain::ledger::{HourTransaction, LedgerRepository};
use classledger_domain::shared::{Actor, AdjustmentId, DomainError, StudentId};

/// Manual hour corrections behind second-party approval.
///
/// Nothing reaches the ledger until `approve`.
pub struct AdjustmentService {
    adjustment_repo: Arc<dyn AdjustmentRepository>,
    ledger_repo: Arc<dyn LedgerRepository>,
}

impl AdjustmentService {
    pub fn new(
        adjustment_repo: Arc<dyn AdjustmentRepository>,
        ledger_repo: Arc<dyn LedgerRepository>,
    ) -> Self {
        Self {
            adjustment_repo,
            ledger_repo,
        }
    }

    #[instrument(skip(self, reason, actor), fields(student_id = %student_id))]
    pub async fn create(
        &self,
        student_id: StudentId,
        adjustment_type: AdjustmentType,
        hours: f64,
        reason: &str,
        actor: Option<&Actor>,
    ) -> Result<HourAdjustment, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let current_balance = self.ledger_repo.calculate_balance(&student_id).await?;

        let adjustment = HourAdjustment::request(
            student_id,
            adjustment_type,
            hours,
            reason,
            &actor.user_id,
            current_balance,
        )?;
        self.adjustment_repo.create(&adjustment).await?;

        info!(
            adjustment_id = %adjustment.id(),
            kind = adjustment_type.as_str(),
            hours = adjustment.hours(),
            requested_by = %actor.user_id,
            "Adjustment awaiting approval"
        );
        Ok(adjustment)
    }

    pub async fn approve(
        &self,
        adjustment_id: &AdjustmentId,
        actor: Option<&Actor>,
        notes: Option<String>,
    ) -> Result<(HourAdjustment, HourTransaction), DomainError> {
        let actor = Actor::require_staff(actor)?;
        let (adjustment, txn) = self
            .adjustment_repo
            .approve(adjustment_id, actor, notes)
            .await?;

        info!(
            adjustment_id = %adjustment_id,
            approved_by = %actor.user_id,
            balance_after = txn.balance_after(),
            "Adjustment approved"
        );
        Ok((adjustment, txn))
    }

    pub async fn reject(
        &self,
        adjustment_id: &AdjustmentId,
        actor: Option<&Actor>,
        notes: Option<String>,
    ) -> Result<HourAdjustment, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let adjustment = self
            .adjustment_repo
            .reject(adjustment_id, actor, notes)
            .await?;

        info!(adjustment_id = %adjustment_id, rejected_by = %actor.user_id, "Adjustment rejected");
        Ok(adjustment)
    }

    pub async fn list_pending(&self) -> Result<Vec<HourAdjustment>, DomainError> {
        self.adjustment_repo.list_pending().await
    }
}
