use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use classledger_domain::ledger::{
    BalanceCalculator, BalanceDetail, BalancePolicy, LedgerRepository, PurchaseRepository,
};
use classledger_domain::shared::{DomainError, StudentId};

/// Read side of the hour ledger
pub struct BalanceService {
    ledger_repo: Arc<dyn LedgerRepository>,
    purchase_repo: Arc<dyn PurchaseRepository>,
    calculator: BalanceCalculator,
}

impl BalanceService {
    pub fn new(
        ledger_repo: Arc<dyn LedgerRepository>,
        purchase_repo: Arc<dyn PurchaseRepository>,
        policy: BalancePolicy,
    ) -> Self {
        Self {
            ledger_repo,
            purchase_repo,
            calculator: BalanceCalculator::new(policy),
        }
    }

    /// Zero for a student with no ledger entries
    pub async fn get_balance(&self, student_id: &StudentId) -> Result<f64, DomainError> {
        self.ledger_repo.calculate_balance(student_id).await
    }

    pub async fn get_balance_detail(
        &self,
        student_id: &StudentId,
    ) -> Result<BalanceDetail, DomainError> {
        let total_hours = self.ledger_repo.calculate_balance(student_id).await?;
        let purchases = self.purchase_repo.find_by_student(student_id).await?;
        let recent = self
            .ledger_repo
            .list_transactions(
                student_id,
                self.calculator.policy().recent_transaction_count as i64,
                0,
            )
            .await?;

        let detail =
            self.calculator
                .detail(student_id.clone(), total_hours, &purchases, recent, Utc::now());

        debug!(
            student_id = %student_id,
            total_hours = detail.total_hours,
            active_packages = detail.active_packages.len(),
            alerts = detail.active_alerts.len(),
            "Balance detail assembled"
        );

        Ok(detail)
    }
}
