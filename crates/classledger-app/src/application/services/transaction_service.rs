use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use classledger_domain::catalog::ClassCatalogRepository;
use classledger_domain::ledger::{
    DeductionRequest, HourPurchase, HourTransaction, HourTransferLog, LedgerRepository,
    PaymentStatus, PurchaseRepository, TransactionDraft, TransactionType, TransferOutcome,
    TransferRequest,
};
use classledger_domain::shared::{
    ensure_positive_hours, round_hours, Actor, DomainError, PurchaseId, StudentId, TransactionId,
};

use super::access::require_self_or_staff;
use crate::application::dtos::ExpirySummaryDto;

const MAX_PAGE_SIZE: i64 = 200;

/// Write side of the hour ledger.
///
/// Balance checks happen inside the store's write transaction; this service
/// only validates input, checks the caller and logs.
pub struct TransactionService {
    ledger_repo: Arc<dyn LedgerRepository>,
    purchase_repo: Arc<dyn PurchaseRepository>,
    catalog_repo: Arc<dyn ClassCatalogRepository>,
}

impl TransactionService {
    pub fn new(
        ledger_repo: Arc<dyn LedgerRepository>,
        purchase_repo: Arc<dyn PurchaseRepository>,
        catalog_repo: Arc<dyn ClassCatalogRepository>,
    ) -> Self {
        Self {
            ledger_repo,
            purchase_repo,
            catalog_repo,
        }
    }

    #[instrument(skip(self, request, actor), fields(student_id = %request.student_id))]
    pub async fn deduct(
        &self,
        request: DeductionRequest,
        actor: Option<&Actor>,
    ) -> Result<HourTransaction, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let request = DeductionRequest {
            created_by: actor.user_id.clone(),
            ..request
        };

        match self.ledger_repo.deduct_class_hours(&request).await {
            Ok(txn) => {
                info!(
                    hours = request.hours_to_deduct(),
                    balance_after = txn.balance_after(),
                    class_id = %request.class_id,
                    "Class hours deducted"
                );
                Ok(txn)
            }
            Err(e) => {
                warn!(hours = request.hours_to_deduct(), "Deduction refused: {}", e);
                Err(e)
            }
        }
    }

    /// Move hours between two students; family transfers need matching family profiles.
    #[instrument(skip(self, request, actor), fields(from = %request.from_student_id, to = %request.to_student_id))]
    pub async fn transfer(
        &self,
        request: TransferRequest,
        actor: Option<&Actor>,
    ) -> Result<TransferOutcome, DomainError> {
        let actor = require_self_or_staff(actor, &request.from_student_id)?;
        let request = TransferRequest {
            created_by: actor.user_id.clone(),
            ..request
        };

        if request.is_family_transfer {
            self.ensure_family_eligible(&request.from_student_id, &request.to_student_id)
                .await?;
        }

        let outcome = self.ledger_repo.transfer_hours(&request).await?;
        info!(
            hours = request.hours,
            transfer_id = %outcome.log.id,
            family = request.is_family_transfer,
            "Hours transferred"
        );
        Ok(outcome)
    }

    async fn ensure_family_eligible(
        &self,
        from: &StudentId,
        to: &StudentId,
    ) -> Result<(), DomainError> {
        let (from_profile, to_profile) = futures::try_join!(
            self.catalog_repo.find_profile(from),
            self.catalog_repo.find_profile(to)
        )?;

        match (from_profile, to_profile) {
            (Some(a), Some(b)) if a.same_family(&b) => Ok(()),
            _ => {
                warn!(from = %from, to = %to, "Family transfer eligibility check failed");
                Err(DomainError::FamilyTransferNotEligible(format!(
                    "Students {} and {} are not registered to the same family",
                    from, to
                )))
            }
        }
    }

    #[instrument(skip(self, actor))]
    pub async fn reverse(
        &self,
        transaction_id: &TransactionId,
        reason: &str,
        actor: Option<&Actor>,
    ) -> Result<HourTransaction, DomainError> {
        let actor = Actor::require_staff(actor)?;
        if reason.trim().is_empty() {
            return Err(DomainError::Validation(
                "A reversal reason is required".to_string(),
            ));
        }

        let reversal = self
            .ledger_repo
            .reverse_transaction(transaction_id, reason.trim(), &actor.user_id)
            .await?;
        info!(
            student_id = %reversal.student_id(),
            hours = reversal.hours_amount(),
            "Transaction reversed"
        );
        Ok(reversal)
    }

    /// Record a package; a completed payment credits the ledger in the same write.
    #[allow(clippy::too_many_arguments)]
    pub async fn purchase_package(
        &self,
        student_id: StudentId,
        package_name: String,
        hours: f64,
        amount_paid: f64,
        valid_days: i64,
        payment_status: PaymentStatus,
        actor: Option<&Actor>,
    ) -> Result<(HourPurchase, Option<HourTransaction>), DomainError> {
        let actor = Actor::require_staff(actor)?;
        let purchase = HourPurchase::new(
            student_id,
            package_name,
            hours,
            amount_paid,
            valid_days,
            payment_status,
        )?;

        let credit = self.purchase_repo.create(&purchase, &actor.user_id).await?;
        info!(
            student_id = %purchase.student_id(),
            purchase_id = %purchase.id(),
            hours = purchase.hours_purchased(),
            status = purchase.payment_status().as_str(),
            "Package recorded"
        );
        Ok((purchase, credit))
    }

    pub async fn complete_purchase_payment(
        &self,
        purchase_id: &PurchaseId,
        actor: Option<&Actor>,
    ) -> Result<(HourPurchase, HourTransaction), DomainError> {
        let actor = Actor::require_staff(actor)?;
        let (purchase, txn) = self
            .purchase_repo
            .complete_payment(purchase_id, &actor.user_id)
            .await?;
        info!(
            purchase_id = %purchase_id,
            balance_after = txn.balance_after(),
            "Package payment completed"
        );
        Ok((purchase, txn))
    }

    /// Credit hours outside of a package purchase.
    pub async fn add_hours(
        &self,
        student_id: StudentId,
        hours: f64,
        kind: TransactionType,
        description: Option<String>,
        actor: Option<&Actor>,
    ) -> Result<HourTransaction, DomainError> {
        let actor = Actor::require_staff(actor)?;
        if !matches!(
            kind,
            TransactionType::Bonus | TransactionType::Purchase | TransactionType::Refund
        ) {
            return Err(DomainError::Validation(format!(
                "Hours cannot be added as {}",
                kind
            )));
        }
        let hours = ensure_positive_hours(hours, "Hours")?;

        let mut draft = TransactionDraft::new(student_id, kind, hours, actor.user_id.clone());
        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            draft = draft.with_description(description);
        }

        let txn = self.ledger_repo.add_hours(draft).await?;
        info!(
            student_id = %txn.student_id(),
            kind = %kind,
            hours,
            balance_after = txn.balance_after(),
            "Hours credited"
        );
        Ok(txn)
    }

    /// Newest first; `limit` is clamped to 1..=200
    pub async fn list_transactions(
        &self,
        student_id: &StudentId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HourTransaction>, DomainError> {
        self.ledger_repo
            .list_transactions(student_id, limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
            .await
    }

    pub async fn list_purchases(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<HourPurchase>, DomainError> {
        self.purchase_repo.find_by_student(student_id).await
    }

    pub async fn get_transfer_logs(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<HourTransferLog>, DomainError> {
        self.ledger_repo.list_transfer_logs(student_id).await
    }

    /// Retire every package whose validity has lapsed.
    ///
    /// Each package is expired in its own write; one failure is logged and
    /// counted without stopping the sweep.
    pub async fn expire_packages(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ExpirySummaryDto, DomainError> {
        let lapsed = self.purchase_repo.find_lapsed(now).await?;
        let mut summary = ExpirySummaryDto::default();

        for purchase in lapsed {
            match self.purchase_repo.expire(purchase.id(), now).await {
                Ok(outcome) => {
                    summary.packages_expired += 1;
                    if let Some(txn) = outcome.transaction {
                        summary.hours_expired -= txn.hours_amount();
                    }
                }
                // Another sweep got there first
                Err(DomainError::AlreadyProcessed(_)) => {}
                Err(e) => {
                    summary.failures += 1;
                    error!(purchase_id = %purchase.id(), "Failed to expire package: {}", e);
                }
            }
        }

        summary.hours_expired = round_hours(summary.hours_expired);
        if summary.packages_expired > 0 || summary.failures > 0 {
            info!(
                expired = summary.packages_expired,
                hours = summary.hours_expired,
                failures = summary.failures,
                "Package expiry sweep finished"
            );
        }
        Ok(summary)
    }
}
