use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    HourPurchase, HourTransaction, HourTransferLog, TransactionDraft, TransactionType,
    TransferRequest,
};
use crate::shared::{
    ensure_positive_hours, round_hours, BookingId, ClassId, DomainError, PurchaseId, StudentId,
    TransactionId,
};

/// Input for `LedgerRepository::deduct_class_hours`
#[derive(Debug, Clone)]
pub struct DeductionRequest {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub booking_id: Option<BookingId>,
    pub hours: f64,
    pub class_type: Option<String>,
    pub deduction_rate: f64,
    pub created_by: String,
}

impl DeductionRequest {
    pub fn new(
        student_id: StudentId,
        class_id: ClassId,
        booking_id: Option<BookingId>,
        hours: f64,
        class_type: Option<String>,
        deduction_rate: Option<f64>,
        created_by: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let hours = ensure_positive_hours(hours, "Class hours")?;
        let deduction_rate = deduction_rate.unwrap_or(1.0);
        if !deduction_rate.is_finite() || deduction_rate <= 0.0 {
            return Err(DomainError::Validation(
                "Deduction rate must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            student_id,
            class_id,
            booking_id,
            hours,
            class_type,
            deduction_rate,
            created_by: created_by.into(),
        })
    }

    /// `hours * deduction_rate`, rounded to two decimals
    pub fn hours_to_deduct(&self) -> f64 {
        round_hours(self.hours * self.deduction_rate)
    }

    pub fn to_draft(&self) -> TransactionDraft {
        TransactionDraft::new(
            self.student_id.clone(),
            TransactionType::Deduction,
            -self.hours_to_deduct(),
            self.created_by.clone(),
        )
        .with_class(
            self.class_id.clone(),
            self.booking_id.clone(),
            self.class_type.clone(),
            Some(self.deduction_rate),
        )
    }
}

/// Result of a committed transfer
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub log: HourTransferLog,
    pub debit: HourTransaction,
    pub credit: HourTransaction,
}

/// Result of retiring one lapsed package
#[derive(Debug, Clone)]
pub struct ExpiryOutcome {
    pub purchase: HourPurchase,
    /// `None` when nothing could be deducted (balance already zero)
    pub transaction: Option<HourTransaction>,
}

/// Ledger store
///
/// Every write method is one atomic unit at the store: the balance read that
/// feeds `TransactionDraft::into_transaction` happens inside the same write
/// transaction as the insert, so concurrent writers for one student serialize.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Current hour balance (zero when the student has no entries)
    async fn calculate_balance(&self, student_id: &StudentId) -> Result<f64, DomainError>;

    async fn find_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<HourTransaction>, DomainError>;

    /// Newest first
    async fn list_transactions(
        &self,
        student_id: &StudentId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HourTransaction>, DomainError>;

    /// Check the balance and write a deduction in one step.
    ///
    /// Fails with `InsufficientHours` without writing anything when the
    /// balance cannot cover `hours * deduction_rate`. Active packages are
    /// drawn down in soonest-expiry order in the same write.
    async fn deduct_class_hours(
        &self,
        request: &DeductionRequest,
    ) -> Result<HourTransaction, DomainError>;

    /// Hours the student has been charged for a booking by live deductions
    async fn hours_charged_for_booking(
        &self,
        student_id: &StudentId,
        booking_id: &BookingId,
    ) -> Result<f64, DomainError>;

    /// Append a credit-style entry (`purchase`, `bonus`, `refund`, `adjustment`).
    async fn add_hours(&self, draft: TransactionDraft) -> Result<HourTransaction, DomainError>;

    /// Debit, credit and transfer log, all or nothing
    async fn transfer_hours(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, DomainError>;

    /// Write the counter-entry and flag the original as reversed.
    async fn reverse_transaction(
        &self,
        id: &TransactionId,
        reason: &str,
        reversed_by: &str,
    ) -> Result<HourTransaction, DomainError>;

    /// Transfers where the student is either side, newest first
    async fn list_transfer_logs(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<HourTransferLog>, DomainError>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Insert the package; a completed payment also writes its `purchase` credit.
    async fn create(
        &self,
        purchase: &HourPurchase,
        created_by: &str,
    ) -> Result<Option<HourTransaction>, DomainError>;

    /// Flip `pending -> completed` and credit the ledger, exactly once.
    async fn complete_payment(
        &self,
        id: &PurchaseId,
        completed_by: &str,
    ) -> Result<(HourPurchase, HourTransaction), DomainError>;

    async fn find_by_id(&self, id: &PurchaseId) -> Result<Option<HourPurchase>, DomainError>;

    async fn find_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<HourPurchase>, DomainError>;

    /// Active packages with hours left whose validity ended at or before `now`
    async fn find_lapsed(&self, now: DateTime<Utc>) -> Result<Vec<HourPurchase>, DomainError>;

    /// Retire a lapsed package, writing an `expiry` entry that never takes
    /// the balance below zero.
    async fn expire(&self, id: &PurchaseId, now: DateTime<Utc>)
        -> Result<ExpiryOutcome, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduction_rate_applied() {
        let req = DeductionRequest::new(
            StudentId::new(),
            ClassId::new(),
            None,
            2.0,
            Some("one_on_one".to_string()),
            Some(1.5),
            "teacher",
        )
        .unwrap();
        assert_eq!(req.hours_to_deduct(), 3.0);

        let draft = req.to_draft();
        assert_eq!(draft.hours_amount, -3.0);
        assert_eq!(draft.deduction_rate, Some(1.5));
    }

    #[test]
    fn test_default_rate_and_validation() {
        let req =
            DeductionRequest::new(StudentId::new(), ClassId::new(), None, 1.0, None, None, "t")
                .unwrap();
        assert_eq!(req.deduction_rate, 1.0);

        assert!(DeductionRequest::new(StudentId::new(), ClassId::new(), None, 0.0, None, None, "t").is_err());
        assert!(DeductionRequest::new(StudentId::new(), ClassId::new(), None, 1.0, None, Some(0.0), "t").is_err());
    }
}
