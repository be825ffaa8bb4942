use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::shared::{
    round_hours, BookingId, ClassId, DomainError, PurchaseId, StudentId, TransactionId,
};

/// Tolerance for comparing persisted two-decimal hour amounts
pub const HOURS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    Deduction,
    Adjustment,
    Transfer,
    Reversal,
    Bonus,
    Refund,
    Expiry,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::Deduction => "deduction",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Transfer => "transfer",
            TransactionType::Reversal => "reversal",
            TransactionType::Bonus => "bonus",
            TransactionType::Refund => "refund",
            TransactionType::Expiry => "expiry",
        }
    }

    /// Types that spend hours the student must actually have.
    pub fn is_deduction_class(&self) -> bool {
        matches!(
            self,
            TransactionType::Deduction | TransactionType::Transfer | TransactionType::Expiry
        )
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionType::Purchase),
            "deduction" => Ok(TransactionType::Deduction),
            "adjustment" => Ok(TransactionType::Adjustment),
            "transfer" => Ok(TransactionType::Transfer),
            "reversal" => Ok(TransactionType::Reversal),
            "bonus" => Ok(TransactionType::Bonus),
            "refund" => Ok(TransactionType::Refund),
            "expiry" => Ok(TransactionType::Expiry),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown transaction type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger entry
///
/// Only `is_reversed` ever changes after insertion, and only from `false` to
/// `true`. Rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourTransaction {
    id: TransactionId,
    student_id: StudentId,
    transaction_type: TransactionType,
    hours_amount: f64,
    balance_before: f64,
    balance_after: f64,
    class_id: Option<ClassId>,
    booking_id: Option<BookingId>,
    purchase_id: Option<PurchaseId>,
    class_type: Option<String>,
    deduction_rate: Option<f64>,
    transfer_to_student_id: Option<StudentId>,
    transfer_from_student_id: Option<StudentId>,
    is_reversed: bool,
    original_transaction_id: Option<TransactionId>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
}

/// Column values for `HourTransaction::restore`
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub student_id: StudentId,
    pub transaction_type: TransactionType,
    pub hours_amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub class_id: Option<ClassId>,
    pub booking_id: Option<BookingId>,
    pub purchase_id: Option<PurchaseId>,
    pub class_type: Option<String>,
    pub deduction_rate: Option<f64>,
    pub transfer_to_student_id: Option<StudentId>,
    pub transfer_from_student_id: Option<StudentId>,
    pub is_reversed: bool,
    pub original_transaction_id: Option<TransactionId>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl HourTransaction {
    /// Restore from persistence
    pub fn restore(record: TransactionRecord) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id,
            transaction_type: record.transaction_type,
            hours_amount: record.hours_amount,
            balance_before: record.balance_before,
            balance_after: record.balance_after,
            class_id: record.class_id,
            booking_id: record.booking_id,
            purchase_id: record.purchase_id,
            class_type: record.class_type,
            deduction_rate: record.deduction_rate,
            transfer_to_student_id: record.transfer_to_student_id,
            transfer_from_student_id: record.transfer_from_student_id,
            is_reversed: record.is_reversed,
            original_transaction_id: record.original_transaction_id,
            description: record.description,
            created_at: record.created_at,
            created_by: record.created_by,
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn hours_amount(&self) -> f64 {
        self.hours_amount
    }

    pub fn balance_before(&self) -> f64 {
        self.balance_before
    }

    pub fn balance_after(&self) -> f64 {
        self.balance_after
    }

    pub fn class_id(&self) -> Option<&ClassId> {
        self.class_id.as_ref()
    }

    pub fn booking_id(&self) -> Option<&BookingId> {
        self.booking_id.as_ref()
    }

    pub fn purchase_id(&self) -> Option<&PurchaseId> {
        self.purchase_id.as_ref()
    }

    pub fn class_type(&self) -> Option<&str> {
        self.class_type.as_deref()
    }

    pub fn deduction_rate(&self) -> Option<f64> {
        self.deduction_rate
    }

    pub fn transfer_to_student_id(&self) -> Option<&StudentId> {
        self.transfer_to_student_id.as_ref()
    }

    pub fn transfer_from_student_id(&self) -> Option<&StudentId> {
        self.transfer_from_student_id.as_ref()
    }

    pub fn is_reversed(&self) -> bool {
        self.is_reversed
    }

    pub fn original_transaction_id(&self) -> Option<&TransactionId> {
        self.original_transaction_id.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// Whether this entry contributes to the hour balance.
    ///
    /// A reversed entry and its reversal counter-entry cancel out, so both are
    /// left out of the sum.
    pub fn counts_toward_balance(&self) -> bool {
        !self.is_reversed && self.transaction_type != TransactionType::Reversal
    }

    /// Build the counter-entry that undoes this transaction.
    pub fn reversal_draft(
        &self,
        reason: &str,
        reversed_by: &str,
    ) -> Result<TransactionDraft, DomainError> {
        if self.is_reversed {
            return Err(DomainError::AlreadyReversed(self.id.as_str().to_string()));
        }
        if self.transaction_type == TransactionType::Reversal {
            return Err(DomainError::Validation(
                "Reversal entries cannot themselves be reversed".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(DomainError::Validation(
                "A reversal reason is required".to_string(),
            ));
        }

        Ok(TransactionDraft {
            student_id: self.student_id.clone(),
            transaction_type: TransactionType::Reversal,
            hours_amount: -self.hours_amount,
            class_id: self.class_id.clone(),
            booking_id: self.booking_id.clone(),
            purchase_id: self.purchase_id.clone(),
            class_type: self.class_type.clone(),
            deduction_rate: None,
            transfer_to_student_id: None,
            transfer_from_student_id: None,
            original_transaction_id: Some(self.id.clone()),
            description: Some(reason.trim().to_string()),
            created_by: reversed_by.to_string(),
        })
    }

    /// Mark this entry as reversed
    pub fn mark_reversed(&mut self) -> Result<(), DomainError> {
        if self.is_reversed {
            return Err(DomainError::AlreadyReversed(self.id.as_str().to_string()));
        }
        self.is_reversed = true;
        Ok(())
    }
}

/// A ledger entry that has not been written yet.
///
/// The store supplies `balance_before` inside its write transaction and turns
/// the draft into an `HourTransaction` with `into_transaction`, which enforces
/// the non-negative balance rule.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub student_id: StudentId,
    pub transaction_type: TransactionType,
    pub hours_amount: f64,
    pub class_id: Option<ClassId>,
    pub booking_id: Option<BookingId>,
    pub purchase_id: Option<PurchaseId>,
    pub class_type: Option<String>,
    pub deduction_rate: Option<f64>,
    pub transfer_to_student_id: Option<StudentId>,
    pub transfer_from_student_id: Option<StudentId>,
    pub original_transaction_id: Option<TransactionId>,
    pub description: Option<String>,
    pub created_by: String,
}

impl TransactionDraft {
    pub fn new(
        student_id: StudentId,
        transaction_type: TransactionType,
        hours_amount: f64,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            student_id,
            transaction_type,
            hours_amount: round_hours(hours_amount),
            class_id: None,
            booking_id: None,
            purchase_id: None,
            class_type: None,
            deduction_rate: None,
            transfer_to_student_id: None,
            transfer_from_student_id: None,
            original_transaction_id: None,
            description: None,
            created_by: created_by.into(),
        }
    }

    pub fn with_class(
        mut self,
        class_id: ClassId,
        booking_id: Option<BookingId>,
        class_type: Option<String>,
        deduction_rate: Option<f64>,
    ) -> Self {
        self.class_id = Some(class_id);
        self.booking_id = booking_id;
        self.class_type = class_type;
        self.deduction_rate = deduction_rate;
        self
    }

    pub fn with_purchase(mut self, purchase_id: PurchaseId) -> Self {
        self.purchase_id = Some(purchase_id);
        self
    }

    pub fn with_booking(mut self, booking_id: Option<BookingId>) -> Self {
        self.booking_id = booking_id;
        self
    }

    pub fn transferred_to(mut self, student_id: StudentId) -> Self {
        self.transfer_to_student_id = Some(student_id);
        self
    }

    pub fn transferred_from(mut self, student_id: StudentId) -> Self {
        self.transfer_from_student_id = Some(student_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = Some(description);
        }
        self
    }

    /// Apply the draft on top of `balance_before`.
    pub fn into_transaction(self, balance_before: f64) -> Result<HourTransaction, DomainError> {
        let balance_before = round_hours(balance_before);
        let hours_amount = round_hours(self.hours_amount);
        let balance_after = round_hours(balance_before + hours_amount);

        if balance_after < -HOURS_EPSILON {
            return Err(match self.transaction_type {
                TransactionType::Deduction | TransactionType::Transfer => {
                    DomainError::InsufficientHours {
                        required: -hours_amount,
                        available: balance_before,
                    }
                }
                other => DomainError::NegativeBalance(format!(
                    "{} of {:.2} hours would leave a balance of {:.2}",
                    other, hours_amount, balance_after
                )),
            });
        }

        Ok(HourTransaction {
            id: TransactionId::new(),
            student_id: self.student_id,
            transaction_type: self.transaction_type,
            hours_amount,
            balance_before,
            balance_after,
            class_id: self.class_id,
            booking_id: self.booking_id,
            purchase_id: self.purchase_id,
            class_type: self.class_type,
            deduction_rate: self.deduction_rate,
            transfer_to_student_id: self.transfer_to_student_id,
            transfer_from_student_id: self.transfer_from_student_id,
            is_reversed: false,
            original_transaction_id: self.original_transaction_id,
            description: self.description,
            created_at: Utc::now(),
            created_by: self.created_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credit(balance_before: f64, hours: f64) -> HourTransaction {
        TransactionDraft::new(StudentId::new(), TransactionType::Purchase, hours, "system")
            .into_transaction(balance_before)
            .unwrap()
    }

    #[test]
    fn test_snapshot_arithmetic() {
        let txn = credit(2.5, 10.0);
        assert_eq!(txn.balance_before(), 2.5);
        assert_eq!(txn.balance_after(), 12.5);
        assert_eq!(
            txn.balance_after(),
            txn.balance_before() + txn.hours_amount()
        );
    }

    #[test]
    fn test_deduction_below_zero_is_insufficient_hours() {
        let err = TransactionDraft::new(StudentId::new(), TransactionType::Deduction, -3.0, "t")
            .into_transaction(2.0)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientHours { required, available } if required == 3.0 && available == 2.0
        ));
    }

    #[test]
    fn test_adjustment_below_zero_is_negative_balance() {
        let err = TransactionDraft::new(StudentId::new(), TransactionType::Adjustment, -3.0, "t")
            .into_transaction(2.0)
            .unwrap_err();
        assert!(matches!(err, DomainError::NegativeBalance(_)));
    }

    #[test]
    fn test_deduction_to_exactly_zero_is_allowed() {
        let txn = TransactionDraft::new(StudentId::new(), TransactionType::Deduction, -2.0, "t")
            .into_transaction(2.0)
            .unwrap();
        assert_eq!(txn.balance_after(), 0.0);
    }

    #[test]
    fn test_reversal_draft_negates_amount() {
        let original = credit(0.0, 5.0);
        let draft = original.reversal_draft("duplicate purchase", "admin").unwrap();
        assert_eq!(draft.transaction_type, TransactionType::Reversal);
        assert_eq!(draft.hours_amount, -5.0);
        assert_eq!(draft.original_transaction_id.as_ref(), Some(original.id()));
    }

    #[test]
    fn test_reversal_of_reversed_transaction_fails() {
        let mut original = credit(0.0, 5.0);
        original.mark_reversed().unwrap();
        assert!(matches!(
            original.reversal_draft("again", "admin"),
            Err(DomainError::AlreadyReversed(_))
        ));
        assert!(original.mark_reversed().is_err());
    }

    #[test]
    fn test_reversal_entries_cannot_be_reversed() {
        let original = credit(0.0, 5.0);
        let reversal = original
            .reversal_draft("mistake", "admin")
            .unwrap()
            .into_transaction(5.0)
            .unwrap();
        assert!(!reversal.counts_toward_balance());
        assert!(matches!(
            reversal.reversal_draft("undo", "admin"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_transaction_type_round_trip_names() {
        for t in [
            TransactionType::Purchase,
            TransactionType::Deduction,
            TransactionType::Expiry,
        ] {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
        assert!("gift".parse::<TransactionType>().is_err());
    }
}
