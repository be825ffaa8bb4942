use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;

use classledger_domain::ledger::{
    HourPurchase, HourTransaction, HourTransferLog, PaymentStatus, TransactionRecord,
    TransactionType,
};
use classledger_domain::shared::{
    BookingId, ClassId, DomainError, PurchaseId, StudentId, TransactionId, TransferId,
};

pub(crate) const TRANSACTION_COLUMNS: &str = r#"
    id, student_id, transaction_type, hours_amount, balance_before, balance_after,
    class_id, booking_id, purchase_id, class_type, deduction_rate,
    transfer_to_student_id, transfer_from_student_id, is_reversed,
    original_transaction_id, description, created_at, created_by
"#;

pub(crate) const PURCHASE_COLUMNS: &str = r#"
    id, student_id, package_name, hours_purchased, hours_remaining, amount_paid,
    valid_from, valid_until, payment_status, is_active, is_expired, created_at
"#;

#[derive(FromRow)]
pub(crate) struct TransactionRow {
    id: String,
    student_id: String,
    transaction_type: String,
    hours_amount: f64,
    balance_before: f64,
    balance_after: f64,
    class_id: Option<String>,
    booking_id: Option<String>,
    purchase_id: Option<String>,
    class_type: Option<String>,
    deduction_rate: Option<f64>,
    transfer_to_student_id: Option<String>,
    transfer_from_student_id: Option<String>,
    is_reversed: bool,
    original_transaction_id: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl TransactionRow {
    pub(crate) fn into_domain(self) -> Result<HourTransaction, DomainError> {
        Ok(HourTransaction::restore(TransactionRecord {
            id: TransactionId::from_string(&self.id),
            student_id: StudentId::from_string(&self.student_id),
            transaction_type: TransactionType::from_str(&self.transaction_type)?,
            hours_amount: self.hours_amount,
            balance_before: self.balance_before,
            balance_after: self.balance_after,
            class_id: self.class_id.as_deref().map(ClassId::from_string),
            booking_id: self.booking_id.as_deref().map(BookingId::from_string),
            purchase_id: self.purchase_id.as_deref().map(PurchaseId::from_string),
            class_type: self.class_type,
            deduction_rate: self.deduction_rate,
            transfer_to_student_id: self
                .transfer_to_student_id
                .as_deref()
                .map(StudentId::from_string),
            transfer_from_student_id: self
                .transfer_from_student_id
                .as_deref()
                .map(StudentId::from_string),
            is_reversed: self.is_reversed,
            original_transaction_id: self
                .original_transaction_id
                .as_deref()
                .map(TransactionId::from_string),
            description: self.description,
            created_at: self.created_at,
            created_by: self.created_by,
        }))
    }
}

pub(crate) fn into_transactions(
    rows: Vec<TransactionRow>,
) -> Result<Vec<HourTransaction>, DomainError> {
    rows.into_iter().map(TransactionRow::into_domain).collect()
}

#[derive(FromRow)]
pub(crate) struct PurchaseRow {
    id: String,
    student_id: String,
    package_name: String,
    hours_purchased: f64,
    hours_remaining: f64,
    amount_paid: f64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    payment_status: String,
    is_active: bool,
    is_expired: bool,
    created_at: DateTime<Utc>,
}

impl PurchaseRow {
    pub(crate) fn into_domain(self) -> Result<HourPurchase, DomainError> {
        Ok(HourPurchase::restore(
            PurchaseId::from_string(&self.id),
            StudentId::from_string(&self.student_id),
            self.package_name,
            self.hours_purchased,
            self.hours_remaining,
            self.amount_paid,
            self.valid_from,
            self.valid_until,
            PaymentStatus::from_str(&self.payment_status)?,
            self.is_active,
            self.is_expired,
            self.created_at,
        ))
    }
}

pub(crate) fn into_purchases(rows: Vec<PurchaseRow>) -> Result<Vec<HourPurchase>, DomainError> {
    rows.into_iter().map(PurchaseRow::into_domain).collect()
}

#[derive(FromRow)]
pub(super) struct TransferLogRow {
    id: String,
    from_student_id: String,
    to_student_id: String,
    hours: f64,
    reason: String,
    is_family_transfer: bool,
    debit_transaction_id: String,
    credit_transaction_id: String,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl TransferLogRow {
    pub(super) fn into_domain(self) -> HourTransferLog {
        HourTransferLog {
            id: TransferId::from_string(&self.id),
            from_student_id: StudentId::from_string(&self.from_student_id),
            to_student_id: StudentId::from_string(&self.to_student_id),
            hours: self.hours,
            reason: self.reason,
            is_family_transfer: self.is_family_transfer,
            debit_transaction_id: TransactionId::from_string(&self.debit_transaction_id),
            credit_transaction_id: TransactionId::from_string(&self.credit_transaction_id),
            created_at: self.created_at,
            created_by: self.created_by,
        }
    }
}
