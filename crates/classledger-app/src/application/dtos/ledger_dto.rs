use serde::{Deserialize, Serialize};

use classledger_domain::ledger::{
    BalanceAlert, BalanceDetail, HourPurchase, HourTransaction, HourTransferLog,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub student_id: String,
    pub transaction_type: String,
    pub hours_amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub class_id: Option<String>,
    pub booking_id: Option<String>,
    pub purchase_id: Option<String>,
    pub class_type: Option<String>,
    pub deduction_rate: Option<f64>,
    pub transfer_to_student_id: Option<String>,
    pub transfer_from_student_id: Option<String>,
    pub is_reversed: bool,
    pub original_transaction_id: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub created_by: String,
}

impl From<&HourTransaction> for TransactionDto {
    fn from(t: &HourTransaction) -> Self {
        Self {
            id: t.id().to_string(),
            student_id: t.student_id().to_string(),
            transaction_type: t.transaction_type().as_str().to_string(),
            hours_amount: t.hours_amount(),
            balance_before: t.balance_before(),
            balance_after: t.balance_after(),
            class_id: t.class_id().map(|id| id.to_string()),
            booking_id: t.booking_id().map(|id| id.to_string()),
            purchase_id: t.purchase_id().map(|id| id.to_string()),
            class_type: t.class_type().map(str::to_string),
            deduction_rate: t.deduction_rate(),
            transfer_to_student_id: t.transfer_to_student_id().map(|id| id.to_string()),
            transfer_from_student_id: t.transfer_from_student_id().map(|id| id.to_string()),
            is_reversed: t.is_reversed(),
            original_transaction_id: t.original_transaction_id().map(|id| id.to_string()),
            description: t.description().map(str::to_string),
            created_at: t.created_at().to_rfc3339(),
            created_by: t.created_by().to_string(),
        }
    }
}

impl From<HourTransaction> for TransactionDto {
    fn from(t: HourTransaction) -> Self {
        Self::from(&t)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDto {
    pub id: String,
    pub student_id: String,
    pub package_name: String,
    pub hours_purchased: f64,
    pub hours_remaining: f64,
    pub amount_paid: f64,
    pub valid_from: String,
    pub valid_until: String,
    pub payment_status: String,
    pub is_active: bool,
    pub is_expired: bool,
    pub created_at: String,
}

impl From<&HourPurchase> for PurchaseDto {
    fn from(p: &HourPurchase) -> Self {
        Self {
            id: p.id().to_string(),
            student_id: p.student_id().to_string(),
            package_name: p.package_name().to_string(),
            hours_purchased: p.hours_purchased(),
            hours_remaining: p.hours_remaining(),
            amount_paid: p.amount_paid(),
            valid_from: p.valid_from().to_rfc3339(),
            valid_until: p.valid_until().to_rfc3339(),
            payment_status: p.payment_status().as_str().to_string(),
            is_active: p.is_active(),
            is_expired: p.is_expired(),
            created_at: p.created_at().to_rfc3339(),
        }
    }
}

/// A package together with the ledger credit its creation wrote, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResultDto {
    pub purchase: PurchaseDto,
    pub transaction: Option<TransactionDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDetailDto {
    pub student_id: String,
    pub total_hours: f64,
    pub active_packages: Vec<PurchaseDto>,
    pub expiring_packages: Vec<PurchaseDto>,
    pub recent_transactions: Vec<TransactionDto>,
    pub active_alerts: Vec<BalanceAlert>,
}

impl From<BalanceDetail> for BalanceDetailDto {
    fn from(d: BalanceDetail) -> Self {
        Self {
            student_id: d.student_id.to_string(),
            total_hours: d.total_hours,
            active_packages: d.active_packages.iter().map(PurchaseDto::from).collect(),
            expiring_packages: d.expiring_packages.iter().map(PurchaseDto::from).collect(),
            recent_transactions: d
                .recent_transactions
                .iter()
                .map(TransactionDto::from)
                .collect(),
            active_alerts: d.active_alerts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLogDto {
    pub id: String,
    pub from_student_id: String,
    pub to_student_id: String,
    pub hours: f64,
    pub reason: String,
    pub is_family_transfer: bool,
    pub debit_transaction_id: String,
    pub credit_transaction_id: String,
    pub created_at: String,
    pub created_by: String,
}

impl From<&HourTransferLog> for TransferLogDto {
    fn from(log: &HourTransferLog) -> Self {
        Self {
            id: log.id.to_string(),
            from_student_id: log.from_student_id.to_string(),
            to_student_id: log.to_student_id.to_string(),
            hours: log.hours,
            reason: log.reason.clone(),
            is_family_transfer: log.is_family_transfer,
            debit_transaction_id: log.debit_transaction_id.to_string(),
            credit_transaction_id: log.credit_transaction_id.to_string(),
            created_at: log.created_at.to_rfc3339(),
            created_by: log.created_by.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResultDto {
    pub log: TransferLogDto,
    pub debit: TransactionDto,
    pub credit: TransactionDto,
}

/// Outcome of one package-expiry sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySummaryDto {
    pub packages_expired: u32,
    pub hours_expired: f64,
    pub failures: u32,
}

// ============================================================
// Inputs
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductHoursInput {
    pub student_id: String,
    pub class_id: String,
    pub booking_id: Option<String>,
    pub hours: f64,
    pub class_type: Option<String>,
    pub deduction_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferHoursInput {
    pub from_student_id: String,
    pub to_student_id: String,
    pub hours: f64,
    pub reason: String,
    #[serde(default)]
    pub is_family_transfer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePackageInput {
    pub student_id: String,
    pub package_name: String,
    pub hours: f64,
    pub amount_paid: f64,
    pub valid_days: i64,
    /// `pending`, `completed` or `failed`
    pub payment_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHoursInput {
    pub student_id: String,
    pub hours: f64,
    /// `bonus`, `purchase` or `refund`
    pub kind: String,
    pub description: Option<String>,
}
