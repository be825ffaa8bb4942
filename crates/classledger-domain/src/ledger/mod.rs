mod balance;
mod purchase;
mod repository;
mod transaction;
mod transfer;

pub use balance::{BalanceAlert, BalanceCalculator, BalanceDetail, BalancePolicy};
pub use purchase::{HourPurchase, PaymentStatus};
pub use repository::{
    DeductionRequest, ExpiryOutcome, LedgerRepository, PurchaseRepository, TransferOutcome,
};
pub use transaction::{
    HourTransaction, TransactionDraft, TransactionRecord, TransactionType, HOURS_EPSILON,
};
pub use transfer::{HourTransferLog, TransferRequest};
