pub(crate) mod entries;
mod mutations;
mod queries;
pub(crate) mod types;

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::persistence::SqliteRepositoryBase;
use classledger_domain::ledger::{
    DeductionRequest, HourTransaction, HourTransferLog, LedgerRepository, TransactionDraft,
    TransferOutcome, TransferRequest,
};
use classledger_domain::shared::{BookingId, DomainError, StudentId, TransactionId};

pub struct SqliteLedgerRepository {
    base: SqliteRepositoryBase,
}

impl SqliteLedgerRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }
}

#[async_trait]
impl LedgerRepository for SqliteLedgerRepository {
    async fn calculate_balance(&self, student_id: &StudentId) -> Result<f64, DomainError> {
        self.calculate_balance_impl(student_id).await
    }

    async fn find_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<HourTransaction>, DomainError> {
        self.find_transaction_impl(id).await
    }

    async fn list_transactions(
        &self,
        student_id: &StudentId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HourTransaction>, DomainError> {
        self.list_transactions_impl(student_id, limit, offset).await
    }

    async fn deduct_class_hours(
        &self,
        request: &DeductionRequest,
    ) -> Result<HourTransaction, DomainError> {
        self.deduct_class_hours_impl(request).await
    }

    async fn hours_charged_for_booking(
        &self,
        student_id: &StudentId,
        booking_id: &BookingId,
    ) -> Result<f64, DomainError> {
        self.hours_charged_for_booking_impl(student_id, booking_id)
            .await
    }

    async fn add_hours(&self, draft: TransactionDraft) -> Result<HourTransaction, DomainError> {
        self.add_hours_impl(draft).await
    }

    async fn transfer_hours(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, DomainError> {
        self.transfer_hours_impl(request).await
    }

    async fn reverse_transaction(
        &self,
        id: &TransactionId,
        reason: &str,
        reversed_by: &str,
    ) -> Result<HourTransaction, DomainError> {
        self.reverse_transaction_impl(id, reason, reversed_by).await
    }

    async fn list_transfer_logs(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<HourTransferLog>, DomainError> {
        self.list_transfer_logs_impl(student_id).await
    }
}
