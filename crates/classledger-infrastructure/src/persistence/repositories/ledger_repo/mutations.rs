use chrono::Utc;
use std::time::Instant;
use tracing::info;

use super::entries;
use crate::persistence::{ImmediateTransaction, ResultExt};
use classledger_domain::ledger::{
    DeductionRequest, HourTransaction, HourTransferLog, TransactionDraft, TransactionType,
    TransferOutcome, TransferRequest,
};
use classledger_domain::shared::{DomainError, TransactionId, TransferId};

impl super::SqliteLedgerRepository {
    pub(super) async fn deduct_class_hours_impl(
        &self,
        request: &DeductionRequest,
    ) -> Result<HourTransaction, DomainError> {
        let start = Instant::now();
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<HourTransaction, DomainError> = async {
            let txn = entries::append(tx.conn(), request.to_draft()).await?;
            entries::draw_down_packages(tx.conn(), &txn, Utc::now()).await?;
            Ok(txn)
        }
        .await;

        let txn = tx.finish(result).await?;
        info!(
            student_id = %request.student_id,
            class_id = %request.class_id,
            hours = -txn.hours_amount(),
            balance_after = txn.balance_after(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Class hours deducted"
        );
        Ok(txn)
    }

    pub(super) async fn add_hours_impl(
        &self,
        draft: TransactionDraft,
    ) -> Result<HourTransaction, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;
        let result = entries::append(tx.conn(), draft).await;
        let txn = tx.finish(result).await?;

        info!(
            student_id = %txn.student_id(),
            transaction_type = %txn.transaction_type(),
            hours = txn.hours_amount(),
            balance_after = txn.balance_after(),
            "Hours added"
        );
        Ok(txn)
    }

    pub(super) async fn transfer_hours_impl(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<TransferOutcome, DomainError> = async {
            let debit = entries::append(
                tx.conn(),
                TransactionDraft::new(
                    request.from_student_id.clone(),
                    TransactionType::Transfer,
                    -request.hours,
                    request.created_by.clone(),
                )
                .transferred_to(request.to_student_id.clone())
                .with_description(request.reason.clone()),
            )
            .await?;
            entries::draw_down_packages(tx.conn(), &debit, Utc::now()).await?;

            let credit = entries::append(
                tx.conn(),
                TransactionDraft::new(
                    request.to_student_id.clone(),
                    TransactionType::Transfer,
                    request.hours,
                    request.created_by.clone(),
                )
                .transferred_from(request.from_student_id.clone())
                .with_description(request.reason.clone()),
            )
            .await?;

            let log = HourTransferLog {
                id: TransferId::new(),
                from_student_id: request.from_student_id.clone(),
                to_student_id: request.to_student_id.clone(),
                hours: request.hours,
                reason: request.reason.clone(),
                is_family_transfer: request.is_family_transfer,
                debit_transaction_id: debit.id().clone(),
                credit_transaction_id: credit.id().clone(),
                created_at: Utc::now(),
                created_by: request.created_by.clone(),
            };

            sqlx::query(
                r#"
                INSERT INTO hour_transfer_logs (
                    id, from_student_id, to_student_id, hours, reason, is_family_transfer,
                    debit_transaction_id, credit_transaction_id, created_at, created_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(log.id.as_str())
            .bind(log.from_student_id.as_str())
            .bind(log.to_student_id.as_str())
            .bind(log.hours)
            .bind(&log.reason)
            .bind(log.is_family_transfer)
            .bind(log.debit_transaction_id.as_str())
            .bind(log.credit_transaction_id.as_str())
            .bind(log.created_at)
            .bind(&log.created_by)
            .execute(tx.conn())
            .await
            .map_repo_error("Insert transfer log")?;

            Ok(TransferOutcome { log, debit, credit })
        }
        .await;

        let outcome = tx.finish(result).await?;
        info!(
            from_student_id = %request.from_student_id,
            to_student_id = %request.to_student_id,
            hours = request.hours,
            family = request.is_family_transfer,
            "Hours transferred"
        );
        Ok(outcome)
    }

    pub(super) async fn reverse_transaction_impl(
        &self,
        id: &TransactionId,
        reason: &str,
        reversed_by: &str,
    ) -> Result<HourTransaction, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<HourTransaction, DomainError> = async {
            let mut original = entries::find_transaction(tx.conn(), id)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("Transaction {} not found", id)))?;

            let draft = original.reversal_draft(reason, reversed_by)?;
            original.mark_reversed()?;
            let reversal = entries::append(tx.conn(), draft).await?;

            let flipped = sqlx::query(
                "UPDATE hour_transactions SET is_reversed = 1 WHERE id = ?1 AND is_reversed = 0",
            )
            .bind(id.as_str())
            .execute(tx.conn())
            .await
            .map_repo_error("Flag transaction reversed")?
            .rows_affected();

            if flipped == 0 {
                return Err(DomainError::AlreadyReversed(id.as_str().to_string()));
            }

            entries::undo_package_effects(tx.conn(), &original).await?;
            Ok(reversal)
        }
        .await;

        let reversal = tx.finish(result).await?;
        info!(
            transaction_id = %id,
            reversal_id = %reversal.id(),
            hours = reversal.hours_amount(),
            "Transaction reversed"
        );
        Ok(reversal)
    }
}
