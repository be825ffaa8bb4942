use super::entries::BALANCE_QUERY;
use super::types::{into_transactions, TransactionRow, TransferLogRow, TRANSACTION_COLUMNS};
use crate::persistence::ResultExt;
use classledger_domain::ledger::{HourTransaction, HourTransferLog};
use classledger_domain::shared::{round_hours, BookingId, DomainError, StudentId, TransactionId};

impl super::SqliteLedgerRepository {
    pub(super) async fn calculate_balance_impl(
        &self,
        student_id: &StudentId,
    ) -> Result<f64, DomainError> {
        let total: f64 = sqlx::query_scalar(BALANCE_QUERY)
            .bind(student_id.as_str())
            .fetch_one(self.base.pool())
            .await
            .map_repo_error("Calculate balance")?;
        Ok(round_hours(total))
    }

    pub(super) async fn hours_charged_for_booking_impl(
        &self,
        student_id: &StudentId,
        booking_id: &BookingId,
    ) -> Result<f64, DomainError> {
        let charged: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(-hours_amount), 0.0)
            FROM hour_transactions
            WHERE student_id = ?1 AND booking_id = ?2
              AND transaction_type = 'deduction' AND is_reversed = 0
            "#,
        )
        .bind(student_id.as_str())
        .bind(booking_id.as_str())
        .fetch_one(self.base.pool())
        .await
        .map_repo_error("Sum booking deductions")?;
        Ok(round_hours(charged.max(0.0)))
    }

    pub(super) async fn find_transaction_impl(
        &self,
        id: &TransactionId,
    ) -> Result<Option<HourTransaction>, DomainError> {
        let query = format!(
            "SELECT {} FROM hour_transactions WHERE id = ?1",
            TRANSACTION_COLUMNS
        );
        let row: Option<TransactionRow> = self
            .base
            .fetch_optional(
                sqlx::query_as(&query).bind(id.as_str()),
                "Find hour transaction",
            )
            .await?;
        row.map(TransactionRow::into_domain).transpose()
    }

    pub(super) async fn list_transactions_impl(
        &self,
        student_id: &StudentId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HourTransaction>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM hour_transactions
            WHERE student_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
            TRANSACTION_COLUMNS
        );
        let rows: Vec<TransactionRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query)
                    .bind(student_id.as_str())
                    .bind(limit.max(0))
                    .bind(offset.max(0)),
                "List hour transactions",
            )
            .await?;
        into_transactions(rows)
    }

    pub(super) async fn list_transfer_logs_impl(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<HourTransferLog>, DomainError> {
        let query = r#"
            SELECT id, from_student_id, to_student_id, hours, reason, is_family_transfer,
                   debit_transaction_id, credit_transaction_id, created_at, created_by
            FROM hour_transfer_logs
            WHERE from_student_id = ?1 OR to_student_id = ?1
            ORDER BY created_at DESC, rowid DESC
        "#;
        let rows: Vec<TransferLogRow> = self
            .base
            .fetch_all(
                sqlx::query_as(query).bind(student_id.as_str()),
                "List transfer logs",
            )
            .await?;
        Ok(rows.into_iter().map(TransferLogRow::into_domain).collect())
    }
}
