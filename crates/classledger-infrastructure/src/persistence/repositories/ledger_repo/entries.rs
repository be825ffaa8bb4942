//! Ledger steps shared by every write transaction that touches hours.
//!
//! All functions run on the connection of an open `ImmediateTransaction`;
//! none of them acquire a connection of their own.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::{into_purchases, PurchaseRow, TransactionRow, PURCHASE_COLUMNS, TRANSACTION_COLUMNS};
use crate::persistence::ResultExt;
use classledger_domain::ledger::{
    BalanceCalculator, HourPurchase, HourTransaction, TransactionDraft, TransactionType,
};
use classledger_domain::shared::{round_hours, DomainError, PurchaseId, StudentId, TransactionId};

pub(crate) const BALANCE_QUERY: &str = r#"
    SELECT COALESCE(SUM(hours_amount), 0.0)
    FROM hour_transactions
    WHERE student_id = ?1 AND is_reversed = 0 AND transaction_type <> 'reversal'
"#;

pub(crate) async fn balance(
    conn: &mut SqliteConnection,
    student_id: &StudentId,
) -> Result<f64, DomainError> {
    let total: f64 = sqlx::query_scalar(BALANCE_QUERY)
        .bind(student_id.as_str())
        .fetch_one(conn)
        .await
        .map_repo_error("Calculate balance")?;
    Ok(round_hours(total))
}

pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    txn: &HourTransaction,
) -> Result<(), DomainError> {
    let query = format!(
        "INSERT INTO hour_transactions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        TRANSACTION_COLUMNS
    );

    sqlx::query(&query)
        .bind(txn.id().as_str())
        .bind(txn.student_id().as_str())
        .bind(txn.transaction_type().as_str())
        .bind(txn.hours_amount())
        .bind(txn.balance_before())
        .bind(txn.balance_after())
        .bind(txn.class_id().map(|id| id.as_str()))
        .bind(txn.booking_id().map(|id| id.as_str()))
        .bind(txn.purchase_id().map(|id| id.as_str()))
        .bind(txn.class_type())
        .bind(txn.deduction_rate())
        .bind(txn.transfer_to_student_id().map(|id| id.as_str()))
        .bind(txn.transfer_from_student_id().map(|id| id.as_str()))
        .bind(txn.is_reversed())
        .bind(txn.original_transaction_id().map(|id| id.as_str()))
        .bind(txn.description())
        .bind(txn.created_at())
        .bind(txn.created_by())
        .execute(conn)
        .await
        .map_repo_error("Insert hour transaction")?;

    Ok(())
}

/// Read the live balance, apply the draft on top of it and insert the entry.
///
/// A draft that would overdraw fails before anything is written.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    draft: TransactionDraft,
) -> Result<HourTransaction, DomainError> {
    let before = balance(&mut *conn, &draft.student_id).await?;
    let txn = draft.into_transaction(before)?;
    insert_transaction(conn, &txn).await?;
    Ok(txn)
}

pub(crate) async fn find_transaction(
    conn: &mut SqliteConnection,
    id: &TransactionId,
) -> Result<Option<HourTransaction>, DomainError> {
    let query = format!(
        "SELECT {} FROM hour_transactions WHERE id = ?1",
        TRANSACTION_COLUMNS
    );
    let row: Option<TransactionRow> = sqlx::query_as(&query)
        .bind(id.as_str())
        .fetch_optional(conn)
        .await
        .map_repo_error("Find hour transaction")?;
    row.map(TransactionRow::into_domain).transpose()
}

pub(crate) async fn insert_purchase(
    conn: &mut SqliteConnection,
    purchase: &HourPurchase,
) -> Result<(), DomainError> {
    let query = format!(
        "INSERT INTO hour_purchases ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        PURCHASE_COLUMNS
    );

    sqlx::query(&query)
        .bind(purchase.id().as_str())
        .bind(purchase.student_id().as_str())
        .bind(purchase.package_name())
        .bind(purchase.hours_purchased())
        .bind(purchase.hours_remaining())
        .bind(purchase.amount_paid())
        .bind(purchase.valid_from())
        .bind(purchase.valid_until())
        .bind(purchase.payment_status().as_str())
        .bind(purchase.is_active())
        .bind(purchase.is_expired())
        .bind(purchase.created_at())
        .execute(conn)
        .await
        .map_repo_error("Insert hour purchase")?;

    Ok(())
}

pub(crate) async fn find_purchase(
    conn: &mut SqliteConnection,
    id: &PurchaseId,
) -> Result<Option<HourPurchase>, DomainError> {
    let query = format!("SELECT {} FROM hour_purchases WHERE id = ?1", PURCHASE_COLUMNS);
    let row: Option<PurchaseRow> = sqlx::query_as(&query)
        .bind(id.as_str())
        .fetch_optional(conn)
        .await
        .map_repo_error("Find hour purchase")?;
    row.map(PurchaseRow::into_domain).transpose()
}

/// Persist the mutable package columns
pub(crate) async fn update_purchase_state(
    conn: &mut SqliteConnection,
    purchase: &HourPurchase,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE hour_purchases
        SET hours_remaining = ?2, payment_status = ?3, is_active = ?4, is_expired = ?5
        WHERE id = ?1
        "#,
    )
    .bind(purchase.id().as_str())
    .bind(purchase.hours_remaining())
    .bind(purchase.payment_status().as_str())
    .bind(purchase.is_active())
    .bind(purchase.is_expired())
    .execute(conn)
    .await
    .map_repo_error("Update hour purchase")?;

    Ok(())
}

/// Draw a debit from the student's unexpired packages, soonest expiry first,
/// and remember which packages it came from.
pub(crate) async fn draw_down_packages(
    conn: &mut SqliteConnection,
    debit: &HourTransaction,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let query = format!(
        r#"
        SELECT {} FROM hour_purchases
        WHERE student_id = ?1 AND is_active = 1 AND is_expired = 0
          AND hours_remaining > 0 AND valid_until > ?2
        ORDER BY valid_until ASC, created_at ASC
        "#,
        PURCHASE_COLUMNS
    );
    let rows: Vec<PurchaseRow> = sqlx::query_as(&query)
        .bind(debit.student_id().as_str())
        .bind(now)
        .fetch_all(&mut *conn)
        .await
        .map_repo_error("Load active packages")?;
    let mut packages = into_purchases(rows)?;

    let allocations = BalanceCalculator::allocate_deduction(&mut packages, -debit.hours_amount());
    for (purchase_id, taken) in &allocations {
        let Some(package) = packages.iter().find(|p| p.id() == purchase_id) else {
            continue;
        };
        update_purchase_state(&mut *conn, package).await?;

        sqlx::query(
            "INSERT INTO package_allocations (transaction_id, purchase_id, hours) VALUES (?1, ?2, ?3)",
        )
        .bind(debit.id().as_str())
        .bind(purchase_id.as_str())
        .bind(*taken)
        .execute(&mut *conn)
        .await
        .map_repo_error("Record package allocation")?;

        tracing::debug!(
            purchase_id = %purchase_id,
            hours = taken,
            remaining = package.hours_remaining(),
            "Package drawn down"
        );
    }

    Ok(())
}

/// Bring package state back in line after `original` was reversed.
///
/// A reversed purchase credit withdraws its package, which must still be
/// untouched. A reversed debit hands its hours back to the packages it drew.
pub(crate) async fn undo_package_effects(
    conn: &mut SqliteConnection,
    original: &HourTransaction,
) -> Result<(), DomainError> {
    if original.transaction_type() == TransactionType::Purchase {
        if let Some(purchase_id) = original.purchase_id() {
            let mut package = find_purchase(&mut *conn, purchase_id)
                .await?
                .ok_or_else(|| {
                    DomainError::NotFound(format!("Purchase {} not found", purchase_id))
                })?;
            let withdrawn = package.withdraw()?;
            update_purchase_state(&mut *conn, &package).await?;
            tracing::debug!(purchase_id = %purchase_id, hours = withdrawn, "Package withdrawn");
        }
        return Ok(());
    }

    let allocations: Vec<(String, f64)> = sqlx::query_as(
        "SELECT purchase_id, hours FROM package_allocations WHERE transaction_id = ?1",
    )
    .bind(original.id().as_str())
    .fetch_all(&mut *conn)
    .await
    .map_repo_error("Load package allocations")?;

    for (purchase_id, hours) in allocations {
        let purchase_id = PurchaseId::from_string(&purchase_id);
        let Some(mut package) = find_purchase(&mut *conn, &purchase_id).await? else {
            continue;
        };
        let restored = package.give_back(hours);
        if restored > 0.0 {
            update_purchase_state(&mut *conn, &package).await?;
        }
        tracing::debug!(purchase_id = %purchase_id, hours = restored, "Package hours restored");
    }

    sqlx::query("DELETE FROM package_allocations WHERE transaction_id = ?1")
        .bind(original.id().as_str())
        .execute(&mut *conn)
        .await
        .map_repo_error("Clear package allocations")?;

    Ok(())
}
