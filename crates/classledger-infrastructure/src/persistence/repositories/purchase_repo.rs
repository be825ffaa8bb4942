use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::info;

use super::ledger_repo::entries;
use super::ledger_repo::types::{into_purchases, PurchaseRow, PURCHASE_COLUMNS};
use crate::persistence::{ImmediateTransaction, ResultExt, SqliteRepositoryBase};
use classledger_domain::ledger::{
    ExpiryOutcome, HourPurchase, HourTransaction, PaymentStatus, PurchaseRepository,
    TransactionDraft, TransactionType, HOURS_EPSILON,
};
use classledger_domain::shared::{DomainError, PurchaseId, StudentId};

pub struct SqlitePurchaseRepository {
    base: SqliteRepositoryBase,
}

impl SqlitePurchaseRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }

    async fn credit(
        conn: &mut SqliteConnection,
        purchase: &HourPurchase,
        created_by: &str,
    ) -> Result<HourTransaction, DomainError> {
        entries::append(
            conn,
            TransactionDraft::new(
                purchase.student_id().clone(),
                TransactionType::Purchase,
                purchase.hours_purchased(),
                created_by,
            )
            .with_purchase(purchase.id().clone())
            .with_description(purchase.package_name()),
        )
        .await
    }

    async fn load(
        conn: &mut SqliteConnection,
        id: &PurchaseId,
    ) -> Result<HourPurchase, DomainError> {
        entries::find_purchase(conn, id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Purchase {} not found", id)))
    }
}

#[async_trait]
impl PurchaseRepository for SqlitePurchaseRepository {
    async fn create(
        &self,
        purchase: &HourPurchase,
        created_by: &str,
    ) -> Result<Option<HourTransaction>, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<Option<HourTransaction>, DomainError> = async {
            entries::insert_purchase(tx.conn(), purchase).await?;
            if purchase.payment_status() == PaymentStatus::Completed {
                Ok(Some(Self::credit(tx.conn(), purchase, created_by).await?))
            } else {
                Ok(None)
            }
        }
        .await;

        let credit = tx.finish(result).await?;
        info!(
            purchase_id = %purchase.id(),
            student_id = %purchase.student_id(),
            hours = purchase.hours_purchased(),
            payment_status = purchase.payment_status().as_str(),
            "Package purchased"
        );
        Ok(credit)
    }

    async fn complete_payment(
        &self,
        id: &PurchaseId,
        completed_by: &str,
    ) -> Result<(HourPurchase, HourTransaction), DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<(HourPurchase, HourTransaction), DomainError> = async {
            let mut purchase = Self::load(tx.conn(), id).await?;
            purchase.complete_payment()?;

            let updated = sqlx::query(
                r#"
                UPDATE hour_purchases SET payment_status = 'completed', is_active = 1
                WHERE id = ?1 AND payment_status = 'pending'
                "#,
            )
            .bind(id.as_str())
            .execute(tx.conn())
            .await
            .map_repo_error("Complete purchase payment")?
            .rows_affected();
            if updated == 0 {
                return Err(DomainError::AlreadyProcessed(format!(
                    "Purchase {} payment already resolved",
                    id
                )));
            }

            let credit = Self::credit(tx.conn(), &purchase, completed_by).await?;
            Ok((purchase, credit))
        }
        .await;

        let (purchase, credit) = tx.finish(result).await?;
        info!(purchase_id = %id, hours = credit.hours_amount(), "Purchase payment completed");
        Ok((purchase, credit))
    }

    async fn find_by_id(&self, id: &PurchaseId) -> Result<Option<HourPurchase>, DomainError> {
        let query = format!("SELECT {} FROM hour_purchases WHERE id = ?1", PURCHASE_COLUMNS);
        let row: Option<PurchaseRow> = self
            .base
            .fetch_optional(sqlx::query_as(&query).bind(id.as_str()), "Find purchase")
            .await?;
        row.map(PurchaseRow::into_domain).transpose()
    }

    async fn find_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<HourPurchase>, DomainError> {
        let query = format!(
            "SELECT {} FROM hour_purchases WHERE student_id = ?1 ORDER BY valid_until ASC, created_at ASC",
            PURCHASE_COLUMNS
        );
        let rows: Vec<PurchaseRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&query).bind(student_id.as_str()),
                "Find purchases by student",
            )
            .await?;
        into_purchases(rows)
    }

    async fn find_lapsed(&self, now: DateTime<Utc>) -> Result<Vec<HourPurchase>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM hour_purchases
            WHERE is_active = 1 AND is_expired = 0 AND hours_remaining > 0 AND valid_until <= ?1
            ORDER BY valid_until ASC
            "#,
            PURCHASE_COLUMNS
        );
        let rows: Vec<PurchaseRow> = self
            .base
            .fetch_all(sqlx::query_as(&query).bind(now), "Find lapsed purchases")
            .await?;
        into_purchases(rows)
    }

    async fn expire(
        &self,
        id: &PurchaseId,
        now: DateTime<Utc>,
    ) -> Result<ExpiryOutcome, DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;

        let result: Result<ExpiryOutcome, DomainError> = async {
            let mut purchase = Self::load(tx.conn(), id).await?;
            if purchase.is_expired() {
                return Err(DomainError::AlreadyProcessed(format!(
                    "Purchase {} already expired",
                    id
                )));
            }
            if !purchase.is_lapsed(now) {
                let why = if purchase.is_consumable() {
                    "is still valid"
                } else {
                    "has no hours left to expire"
                };
                return Err(DomainError::InvalidState(format!("Purchase {} {}", id, why)));
            }

            let forfeited = purchase.expire()?;
            let balance = entries::balance(tx.conn(), purchase.student_id()).await?;
            let amount = forfeited.min(balance);

            let transaction = if amount > HOURS_EPSILON {
                Some(
                    entries::append(
                        tx.conn(),
                        TransactionDraft::new(
                            purchase.student_id().clone(),
                            TransactionType::Expiry,
                            -amount,
                            "system",
                        )
                        .with_purchase(purchase.id().clone())
                        .with_description(format!("{} expired", purchase.package_name())),
                    )
                    .await?,
                )
            } else {
                None
            };

            entries::update_purchase_state(tx.conn(), &purchase).await?;
            Ok(ExpiryOutcome {
                purchase,
                transaction,
            })
        }
        .await;

        let outcome = tx.finish(result).await?;
        info!(
            purchase_id = %id,
            forfeited = outcome.transaction.as_ref().map(|t| -t.hours_amount()).unwrap_or(0.0),
            "Package expired"
        );
        Ok(outcome)
    }
}
