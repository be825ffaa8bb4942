use classledger_domain::shared::DomainError;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

use super::ResultExt;

/// A SQLite write transaction opened with `BEGIN IMMEDIATE`.
///
/// The write lock is taken when the transaction starts, so a balance read
/// inside it cannot be invalidated by another writer before commit. Writers
/// on other connections wait (up to the busy timeout) instead of racing.
///
/// Call `finish` with the result of the work done on `conn()`: it commits on
/// `Ok` and rolls back on `Err`. A transaction dropped unfinished closes its
/// connection, which discards the uncommitted work.
pub struct ImmediateTransaction {
    conn: PoolConnection<Sqlite>,
    open: bool,
}

impl ImmediateTransaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self, DomainError> {
        let mut conn = pool.acquire().await.map_repo_error("Acquire connection")?;
        (&mut *conn)
            .execute("BEGIN IMMEDIATE")
            .await
            .map_repo_error("Begin write transaction")?;
        Ok(Self { conn, open: true })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn commit(mut self) -> Result<(), DomainError> {
        (&mut *self.conn)
            .execute("COMMIT")
            .await
            .map_repo_error("Commit write transaction")?;
        self.open = false;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), DomainError> {
        (&mut *self.conn)
            .execute("ROLLBACK")
            .await
            .map_repo_error("Roll back write transaction")?;
        self.open = false;
        Ok(())
    }

    /// Commit `Ok` work, roll back `Err` work and hand the original error back.
    pub async fn finish<T>(self, result: Result<T, DomainError>) -> Result<T, DomainError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::error!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl Drop for ImmediateTransaction {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!("Write transaction dropped while open, closing its connection");
            self.conn.close_on_drop();
        }
    }
}
