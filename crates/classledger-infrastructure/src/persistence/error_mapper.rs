use classledger_domain::shared::DomainError;

/// Converts driver and codec errors into `DomainError`
pub struct RepositoryErrorMapper;

impl RepositoryErrorMapper {
    pub fn map_sqlx_error(error: sqlx::Error, context: &str) -> DomainError {
        match &error {
            sqlx::Error::RowNotFound => {
                DomainError::NotFound(format!("{}: row not found", context))
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DomainError::AlreadyProcessed(format!("{}: {}", context, db.message()))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                DomainError::Validation(format!("{}: {}", context, db.message()))
            }
            sqlx::Error::Database(db) if db.is_check_violation() => {
                DomainError::DataIntegrity(format!("{}: {}", context, db.message()))
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DomainError::DataIntegrity(format!("{}: {}", context, error))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DomainError::Infrastructure(format!("{}: {}", context, error))
            }
            _ => {
                tracing::error!(context = %context, error = %error, "Repository operation failed");
                DomainError::Repository(format!("{}: {}", context, error))
            }
        }
    }

    pub fn map_json_error(error: serde_json::Error, context: &str) -> DomainError {
        DomainError::Serialization(format!("{}: {}", context, error))
    }
}
