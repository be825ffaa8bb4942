use classledger_domain::shared::DomainError;

use super::RepositoryErrorMapper;

/// `.map_repo_error("context")` on driver and codec results
pub trait ResultExt<T> {
    fn map_repo_error(self, context: &str) -> Result<T, DomainError>;
}

impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn map_repo_error(self, context: &str) -> Result<T, DomainError> {
        self.map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, context))
    }
}

impl<T> ResultExt<T> for Result<T, serde_json::Error> {
    fn map_repo_error(self, context: &str) -> Result<T, DomainError> {
        self.map_err(|e| RepositoryErrorMapper::map_json_error(e, context))
    }
}
