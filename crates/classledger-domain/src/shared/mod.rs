use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod actor;

pub use actor::{Actor, ActorRole};

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn from_string(s: &str) -> Self {
                Self(s.to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

define_id!(StudentId);
define_id!(TransactionId);
define_id!(PurchaseId);
define_id!(TransferId);
define_id!(AdjustmentId);
define_id!(LeaveRequestId);
define_id!(PostponementId);
define_id!(MakeUpClassId);
define_id!(SuggestionId);
define_id!(ClassId);
define_id!(BookingId);
define_id!(CourseId);
define_id!(TeacherId);

/// Round an hour amount to two decimal places.
///
/// Ledger arithmetic is done in `f64`; every amount that is persisted goes
/// through this so `balance_after = balance_before + hours_amount` holds
/// exactly on the stored values.
pub fn round_hours(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Stable error codes surfaced to callers in the response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Ledger rules
    InsufficientHours,
    NegativeBalance,
    AlreadyReversed,
    FamilyTransferNotEligible,

    // Workflow state
    AlreadyProcessed,
    InvalidState,

    // Caller
    AuthError,
    ValidationError,
    NotFound,

    // Store / infrastructure
    RepositoryError,
    InfrastructureError,
    SerializationError,
    DataIntegrityError,

    // Operation wrappers
    FetchError,
    SubmissionError,
    TransactionCreateError,
    TransferError,
    AdjustmentCreateError,
    PostponementCreateError,
    SuggestionCreateError,
    UpdateError,
}

impl ErrorCode {
    /// Wire representation, e.g. `INSUFFICIENT_HOURS`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InsufficientHours => "INSUFFICIENT_HOURS",
            ErrorCode::NegativeBalance => "NEGATIVE_BALANCE",
            ErrorCode::AlreadyReversed => "ALREADY_REVERSED",
            ErrorCode::FamilyTransferNotEligible => "FAMILY_TRANSFER_NOT_ELIGIBLE",
            ErrorCode::AlreadyProcessed => "ALREADY_PROCESSED",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RepositoryError => "REPOSITORY_ERROR",
            ErrorCode::InfrastructureError => "INFRASTRUCTURE_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::DataIntegrityError => "DATA_INTEGRITY_ERROR",
            ErrorCode::FetchError => "FETCH_ERROR",
            ErrorCode::SubmissionError => "SUBMISSION_ERROR",
            ErrorCode::TransactionCreateError => "TRANSACTION_CREATE_ERROR",
            ErrorCode::TransferError => "TRANSFER_ERROR",
            ErrorCode::AdjustmentCreateError => "ADJUSTMENT_CREATE_ERROR",
            ErrorCode::PostponementCreateError => "POSTPONEMENT_CREATE_ERROR",
            ErrorCode::SuggestionCreateError => "SUGGESTION_CREATE_ERROR",
            ErrorCode::UpdateError => "UPDATE_ERROR",
        }
    }

    /// Get error severity
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ErrorCode::InsufficientHours
            | ErrorCode::NegativeBalance
            | ErrorCode::AlreadyReversed
            | ErrorCode::AlreadyProcessed
            | ErrorCode::InvalidState
            | ErrorCode::FamilyTransferNotEligible => ErrorSeverity::Warning,

            ErrorCode::ValidationError | ErrorCode::NotFound | ErrorCode::AuthError => {
                ErrorSeverity::Info
            }

            ErrorCode::DataIntegrityError => ErrorSeverity::Critical,

            _ => ErrorSeverity::Error,
        }
    }

    /// Whether retrying the same call can succeed without changing the input.
    ///
    /// Only store-level failures qualify; business rejections are final.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RepositoryError
                | ErrorCode::InfrastructureError
                | ErrorCode::FetchError
                | ErrorCode::SubmissionError
                | ErrorCode::TransactionCreateError
                | ErrorCode::TransferError
                | ErrorCode::AdjustmentCreateError
                | ErrorCode::PostponementCreateError
                | ErrorCode::SuggestionCreateError
                | ErrorCode::UpdateError
        )
    }

    /// Store and infrastructure failures that callers report under a generic
    /// per-operation code instead of their own.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ErrorCode::RepositoryError
                | ErrorCode::InfrastructureError
                | ErrorCode::SerializationError
                | ErrorCode::DataIntegrityError
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Insufficient hours: required {required}, available {available}")]
    InsufficientHours { required: f64, available: f64 },

    #[error("Negative balance: {0}")]
    NegativeBalance(String),

    #[error("Transaction already reversed: {0}")]
    AlreadyReversed(String),

    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Family transfer not eligible: {0}")]
    FamilyTransferNotEligible(String),

    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

impl DomainError {
    /// Get error code
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::InsufficientHours { .. } => ErrorCode::InsufficientHours,
            DomainError::NegativeBalance(_) => ErrorCode::NegativeBalance,
            DomainError::AlreadyReversed(_) => ErrorCode::AlreadyReversed,
            DomainError::AlreadyProcessed(_) => ErrorCode::AlreadyProcessed,
            DomainError::InvalidState(_) => ErrorCode::InvalidState,
            DomainError::FamilyTransferNotEligible(_) => ErrorCode::FamilyTransferNotEligible,
            DomainError::Auth(_) => ErrorCode::AuthError,
            DomainError::Validation(_) => ErrorCode::ValidationError,
            DomainError::NotFound(_) => ErrorCode::NotFound,
            DomainError::Repository(_) => ErrorCode::RepositoryError,
            DomainError::Infrastructure(_) => ErrorCode::InfrastructureError,
            DomainError::Serialization(_) => ErrorCode::SerializationError,
            DomainError::DataIntegrity(_) => ErrorCode::DataIntegrityError,
        }
    }

    /// Human readable message for the envelope
    pub fn message(&self) -> String {
        match self {
            DomainError::InsufficientHours {
                required,
                available,
            } => format!(
                "Insufficient hours: {:.2} required, {:.2} available",
                required, available
            ),
            DomainError::NegativeBalance(msg)
            | DomainError::AlreadyReversed(msg)
            | DomainError::AlreadyProcessed(msg)
            | DomainError::InvalidState(msg)
            | DomainError::FamilyTransferNotEligible(msg)
            | DomainError::Auth(msg)
            | DomainError::Validation(msg)
            | DomainError::NotFound(msg)
            | DomainError::Repository(msg)
            | DomainError::Infrastructure(msg)
            | DomainError::Serialization(msg)
            | DomainError::DataIntegrity(msg) => msg.clone(),
        }
    }

    /// Get error severity
    pub fn severity(&self) -> ErrorSeverity {
        self.code().severity()
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        self.code().is_recoverable()
    }

    /// Format error with code
    pub fn format_with_code(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

/// Reject amounts that are not finite and strictly positive.
pub fn ensure_positive_hours(hours: f64, field: &str) -> Result<f64, DomainError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(DomainError::Validation(format!(
            "{} must be a positive number of hours",
            field
        )));
    }
    Ok(round_hours(hours))
}
