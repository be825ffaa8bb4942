use classledger_domain::shared::{DomainError, ErrorCode, ErrorSeverity};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Structured error carried by a failed [`ApiResponse`]
///
/// - `code`: stable wire code for programmatic handling
/// - `message`: human-readable text for the UI
/// - `details`: underlying cause when the code is a generic wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub severity: ErrorSeverity,
    pub recoverable: bool,
}

impl ApiError {
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            details: None,
            severity: code.severity(),
            recoverable: code.is_recoverable(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Report `err` under `wrapper`, keeping the cause in `details`.
    pub fn wrapped(wrapper: ErrorCode, err: &DomainError) -> Self {
        Self::from_code(wrapper, wrapper_message(wrapper)).with_details(err.format_with_code())
    }

    /// Business errors keep their own code; store and infrastructure
    /// failures are reported under `wrapper`.
    pub fn classify(wrapper: ErrorCode, err: &DomainError) -> Self {
        if err.code().is_internal() {
            Self::wrapped(wrapper, err)
        } else {
            err.into()
        }
    }
}

impl From<&DomainError> for ApiError {
    fn from(err: &DomainError) -> Self {
        Self::from_code(err.code(), err.message())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

fn wrapper_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::FetchError => "Failed to load data",
        ErrorCode::SubmissionError => "Failed to submit request",
        ErrorCode::TransactionCreateError => "Failed to record transaction",
        ErrorCode::TransferError => "Failed to transfer hours",
        ErrorCode::AdjustmentCreateError => "Failed to process adjustment",
        ErrorCode::PostponementCreateError => "Failed to update postponement",
        ErrorCode::SuggestionCreateError => "Failed to process make-up class",
        ErrorCode::UpdateError => "Failed to save changes",
        _ => "Operation failed",
    }
}

/// Response envelope returned by every handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: ApiError) -> Self {
        log_failure(&error);
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(ApiError::from_code(
                ErrorCode::InfrastructureError,
                "Response carried neither data nor error",
            )),
        }
    }
}

fn log_failure(error: &ApiError) {
    match error.severity {
        ErrorSeverity::Info => info!(code = %error.code, "{}", error.message),
        ErrorSeverity::Warning => warn!(code = %error.code, "{}", error.message),
        ErrorSeverity::Error | ErrorSeverity::Critical => error!(
            code = %error.code,
            details = error.details.as_deref().unwrap_or(""),
            "{}",
            error.message
        ),
    }
}

/// Envelope a service result; internal failures surface as `wrapper`.
pub fn respond<T>(result: Result<T, DomainError>, wrapper: ErrorCode) -> ApiResponse<T> {
    match result {
        Ok(data) => ApiResponse::ok(data),
        Err(err) => ApiResponse::fail(ApiError::classify(wrapper, &err)),
    }
}

/// Envelope a service result; every failure surfaces as `wrapper`.
pub fn respond_wrapped<T>(result: Result<T, DomainError>, wrapper: ErrorCode) -> ApiResponse<T> {
    match result {
        Ok(data) => ApiResponse::ok(data),
        Err(err) => ApiResponse::fail(ApiError::wrapped(wrapper, &err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_error_keeps_its_code() {
        let result: Result<(), _> = Err(DomainError::InsufficientHours {
            required: 2.0,
            available: 1.0,
        });
        let response = respond(result, ErrorCode::TransactionCreateError);

        let error = response.error.unwrap();
        assert!(!response.success);
        assert_eq!(error.code, "INSUFFICIENT_HOURS");
        assert!(error.details.is_none());
    }

    #[test]
    fn test_store_failure_is_wrapped_with_details() {
        let result: Result<(), _> = Err(DomainError::Repository("database is locked".into()));
        let response = respond(result, ErrorCode::FetchError);

        let error = response.error.unwrap();
        assert_eq!(error.code, "FETCH_ERROR");
        assert!(error.details.unwrap().contains("database is locked"));
    }

    #[test]
    fn test_respond_wrapped_wraps_business_errors() {
        let result: Result<(), _> = Err(DomainError::Validation("bad".into()));
        let response = respond_wrapped(result, ErrorCode::SubmissionError);

        let error = response.error.unwrap();
        assert_eq!(error.code, "SUBMISSION_ERROR");
        assert!(error.details.unwrap().contains("VALIDATION_ERROR"));
    }

    #[test]
    fn test_envelope_omits_absent_fields() {
        let json = serde_json::to_value(ApiResponse::ok(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 3 }));

        let failed: ApiResponse<u8> =
            ApiResponse::fail(ApiError::from_code(ErrorCode::AuthError, "sign in"));
        let json = serde_json::to_value(failed).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "AUTH_ERROR");
        assert!(json["error"].get("details").is_none());
    }
}
