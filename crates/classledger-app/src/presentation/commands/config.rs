use chrono::Utc;
use std::time::Duration;

use crate::application::config::AppConfig;
use crate::application::services::{LogLevel, MaintenanceReport};
use crate::presentation::error::{respond, ApiError, ApiResponse};
use crate::presentation::state::AppState;
use classledger_domain::shared::{Actor, DomainError, ErrorCode};

/// Get current log level
pub async fn get_log_level(state: &AppState) -> ApiResponse<String> {
    let level = state.services.config.get_log_level();
    ApiResponse::ok(level.as_str().to_string())
}

/// Set log level and persist it to the config file
pub async fn set_log_level(
    level: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<()> {
    if let Err(e) = Actor::require_staff(actor) {
        return respond(Err(e), ErrorCode::UpdateError);
    }

    let log_level = match level.parse::<LogLevel>() {
        Ok(level) => level,
        Err(message) => {
            return ApiResponse::fail(ApiError::from_code(ErrorCode::ValidationError, message));
        }
    };

    match state.services.config.set_log_level(log_level) {
        Ok(()) => ApiResponse::ok(()),
        Err(e) => ApiResponse::fail(
            ApiError::from_code(ErrorCode::UpdateError, "Failed to save log level")
                .with_details(e.to_string()),
        ),
    }
}

/// Effective configuration, defaults included
pub async fn get_config(state: &AppState) -> ApiResponse<AppConfig> {
    ApiResponse::ok(state.config().clone())
}

/// Run the package and make-up expiry sweep now
pub async fn run_maintenance(
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<MaintenanceReport> {
    if let Err(e) = Actor::require_staff(actor) {
        return respond(Err(e), ErrorCode::UpdateError);
    }
    let report = state.services.scheduler.run_once(Utc::now()).await;
    ApiResponse::ok(report)
}

/// Restart the periodic sweep with a new interval
pub async fn restart_maintenance(
    interval_secs: u64,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<usize> {
    if let Err(e) = Actor::require_staff(actor) {
        return respond(Err(e), ErrorCode::UpdateError);
    }
    if interval_secs == 0 {
        return ApiResponse::fail(ApiError::from_code(
            ErrorCode::ValidationError,
            "Sweep interval must be at least one second",
        ));
    }

    let scheduler = &state.services.scheduler;
    scheduler.restart(Duration::from_secs(interval_secs)).await;
    ApiResponse::ok(scheduler.active_task_count().await)
}

pub async fn get_last_maintenance_report(
    state: &AppState,
) -> ApiResponse<Option<MaintenanceReport>> {
    let result: Result<_, DomainError> = Ok(state.services.scheduler.last_report().await);
    respond(result, ErrorCode::FetchError)
}
