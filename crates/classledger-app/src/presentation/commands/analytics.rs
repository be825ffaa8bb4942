use chrono::Utc;

use crate::application::utils::parse_timestamp;
use crate::presentation::error::{respond, ApiResponse};
use crate::presentation::state::AppState;
use classledger_domain::analytics::{
    ClassEfficiencyReport, ConsumptionReport, PerformanceReport, PerformanceSample, ReportWindow,
    RevenueReport,
};
use classledger_domain::shared::{Actor, DomainError, ErrorCode};

const DEFAULT_WINDOW_DAYS: i64 = 30;

/// `[from, to)`; either bound may be omitted
fn resolve_window(from: Option<&str>, to: Option<&str>) -> Result<ReportWindow, DomainError> {
    let to = match to {
        Some(value) => parse_timestamp(value, "window end")?,
        None => Utc::now(),
    };
    match from {
        Some(value) => ReportWindow::new(parse_timestamp(value, "window start")?, to),
        None => ReportWindow::last_days(to, DEFAULT_WINDOW_DAYS),
    }
}

pub async fn get_class_efficiency_report(
    from: Option<String>,
    to: Option<String>,
    force_refresh: Option<bool>,
    state: &AppState,
) -> ApiResponse<ClassEfficiencyReport> {
    let result = async move {
        let window = resolve_window(from.as_deref(), to.as_deref())?;
        state
            .services
            .analytics
            .class_efficiency(window, force_refresh.unwrap_or(false))
            .await
    }
    .await;
    respond(result, ErrorCode::FetchError)
}

pub async fn get_consumption_report(
    from: Option<String>,
    to: Option<String>,
    force_refresh: Option<bool>,
    state: &AppState,
) -> ApiResponse<ConsumptionReport> {
    let result = async move {
        let window = resolve_window(from.as_deref(), to.as_deref())?;
        state
            .services
            .analytics
            .consumption(window, force_refresh.unwrap_or(false))
            .await
    }
    .await;
    respond(result, ErrorCode::FetchError)
}

pub async fn get_revenue_report(
    from: Option<String>,
    to: Option<String>,
    force_refresh: Option<bool>,
    state: &AppState,
) -> ApiResponse<RevenueReport> {
    let result = async move {
        let window = resolve_window(from.as_deref(), to.as_deref())?;
        state
            .services
            .analytics
            .revenue(window, force_refresh.unwrap_or(false))
            .await
    }
    .await;
    respond(result, ErrorCode::FetchError)
}

pub async fn get_performance_report(
    from: Option<String>,
    to: Option<String>,
    force_refresh: Option<bool>,
    state: &AppState,
) -> ApiResponse<PerformanceReport> {
    let result = async move {
        let window = resolve_window(from.as_deref(), to.as_deref())?;
        state
            .services
            .analytics
            .performance(window, force_refresh.unwrap_or(false))
            .await
    }
    .await;
    respond(result, ErrorCode::FetchError)
}

/// Store one client-side web-vital measurement
pub async fn record_performance_metric(
    metric: String,
    value: f64,
    page: Option<String>,
    state: &AppState,
) -> ApiResponse<PerformanceSample> {
    respond(
        state
            .services
            .analytics
            .record_sample(&metric, value, page)
            .await,
        ErrorCode::UpdateError,
    )
}

pub async fn clear_analytics_cache(actor: Option<&Actor>, state: &AppState) -> ApiResponse<()> {
    if let Err(e) = Actor::require_staff(actor) {
        return respond(Err(e), ErrorCode::UpdateError);
    }
    state.services.analytics.clear_cache().await;
    ApiResponse::ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults_to_last_thirty_days() {
        let window = resolve_window(None, Some("2026-03-31T00:00:00Z")).unwrap();
        assert_eq!(window.from.to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let err = resolve_window(Some("2026-03-31T00:00:00Z"), Some("2026-03-01T00:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
