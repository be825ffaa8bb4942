use std::time::Duration;

use chrono::{DateTime, Utc};

use classledger_domain::shared::Actor;
use classledger_lib::presentation::commands;

mod test_helpers;

#[tokio::test]
async fn maintenance_run_is_staff_only_and_remembered() {
    let (state, _dir) = test_helpers::setup_state().await;

    let denied = commands::run_maintenance(Some(&Actor::student("s-1")), &state).await;
    assert_eq!(denied.error.expect("students cannot sweep").code, "AUTH_ERROR");

    let before = commands::get_last_maintenance_report(&state)
        .await
        .into_result()
        .expect("report");
    assert!(before.is_none());

    let report = commands::run_maintenance(Some(&test_helpers::front_desk()), &state)
        .await
        .into_result()
        .expect("sweep");
    assert!(report.is_clean());
    assert_eq!(report.make_ups_expired, 0);
    assert_eq!(report.packages.packages_expired, 0);

    let after = commands::get_last_maintenance_report(&state)
        .await
        .into_result()
        .expect("report");
    assert_eq!(after, Some(report));
}

/// Poll until the timer records a sweep newer than `previous`.
async fn wait_for_timer_sweep(
    state: &classledger_lib::presentation::state::AppState,
    previous: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    for _ in 0..100 {
        if let Some(report) = state.services.scheduler.last_report().await {
            if Some(report.ran_at) != previous {
                return report.ran_at;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timer sweep never ran");
}

#[tokio::test]
async fn scheduler_restarts_and_stops_cleanly() {
    let (state, _dir) = test_helpers::setup_state().await;
    let scheduler = &state.services.scheduler;

    scheduler.start(Duration::from_secs(3600)).await;
    assert_eq!(scheduler.active_task_count().await, 1);
    let first = wait_for_timer_sweep(&state, None).await;

    let bad = commands::restart_maintenance(0, Some(&test_helpers::front_desk()), &state).await;
    assert_eq!(bad.error.expect("zero interval").code, "VALIDATION_ERROR");

    let running = commands::restart_maintenance(600, Some(&test_helpers::front_desk()), &state)
        .await
        .into_result()
        .expect("restart");
    assert_eq!(running, 1);

    // The restarted timer sweeps immediately
    let second = wait_for_timer_sweep(&state, Some(first)).await;
    assert!(second >= first);

    scheduler.stop_all_tasks().await;
    assert_eq!(scheduler.active_task_count().await, 0);

    let last = commands::get_last_maintenance_report(&state)
        .await
        .into_result()
        .expect("report")
        .expect("report survives stop");
    assert_eq!(last.ran_at, second);

    state.shutdown().await;
}
