use classledger_domain::shared::{Actor, StudentId};
use classledger_lib::application::dtos::{
    CreateAdjustmentInput, DeductHoursInput, TransferHoursInput,
};
use classledger_lib::presentation::commands;

mod test_helpers;

#[tokio::test]
async fn adjustment_changes_balance_only_after_second_approver() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    test_helpers::buy_package(&state, &student, 10.0).await;

    let requester = test_helpers::front_desk();
    let adjustment = commands::create_adjustment(
        CreateAdjustmentInput {
            student_id: student.as_str().to_string(),
            adjustment_type: "add".to_string(),
            hours: 2.0,
            reason: "Teacher cancelled last week".to_string(),
        },
        Some(&requester),
        &state,
    )
    .await
    .into_result()
    .expect("create adjustment");
    assert_eq!(adjustment.approval_status, "pending");
    assert_eq!(test_helpers::balance_of(&state, &student).await, 10.0);

    let own = commands::approve_adjustment(adjustment.id.clone(), None, Some(&requester), &state).await;
    assert_eq!(own.error.expect("self approval").code, "VALIDATION_ERROR");

    let manager = Actor::admin("manager");
    let approved = commands::approve_adjustment(adjustment.id.clone(), None, Some(&manager), &state)
        .await
        .into_result()
        .expect("approve");
    assert_eq!(approved.adjustment.approval_status, "approved");
    assert_eq!(approved.transaction.balance_before, 10.0);
    assert_eq!(approved.transaction.balance_after, 12.0);
    assert_eq!(test_helpers::balance_of(&state, &student).await, 12.0);

    let twice = commands::approve_adjustment(adjustment.id, None, Some(&manager), &state).await;
    assert_eq!(twice.error.expect("second approval").code, "ALREADY_PROCESSED");
    assert_eq!(test_helpers::balance_of(&state, &student).await, 12.0);

    let pending = commands::get_pending_adjustments(&state)
        .await
        .into_result()
        .expect("pending");
    assert!(pending.is_empty());
}

#[tokio::test]
async fn deduction_beyond_balance_is_rejected_with_business_code() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    test_helpers::buy_package(&state, &student, 2.0).await;
    let class = test_helpers::class_in_hours(-1, 2);

    let input = |hours: f64| DeductHoursInput {
        student_id: student.as_str().to_string(),
        class_id: class.id.as_str().to_string(),
        booking_id: None,
        hours,
        class_type: Some("group".to_string()),
        deduction_rate: None,
    };

    let txn = commands::deduct_hours(input(1.5), Some(&test_helpers::front_desk()), &state)
        .await
        .into_result()
        .expect("deduct");
    assert_eq!(txn.transaction_type, "deduction");
    assert_eq!(txn.balance_after, 0.5);

    let short = commands::deduct_hours(input(1.5), Some(&test_helpers::front_desk()), &state).await;
    assert!(!short.success);
    assert_eq!(short.error.expect("error").code, "INSUFFICIENT_HOURS");
    assert_eq!(test_helpers::balance_of(&state, &student).await, 0.5);

    let history = commands::get_transactions(student.as_str().to_string(), None, None, &state)
        .await
        .into_result()
        .expect("history");
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn family_transfer_needs_a_shared_family() {
    let (state, _dir) = test_helpers::setup_state().await;
    let parent = StudentId::new();
    let sibling = StudentId::new();
    let stranger = StudentId::new();
    test_helpers::seed_profile(&state, &parent, 2, Some("family-7")).await;
    test_helpers::seed_profile(&state, &sibling, 1, Some("family-7")).await;
    test_helpers::seed_profile(&state, &stranger, 2, Some("family-9")).await;
    test_helpers::buy_package(&state, &parent, 6.0).await;

    let transfer = |to: &StudentId| TransferHoursInput {
        from_student_id: parent.as_str().to_string(),
        to_student_id: to.as_str().to_string(),
        hours: 2.0,
        reason: "Sharing the pack".to_string(),
        is_family_transfer: true,
    };

    let refused =
        commands::transfer_hours(transfer(&stranger), Some(&test_helpers::front_desk()), &state).await;
    assert!(!refused.success);
    assert_eq!(
        refused.error.expect("error").code,
        "FAMILY_TRANSFER_NOT_ELIGIBLE"
    );
    assert_eq!(test_helpers::balance_of(&state, &parent).await, 6.0);
    assert_eq!(test_helpers::balance_of(&state, &stranger).await, 0.0);

    let done = commands::transfer_hours(transfer(&sibling), Some(&test_helpers::front_desk()), &state)
        .await
        .into_result()
        .expect("transfer");
    assert_eq!(done.debit.hours_amount, -2.0);
    assert_eq!(done.credit.hours_amount, 2.0);
    assert_eq!(test_helpers::balance_of(&state, &parent).await, 4.0);
    assert_eq!(test_helpers::balance_of(&state, &sibling).await, 2.0);

    let logs = commands::get_transfer_logs(parent.as_str().to_string(), &state)
        .await
        .into_result()
        .expect("logs");
    assert_eq!(logs.len(), 1);
    assert!(logs[0].is_family_transfer);
}

#[tokio::test]
async fn reports_default_to_last_thirty_days() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    test_helpers::buy_package(&state, &student, 10.0).await;

    let revenue = commands::get_revenue_report(None, None, None, &state).await;
    assert!(revenue.success, "{:?}", revenue.error);

    let bad = commands::get_consumption_report(
        Some("yesterday".to_string()),
        None,
        None,
        &state,
    )
    .await;
    assert!(!bad.success);
    assert_eq!(bad.error.expect("error").code, "VALIDATION_ERROR");
}
