use chrono::{Duration, Utc};

use classledger_domain::catalog::Booking;
use classledger_domain::shared::{Actor, StudentId};
use classledger_lib::application::dtos::{SubmitLeaveInput, ValidateLeaveInput};
use classledger_lib::presentation::commands;

mod test_helpers;

fn sick_leave_for(student: &StudentId, booking: &Booking) -> SubmitLeaveInput {
    SubmitLeaveInput {
        student_id: student.as_str().to_string(),
        booking_id: booking.id.as_str().to_string(),
        leave_type: "sick".to_string(),
        reason: Some("Fever".to_string()),
        affected_classes: 1,
    }
}

#[tokio::test]
async fn early_leave_is_refunded_postponed_and_gets_suggestions() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    test_helpers::seed_profile(&state, &student, 2, None).await;
    test_helpers::buy_package(&state, &student, 10.0).await;

    let class = test_helpers::class_in_hours(50, 2);
    test_helpers::seed_class(&state, &class).await;
    let booking = test_helpers::book_and_charge(&state, &student, &class, 1.5).await;
    assert_eq!(test_helpers::balance_of(&state, &student).await, 8.5);

    // Same course and a neighbouring level inside the search window
    let candidate = test_helpers::class_in_hours(24 * 4, 3);
    test_helpers::seed_class(&state, &candidate).await;
    // Outside the search window
    test_helpers::seed_class(&state, &test_helpers::class_in_hours(24 * 20, 2)).await;
    // Level too far away
    test_helpers::seed_class(&state, &test_helpers::class_in_hours(24 * 5, 5)).await;

    let me = Actor::student(student.as_str());
    let outcome = commands::submit_leave_request(sick_leave_for(&student, &booking), Some(&me), &state)
        .await
        .into_result()
        .expect("leave accepted");

    assert_eq!(outcome.request.status, "approved");
    assert!(outcome.request.auto_approved);
    assert!(outcome.request.meets_48_hour_rule);
    assert_eq!(outcome.request.refund_percentage, 100.0);
    assert_eq!(outcome.request.hours_to_refund, 1.5);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let refund = outcome.refund.expect("refund written");
    assert_eq!(refund.transaction_type, "refund");
    assert_eq!(refund.hours_amount, 1.5);
    assert_eq!(test_helpers::balance_of(&state, &student).await, 10.0);

    let postponement = outcome.postponement.expect("postponement created");
    assert_eq!(postponement.status, "pending");
    assert_eq!(postponement.booking_id, booking.id.as_str());

    let make_up = outcome.make_up.expect("suggestions generated");
    assert_eq!(make_up.status, "suggested");
    assert_eq!(make_up.alternative_suggestions.len(), 1);
    let suggestion = &make_up.alternative_suggestions[0];
    assert_eq!(suggestion.class_id, candidate.id.as_str());

    // The refund is not paid twice
    let retry = commands::process_leave_refund(
        outcome.request.id.clone(),
        Some(&test_helpers::front_desk()),
        &state,
    )
    .await;
    assert!(!retry.success);
    assert_eq!(retry.error.expect("error").code, "ALREADY_PROCESSED");
    assert_eq!(test_helpers::balance_of(&state, &student).await, 10.0);

    // Student picks, staff approve and book
    let selected = commands::select_makeup_class(
        make_up.id.clone(),
        suggestion.id.clone(),
        student.as_str().to_string(),
        Some(&me),
        &state,
    )
    .await
    .into_result()
    .expect("select");
    assert_eq!(selected.status, "student_selected");

    let approved = commands::approve_makeup_class(
        make_up.id.clone(),
        Some("ok".to_string()),
        Some(&me),
        &state,
    )
    .await;
    assert_eq!(approved.error.expect("students cannot approve").code, "AUTH_ERROR");

    commands::approve_makeup_class(make_up.id.clone(), None, Some(&test_helpers::front_desk()), &state)
        .await
        .into_result()
        .expect("approve");
    let scheduled = commands::schedule_makeup_class(make_up.id.clone(), Some(&test_helpers::front_desk()), &state)
        .await
        .into_result()
        .expect("schedule");
    assert_eq!(scheduled.status, "scheduled");
    assert!(scheduled.scheduled_booking_id.is_some());

    let postponements = commands::get_student_postponements(student.as_str().to_string(), &state)
        .await
        .into_result()
        .expect("postponements");
    assert_eq!(postponements.len(), 1);
    assert_eq!(postponements[0].status, "make_up_scheduled");
}

#[tokio::test]
async fn late_personal_leave_waits_for_review() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    test_helpers::seed_profile(&state, &student, 2, None).await;
    test_helpers::buy_package(&state, &student, 10.0).await;

    let class = test_helpers::class_in_hours(30, 2);
    test_helpers::seed_class(&state, &class).await;
    let booking = test_helpers::book_and_charge(&state, &student, &class, 1.5).await;

    let mut input = sick_leave_for(&student, &booking);
    input.leave_type = "personal".to_string();
    let me = Actor::student(student.as_str());
    let outcome = commands::submit_leave_request(input, Some(&me), &state)
        .await
        .into_result()
        .expect("leave accepted");

    assert_eq!(outcome.request.status, "pending");
    assert!(!outcome.request.meets_48_hour_rule);
    assert!(outcome.refund.is_none());
    assert!(outcome.postponement.is_none());
    assert_eq!(test_helpers::balance_of(&state, &student).await, 8.5);

    let pending = commands::get_pending_leave_requests(&state)
        .await
        .into_result()
        .expect("pending list");
    assert_eq!(pending.len(), 1);

    let review = commands::approve_leave_request(outcome.request.id.clone(), None, Some(&me), &state).await;
    assert_eq!(review.error.expect("students cannot approve").code, "AUTH_ERROR");

    let approved = commands::approve_leave_request(
        outcome.request.id.clone(),
        Some("Documented".to_string()),
        Some(&test_helpers::front_desk()),
        &state,
    )
    .await
    .into_result()
    .expect("approve");
    assert_eq!(approved.request.status, "approved");
    assert_eq!(approved.request.reviewed_by.as_deref(), Some("front-desk"));
    assert!(approved.postponement.is_some());

    let refunded = approved.request.hours_to_refund;
    assert!(refunded > 0.0 && refunded < 1.5);
    assert_eq!(approved.refund.expect("partial refund").hours_amount, refunded);

    let again = commands::approve_leave_request(
        outcome.request.id,
        None,
        Some(&test_helpers::front_desk()),
        &state,
    )
    .await;
    assert_eq!(again.error.expect("already resolved").code, "ALREADY_PROCESSED");
}

#[tokio::test]
async fn leave_for_a_past_class_is_a_submission_error() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    let class = test_helpers::class_in_hours(-2, 2);
    test_helpers::seed_class(&state, &class).await;
    let booking = test_helpers::seed_booking(&state, &student, &class).await;

    let response = commands::submit_leave_request(
        sick_leave_for(&student, &booking),
        Some(&Actor::student(student.as_str())),
        &state,
    )
    .await;

    assert!(!response.success);
    let error = response.error.expect("error");
    assert_eq!(error.code, "SUBMISSION_ERROR");
    assert!(error.details.expect("details").contains("VALIDATION_ERROR"));
}

#[tokio::test]
async fn refund_is_based_on_the_stored_booking() {
    let (state, _dir) = test_helpers::setup_state().await;
    let owner = StudentId::new();
    let other = StudentId::new();
    test_helpers::buy_package(&state, &owner, 5.0).await;
    test_helpers::buy_package(&state, &other, 1.0).await;

    let class = test_helpers::class_in_hours(60, 2);
    test_helpers::seed_class(&state, &class).await;
    // Charged less than the class runs
    let booking = test_helpers::book_and_charge(&state, &owner, &class, 1.0).await;

    // Someone else's booking is refused, whatever the payload claims
    let foreign: SubmitLeaveInput = serde_json::from_value(serde_json::json!({
        "studentId": other.as_str(),
        "bookingId": booking.id.as_str(),
        "classDate": (Utc::now() + Duration::hours(100)).to_rfc3339(),
        "classHours": 500.0,
        "leaveType": "personal",
    }))
    .expect("extra fields are ignored");
    let refused =
        commands::submit_leave_request(foreign, Some(&Actor::student(other.as_str())), &state).await;
    assert!(!refused.success);
    assert!(refused
        .error
        .and_then(|e| e.details)
        .expect("details")
        .contains("VALIDATION_ERROR"));
    assert_eq!(test_helpers::balance_of(&state, &other).await, 1.0);

    // The owner's inflated claim is ignored too
    let inflated: SubmitLeaveInput = serde_json::from_value(serde_json::json!({
        "studentId": owner.as_str(),
        "bookingId": booking.id.as_str(),
        "classHours": 500.0,
        "leaveType": "sick",
        "reason": "Fever",
    }))
    .expect("extra fields are ignored");
    let outcome = commands::submit_leave_request(inflated, Some(&Actor::student(owner.as_str())), &state)
        .await
        .into_result()
        .expect("leave accepted");
    assert_eq!(outcome.request.class_hours, 1.0);
    assert_eq!(outcome.request.hours_to_refund, 1.0);
    // Timed from the stored start, not a declared date
    assert!(outcome.request.hours_before_class < 61.0);
    assert_eq!(test_helpers::balance_of(&state, &owner).await, 5.0);
}

#[tokio::test]
async fn uncharged_booking_earns_no_refund() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    test_helpers::buy_package(&state, &student, 2.0).await;
    let class = test_helpers::class_in_hours(60, 2);
    test_helpers::seed_class(&state, &class).await;
    let booking = test_helpers::seed_booking(&state, &student, &class).await;

    let outcome = commands::submit_leave_request(
        sick_leave_for(&student, &booking),
        Some(&Actor::student(student.as_str())),
        &state,
    )
    .await
    .into_result()
    .expect("leave accepted");
    assert_eq!(outcome.request.status, "approved");
    assert_eq!(outcome.request.hours_to_refund, 0.0);
    assert!(outcome.refund.is_none());
    assert_eq!(test_helpers::balance_of(&state, &student).await, 2.0);
}

#[tokio::test]
async fn a_booking_is_refunded_only_once() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    let me = Actor::student(student.as_str());
    test_helpers::buy_package(&state, &student, 10.0).await;

    let early = test_helpers::class_in_hours(60, 2);
    test_helpers::seed_class(&state, &early).await;
    let booking = test_helpers::book_and_charge(&state, &student, &early, 1.5).await;

    let first = commands::submit_leave_request(sick_leave_for(&student, &booking), Some(&me), &state)
        .await
        .into_result()
        .expect("first leave");
    assert_eq!(first.refund.expect("refund").hours_amount, 1.5);
    assert_eq!(test_helpers::balance_of(&state, &student).await, 10.0);

    let second = commands::submit_leave_request(sick_leave_for(&student, &booking), Some(&me), &state).await;
    assert!(!second.success);
    assert_eq!(second.error.expect("error").code, "SUBMISSION_ERROR");
    assert_eq!(test_helpers::balance_of(&state, &student).await, 10.0);

    // A request still waiting for review also holds the booking
    let late = test_helpers::class_in_hours(30, 2);
    test_helpers::seed_class(&state, &late).await;
    let late_booking = test_helpers::book_and_charge(&state, &student, &late, 1.5).await;
    let mut personal = sick_leave_for(&student, &late_booking);
    personal.leave_type = "personal".to_string();

    let pending = commands::submit_leave_request(personal.clone(), Some(&me), &state)
        .await
        .into_result()
        .expect("pending leave");
    assert_eq!(pending.request.status, "pending");

    let duplicate = commands::submit_leave_request(personal, Some(&me), &state).await;
    let details = duplicate.error.and_then(|e| e.details).expect("details");
    assert!(details.contains("ALREADY_PROCESSED"), "{}", details);

    let mine = commands::get_student_leave_requests(student.as_str().to_string(), &state)
        .await
        .into_result()
        .expect("list");
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
async fn validation_preview_stores_nothing() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();

    let preview = commands::validate_leave_request(
        ValidateLeaveInput {
            student_id: student.as_str().to_string(),
            class_date: (Utc::now() + Duration::hours(72)).to_rfc3339(),
            leave_type: "travel".to_string(),
            reason: None,
            affected_classes: 1,
        },
        &state,
    )
    .await
    .into_result()
    .expect("preview");

    assert!(preview.is_valid);
    assert!(preview.auto_approval);
    assert_eq!(preview.refund_tier, "FULL");

    let stored = commands::get_student_leave_requests(student.as_str().to_string(), &state)
        .await
        .into_result()
        .expect("list");
    assert!(stored.is_empty());
}

#[tokio::test]
async fn owner_can_withdraw_a_pending_request() {
    let (state, _dir) = test_helpers::setup_state().await;
    let student = StudentId::new();
    let class = test_helpers::class_in_hours(30, 2);
    test_helpers::seed_class(&state, &class).await;
    let booking = test_helpers::seed_booking(&state, &student, &class).await;

    let me = Actor::student(student.as_str());
    let outcome = commands::submit_leave_request(sick_leave_for(&student, &booking), Some(&me), &state)
        .await
        .into_result()
        .expect("submitted");
    assert_eq!(outcome.request.status, "pending");

    let stranger = Actor::student("someone-else");
    let denied = commands::cancel_leave_request(
        outcome.request.id.clone(),
        student.as_str().to_string(),
        Some(&stranger),
        &state,
    )
    .await;
    assert_eq!(denied.error.expect("not the owner").code, "AUTH_ERROR");

    let cancelled = commands::cancel_leave_request(
        outcome.request.id,
        student.as_str().to_string(),
        Some(&me),
        &state,
    )
    .await
    .into_result()
    .expect("cancel");
    assert_eq!(cancelled.status, "cancelled");
}
