use chrono::{Duration, Utc};

use classledger_domain::catalog::{
    BookingStatus, CandidateQuery, ClassCatalogRepository, StudentProfile,
};
use classledger_domain::leave::{LeaveRequestRepository, LeaveStatus};
use classledger_domain::ledger::{LedgerRepository, TransactionType};
use classledger_domain::makeup::{
    MakeUpClass, MakeUpRepository, MakeUpStatus, ScoringContext, SuggestionConfig,
    SuggestionScorer,
};
use classledger_domain::postponement::{
    ClassPostponement, PostponementRepository, PostponementStatus,
};
use classledger_domain::scheduling::StudentSchedulePreferences;
use classledger_domain::shared::{CourseId, DomainError, StudentId, SuggestionId};
use classledger_infrastructure::persistence::repositories::{
    SqliteClassCatalogRepository, SqliteLeaveRequestRepository, SqliteLedgerRepository,
    SqliteMakeUpRepository, SqlitePostponementRepository,
};

mod test_helpers;

#[tokio::test]
async fn leave_resolution_and_refund_happen_once() {
    let pool = test_helpers::setup_in_memory_db().await;
    let leaves = SqliteLeaveRequestRepository::new(pool.clone());
    let ledger = SqliteLedgerRepository::new(pool.clone());

    let student = StudentId::new();
    test_helpers::buy_package(&pool, &student, 5.0).await;
    let class = test_helpers::class_starting_in(5, 2, 6, 0);
    test_helpers::seed_class(&pool, &class).await;
    let booking = test_helpers::seed_booking(&pool, &student, &class).await;

    let leave = test_helpers::leave_for(&booking, &class, LeaveStatus::Pending);
    leaves.create(&leave).await.unwrap();
    assert_eq!(leaves.list_pending().await.unwrap().len(), 1);

    // Refunds need an approved request
    let err = leaves
        .process_refund(leave.id(), "admin")
        .await
        .expect_err("pending");
    assert!(matches!(err, DomainError::InvalidState(_)));

    let approved = leaves
        .resolve(leave.id(), LeaveStatus::Approved, "admin", Some("ok".into()))
        .await
        .expect("approve");
    assert_eq!(approved.status(), LeaveStatus::Approved);
    assert_eq!(approved.reviewed_by(), Some("admin"));

    let err = leaves
        .resolve(leave.id(), LeaveStatus::Rejected, "admin", None)
        .await
        .expect_err("already resolved");
    assert!(matches!(err, DomainError::AlreadyProcessed(_)));

    let refund = leaves.process_refund(leave.id(), "admin").await.expect("refund");
    assert_eq!(refund.transaction_type(), TransactionType::Refund);
    assert_eq!(refund.hours_amount(), 1.5);
    assert_eq!(refund.booking_id(), Some(&booking.id));
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 6.5);

    let err = leaves
        .process_refund(leave.id(), "admin")
        .await
        .expect_err("second refund");
    assert!(matches!(err, DomainError::AlreadyProcessed(_)));
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 6.5);

    let stored = leaves.find_by_id(leave.id()).await.unwrap().unwrap();
    assert!(stored.refund_processed());
}

#[tokio::test]
async fn cancelled_requests_do_not_count_toward_frequency() {
    let pool = test_helpers::setup_in_memory_db().await;
    let leaves = SqliteLeaveRequestRepository::new(pool.clone());

    let student = StudentId::new();
    let class = test_helpers::class_starting_in(5, 2, 6, 0);
    test_helpers::seed_class(&pool, &class).await;
    let booking = test_helpers::seed_booking(&pool, &student, &class).await;
    let later = test_helpers::class_starting_in(6, 2, 6, 0);
    test_helpers::seed_class(&pool, &later).await;
    let later_booking = test_helpers::seed_booking(&pool, &student, &later).await;

    let kept = test_helpers::leave_for(&booking, &class, LeaveStatus::Pending);
    let withdrawn = test_helpers::leave_for(&later_booking, &later, LeaveStatus::Pending);
    leaves.create(&kept).await.unwrap();
    leaves.create(&withdrawn).await.unwrap();

    let err = leaves
        .resolve(withdrawn.id(), LeaveStatus::Cancelled, "someone-else", None)
        .await
        .expect_err("not the owner");
    assert!(matches!(err, DomainError::Auth(_)));

    leaves
        .resolve(withdrawn.id(), LeaveStatus::Cancelled, student.as_str(), None)
        .await
        .expect("owner cancels");

    let since = Utc::now() - Duration::days(30);
    assert_eq!(leaves.count_since(&student, since).await.unwrap(), 1);
    assert_eq!(leaves.list_for_student(&student).await.unwrap().len(), 2);
}

#[tokio::test]
async fn booking_holds_one_live_leave_request() {
    let pool = test_helpers::setup_in_memory_db().await;
    let leaves = SqliteLeaveRequestRepository::new(pool.clone());

    let student = StudentId::new();
    let class = test_helpers::class_starting_in(5, 2, 6, 0);
    test_helpers::seed_class(&pool, &class).await;
    let booking = test_helpers::seed_booking(&pool, &student, &class).await;

    let first = test_helpers::leave_for(&booking, &class, LeaveStatus::Approved);
    leaves.create(&first).await.unwrap();

    let again = test_helpers::leave_for(&booking, &class, LeaveStatus::Pending);
    let err = leaves.create(&again).await.expect_err("booking already on leave");
    assert!(matches!(err, DomainError::AlreadyProcessed(_)));

    // A withdrawn request frees the booking
    let other_class = test_helpers::class_starting_in(7, 2, 6, 0);
    test_helpers::seed_class(&pool, &other_class).await;
    let other = test_helpers::seed_booking(&pool, &student, &other_class).await;
    let withdrawn = test_helpers::leave_for(&other, &other_class, LeaveStatus::Pending);
    leaves.create(&withdrawn).await.unwrap();
    leaves
        .resolve(withdrawn.id(), LeaveStatus::Cancelled, student.as_str(), None)
        .await
        .unwrap();
    let retry = test_helpers::leave_for(&other, &other_class, LeaveStatus::Pending);
    leaves.create(&retry).await.expect("cancelled request no longer blocks");
}

#[tokio::test]
async fn booking_holds_one_active_postponement() {
    let pool = test_helpers::setup_in_memory_db().await;
    let leaves = SqliteLeaveRequestRepository::new(pool.clone());
    let postponements = SqlitePostponementRepository::new(pool.clone());
    let catalog = SqliteClassCatalogRepository::new(pool.clone());

    let student = StudentId::new();
    let class = test_helpers::class_starting_in(5, 2, 6, 0);
    test_helpers::seed_class(&pool, &class).await;
    let booking = test_helpers::seed_booking(&pool, &student, &class).await;

    let leave = test_helpers::leave_for(&booking, &class, LeaveStatus::Approved);
    leaves.create(&leave).await.unwrap();

    let postponement = ClassPostponement::from_leave(&leave).unwrap();
    postponements.create(&postponement).await.expect("postpone");

    let stored_booking = catalog.find_booking(&booking.id).await.unwrap().unwrap();
    assert_eq!(stored_booking.status, BookingStatus::Postponed);

    let duplicate = ClassPostponement::from_leave(&leave).unwrap();
    let err = postponements
        .create(&duplicate)
        .await
        .expect_err("second active postponement");
    assert!(matches!(err, DomainError::AlreadyProcessed(_)));

    let found = postponements
        .find_by_leave_request(leave.id())
        .await
        .unwrap()
        .expect("linked to leave");
    assert_eq!(found.id(), postponement.id());

    let err = postponements
        .transition(postponement.id(), PostponementStatus::Completed)
        .await
        .expect_err("pending cannot complete");
    assert!(matches!(err, DomainError::InvalidState(_)));

    let confirmed = postponements
        .transition(postponement.id(), PostponementStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status(), PostponementStatus::Confirmed);
}

#[tokio::test]
async fn make_up_flow_books_the_selected_class() {
    let pool = test_helpers::setup_in_memory_db().await;
    let leaves = SqliteLeaveRequestRepository::new(pool.clone());
    let postponements = SqlitePostponementRepository::new(pool.clone());
    let catalog = SqliteClassCatalogRepository::new(pool.clone());
    let make_ups = SqliteMakeUpRepository::new(pool.clone());

    let student = StudentId::new();
    test_helpers::seed_profile(&pool, &student, 2, None).await;
    let original = test_helpers::class_starting_in(3, 2, 6, 0);
    let nearby = test_helpers::class_starting_in(6, 2, 6, 5);
    let full = test_helpers::class_starting_in(7, 2, 4, 4);
    let too_hard = test_helpers::class_starting_in(8, 4, 6, 0);
    for class in [&original, &nearby, &full, &too_hard] {
        test_helpers::seed_class(&pool, class).await;
    }
    let booking = test_helpers::seed_booking(&pool, &student, &original).await;

    let leave = test_helpers::leave_for(&booking, &original, LeaveStatus::Approved);
    leaves.create(&leave).await.unwrap();
    let postponement = ClassPostponement::from_leave(&leave).unwrap();
    postponements.create(&postponement).await.unwrap();

    let profile: StudentProfile = catalog.find_profile(&student).await.unwrap().unwrap();
    assert_eq!(profile.course_id, CourseId::from_string(test_helpers::COURSE));
    let now = Utc::now();
    let query = CandidateQuery::for_profile(&profile, Some(original.id.clone()), now, 14);
    let candidates = catalog.find_candidate_classes(&query).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, nearby.id);

    let preferences = StudentSchedulePreferences::default_for(student.clone());
    let scorer = SuggestionScorer::new(&SuggestionConfig::default()).unwrap();
    let ctx = ScoringContext {
        profile: &profile,
        preferences: &preferences,
        original: Some(&original),
        now,
    };
    let suggestions = scorer.suggest(&candidates, &ctx);

    let first = MakeUpClass::suggested(&postponement, suggestions.clone(), now, 7);
    let stored = make_ups.upsert_suggestions(&first).await.unwrap();

    // Regenerating keeps one record per postponement
    let again = MakeUpClass::suggested(&postponement, suggestions.clone(), now, 7);
    let regenerated = make_ups.upsert_suggestions(&again).await.unwrap();
    assert_eq!(regenerated.id(), stored.id());
    assert_eq!(make_ups.list_for_student(&student).await.unwrap().len(), 1);

    let suggestion_id = regenerated.alternative_suggestions()[0].id.clone();
    let selected = make_ups
        .select_suggestion(stored.id(), &suggestion_id, &student, Utc::now())
        .await
        .expect("select");
    assert_eq!(selected.status(), MakeUpStatus::StudentSelected);

    let err = make_ups
        .upsert_suggestions(&again)
        .await
        .expect_err("suggestions locked after selection");
    assert!(matches!(err, DomainError::AlreadyProcessed(_)));

    let err = make_ups.schedule(stored.id()).await.expect_err("not approved");
    assert!(matches!(err, DomainError::InvalidState(_)));

    make_ups.approve(stored.id(), Some("fine".into())).await.unwrap();
    let scheduled = make_ups.schedule(stored.id()).await.expect("schedule");
    assert_eq!(scheduled.status(), MakeUpStatus::Scheduled);

    let make_up_booking = catalog
        .find_booking(scheduled.scheduled_booking_id().expect("booking id"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(make_up_booking.status, BookingStatus::MakeUp);
    assert_eq!(make_up_booking.class_id, nearby.id);

    let class = catalog.find_class(&nearby.id).await.unwrap().unwrap();
    assert_eq!(class.enrolled, 6);

    let moved = postponements.find_by_id(postponement.id()).await.unwrap().unwrap();
    assert_eq!(moved.status(), PostponementStatus::MakeUpScheduled);

    // The class is now full, so nothing else can be offered from it
    let remaining = catalog.find_candidate_classes(&query).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn late_selection_persists_expiry() {
    let pool = test_helpers::setup_in_memory_db().await;
    let leaves = SqliteLeaveRequestRepository::new(pool.clone());
    let postponements = SqlitePostponementRepository::new(pool.clone());
    let make_ups = SqliteMakeUpRepository::new(pool.clone());

    let student = StudentId::new();
    let class = test_helpers::class_starting_in(3, 2, 6, 0);
    test_helpers::seed_class(&pool, &class).await;
    let booking = test_helpers::seed_booking(&pool, &student, &class).await;
    let leave = test_helpers::leave_for(&booking, &class, LeaveStatus::Approved);
    leaves.create(&leave).await.unwrap();
    let postponement = ClassPostponement::from_leave(&leave).unwrap();
    postponements.create(&postponement).await.unwrap();

    let now = Utc::now();
    let make_up = make_ups
        .upsert_suggestions(&MakeUpClass::suggested(&postponement, Vec::new(), now, 7))
        .await
        .unwrap();

    let late = now + Duration::days(8);
    let err = make_ups
        .select_suggestion(
            make_up.id(),
            &SuggestionId::new(),
            &student,
            late,
        )
        .await
        .expect_err("deadline passed");
    assert!(matches!(err, DomainError::InvalidState(_)));

    let stored = make_ups.find_by_id(make_up.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), MakeUpStatus::Expired);
    assert_eq!(make_ups.expire_overdue(late).await.unwrap(), 0);
}

#[tokio::test]
async fn sweep_expires_only_overdue_records() {
    let pool = test_helpers::setup_in_memory_db().await;
    let leaves = SqliteLeaveRequestRepository::new(pool.clone());
    let postponements = SqlitePostponementRepository::new(pool.clone());
    let make_ups = SqliteMakeUpRepository::new(pool.clone());

    let student = StudentId::new();
    let now = Utc::now();
    let mut ids = Vec::new();
    for deadline_days in [1, 10] {
        let class = test_helpers::class_starting_in(3, 2, 6, 0);
        test_helpers::seed_class(&pool, &class).await;
        let booking = test_helpers::seed_booking(&pool, &student, &class).await;
        let leave = test_helpers::leave_for(&booking, &class, LeaveStatus::Approved);
        leaves.create(&leave).await.unwrap();
        let postponement = ClassPostponement::from_leave(&leave).unwrap();
        postponements.create(&postponement).await.unwrap();
        let stored = make_ups
            .upsert_suggestions(&MakeUpClass::suggested(&postponement, Vec::new(), now, deadline_days))
            .await
            .unwrap();
        ids.push(stored.id().clone());
    }

    let expired = make_ups.expire_overdue(now + Duration::days(2)).await.unwrap();
    assert_eq!(expired, 1);
    let first = make_ups.find_by_id(&ids[0]).await.unwrap().unwrap();
    let second = make_ups.find_by_id(&ids[1]).await.unwrap().unwrap();
    assert_eq!(first.status(), MakeUpStatus::Expired);
    assert_eq!(second.status(), MakeUpStatus::Suggested);
}
