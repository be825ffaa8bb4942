#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use classledger_domain::catalog::{
    Booking, BookingStatus, ClassCatalogRepository, ClassStatus, ScheduledClass, StudentProfile,
};
use classledger_domain::shared::{Actor, ClassId, CourseId, StudentId, TeacherId};
use classledger_infrastructure::persistence::Database;
use classledger_lib::application::config::AppConfig;
use classledger_lib::application::dtos::{DeductHoursInput, PurchasePackageInput};
use classledger_lib::application::services::ConfigService;
use classledger_lib::presentation::bootstrap::build_app_state_with_database;
use classledger_lib::presentation::commands;
use classledger_lib::presentation::AppState;

pub const COURSE: &str = "english";

/// Fully wired state over a fresh in-memory store. Keep the `TempDir` alive
/// for as long as the state; the config file lives there.
pub async fn setup_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ConfigService::with_config(AppConfig::default(), dir.path().join("classledger.json"));
    let db = Database::in_memory().await.expect("open in-memory db");
    let state = build_app_state_with_database(db, config)
        .await
        .expect("build app state");
    (state, dir)
}

pub fn front_desk() -> Actor {
    Actor::staff("front-desk")
}

pub fn class_at(starts_at: DateTime<Utc>, level: i32) -> ScheduledClass {
    ScheduledClass {
        id: ClassId::new(),
        course_id: CourseId::from_string(COURSE),
        level,
        unit: 1,
        class_type: "group".to_string(),
        teacher_id: TeacherId::from_string("teacher-1"),
        starts_at,
        duration_hours: 1.5,
        capacity: 6,
        enrolled: 0,
        price_per_hour: 20.0,
        status: ClassStatus::Scheduled,
    }
}

pub fn class_in_hours(hours: i64, level: i32) -> ScheduledClass {
    class_at(Utc::now() + Duration::hours(hours), level)
}

pub async fn seed_profile(state: &AppState, student: &StudentId, level: i32, family: Option<&str>) {
    state
        .repositories
        .catalog
        .save_profile(&StudentProfile {
            student_id: student.clone(),
            course_id: CourseId::from_string(COURSE),
            level,
            family_id: family.map(str::to_string),
        })
        .await
        .expect("save profile");
}

pub async fn seed_class(state: &AppState, class: &ScheduledClass) {
    state
        .repositories
        .catalog
        .save_class(class)
        .await
        .expect("save class");
}

pub async fn seed_booking(state: &AppState, student: &StudentId, class: &ScheduledClass) -> Booking {
    let booking = Booking::new(student.clone(), class.id.clone(), BookingStatus::Booked);
    state
        .repositories
        .catalog
        .create_booking(&booking)
        .await
        .expect("create booking");
    booking
}

/// Book the class and charge `hours` for it through the deduction handler
pub async fn book_and_charge(
    state: &AppState,
    student: &StudentId,
    class: &ScheduledClass,
    hours: f64,
) -> Booking {
    let booking = seed_booking(state, student, class).await;
    let response = commands::deduct_hours(
        DeductHoursInput {
            student_id: student.as_str().to_string(),
            class_id: class.id.as_str().to_string(),
            booking_id: Some(booking.id.as_str().to_string()),
            hours,
            class_type: Some(class.class_type.clone()),
            deduction_rate: None,
        },
        Some(&front_desk()),
        state,
    )
    .await;
    assert!(response.success, "deduction failed: {:?}", response.error);
    booking
}

/// Paid package credited through the purchase handler
pub async fn buy_package(state: &AppState, student: &StudentId, hours: f64) {
    let response = commands::purchase_package(
        PurchasePackageInput {
            student_id: student.as_str().to_string(),
            package_name: format!("{} hour pack", hours),
            hours,
            amount_paid: hours * 20.0,
            valid_days: 90,
            payment_status: "completed".to_string(),
        },
        Some(&front_desk()),
        state,
    )
    .await;
    assert!(response.success, "purchase failed: {:?}", response.error);
}

pub async fn balance_of(state: &AppState, student: &StudentId) -> f64 {
    commands::get_balance(student.as_str().to_string(), state)
        .await
        .into_result()
        .expect("balance")
}
