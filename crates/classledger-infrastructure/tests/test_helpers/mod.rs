#![allow(dead_code)]

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

use classledger_domain::catalog::{
    Booking, BookingStatus, ClassCatalogRepository, ClassStatus, ScheduledClass, StudentProfile,
};
use classledger_domain::leave::{LeaveRequest, LeaveRequestRecord, LeaveStatus, LeaveType};
use classledger_domain::ledger::{HourPurchase, PaymentStatus, PurchaseRepository};
use classledger_domain::shared::{ClassId, CourseId, LeaveRequestId, StudentId, TeacherId};
use classledger_infrastructure::config::StoreConfig;
use classledger_infrastructure::persistence::repositories::{
    SqliteClassCatalogRepository, SqlitePurchaseRepository,
};
use classledger_infrastructure::persistence::Database;

pub const COURSE: &str = "english";

/// Fresh migrated in-memory store
pub async fn setup_in_memory_db() -> Arc<SqlitePool> {
    let db = Database::in_memory().await.expect("open in-memory db");
    db.run_migrations().await.expect("run migrations");
    Arc::new(db.pool().clone())
}

/// File-backed store with a real connection pool, for concurrency tests
pub async fn setup_file_db() -> (Arc<SqlitePool>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.db");
    let db = Database::connect(path.to_str().expect("utf8 path"), &StoreConfig::default())
        .await
        .expect("open file db");
    db.run_migrations().await.expect("run migrations");
    (Arc::new(db.pool().clone()), dir)
}

/// Completed package credited to the ledger
pub async fn buy_package(pool: &Arc<SqlitePool>, student: &StudentId, hours: f64) -> HourPurchase {
    let purchase = HourPurchase::new(
        student.clone(),
        format!("{} hour pack", hours),
        hours,
        hours * 20.0,
        90,
        PaymentStatus::Completed,
    )
    .expect("valid purchase");
    SqlitePurchaseRepository::new(pool.clone())
        .create(&purchase, "front-desk")
        .await
        .expect("create purchase");
    purchase
}

pub fn class_starting_in(days: i64, level: i32, capacity: u32, enrolled: u32) -> ScheduledClass {
    ScheduledClass {
        id: ClassId::new(),
        course_id: CourseId::from_string(COURSE),
        level,
        unit: 1,
        class_type: "group".to_string(),
        teacher_id: TeacherId::from_string("teacher-1"),
        starts_at: Utc::now() + Duration::days(days),
        duration_hours: 1.5,
        capacity,
        enrolled,
        price_per_hour: 20.0,
        status: ClassStatus::Scheduled,
    }
}

pub async fn seed_class(pool: &Arc<SqlitePool>, class: &ScheduledClass) {
    SqliteClassCatalogRepository::new(pool.clone())
        .save_class(class)
        .await
        .expect("save class");
}

pub async fn seed_profile(pool: &Arc<SqlitePool>, student: &StudentId, level: i32, family: Option<&str>) {
    SqliteClassCatalogRepository::new(pool.clone())
        .save_profile(&StudentProfile {
            student_id: student.clone(),
            course_id: CourseId::from_string(COURSE),
            level,
            family_id: family.map(str::to_string),
        })
        .await
        .expect("save profile");
}

pub async fn seed_booking(
    pool: &Arc<SqlitePool>,
    student: &StudentId,
    class: &ScheduledClass,
) -> Booking {
    let booking = Booking::new(student.clone(), class.id.clone(), BookingStatus::Booked);
    SqliteClassCatalogRepository::new(pool.clone())
        .create_booking(&booking)
        .await
        .expect("create booking");
    booking
}

/// Leave request in the given state for an existing booking, 100% refundable
pub fn leave_for(booking: &Booking, class: &ScheduledClass, status: LeaveStatus) -> LeaveRequest {
    let now = Utc::now();
    LeaveRequest::restore(LeaveRequestRecord {
        id: LeaveRequestId::new(),
        student_id: booking.student_id.clone(),
        class_id: Some(class.id.clone()),
        booking_id: Some(booking.id.clone()),
        class_date: class.starts_at,
        leave_type: LeaveType::Personal,
        reason: Some("Family trip".to_string()),
        hours_before_class: (class.starts_at - now).num_hours() as f64,
        meets_48_hour_rule: true,
        status,
        class_hours: class.duration_hours,
        refund_percentage: 100.0,
        hours_to_refund: class.duration_hours,
        refund_processed: false,
        auto_approved: status == LeaveStatus::Approved,
        affected_classes: 1,
        reviewed_by: None,
        review_notes: None,
        submitted_at: now,
        reviewed_at: None,
    })
}
