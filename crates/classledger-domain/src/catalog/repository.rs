use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Booking, CandidateQuery, ScheduledClass, StudentProfile};
use crate::shared::{BookingId, ClassId, DomainError, StudentId};

/// Read-mostly access to classes, bookings and student profiles
#[async_trait]
pub trait ClassCatalogRepository: Send + Sync {
    async fn save_class(&self, class: &ScheduledClass) -> Result<(), DomainError>;

    async fn find_class(&self, id: &ClassId) -> Result<Option<ScheduledClass>, DomainError>;

    /// Classes starting in `[from, to)`, earliest first
    async fn list_classes_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScheduledClass>, DomainError>;

    /// Classes matching `query` that the student has not booked yet
    async fn find_candidate_classes(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<ScheduledClass>, DomainError>;

    /// Insert a booking and take a seat in its class.
    async fn create_booking(&self, booking: &Booking) -> Result<(), DomainError>;

    async fn find_booking(&self, id: &BookingId) -> Result<Option<Booking>, DomainError>;

    async fn save_profile(&self, profile: &StudentProfile) -> Result<(), DomainError>;

    async fn find_profile(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<StudentProfile>, DomainError>;
}
