mod repository;
mod types;

pub use repository::ClassCatalogRepository;
pub use types::{
    Booking, BookingStatus, CandidateQuery, ClassStatus, ScheduledClass, StudentProfile,
};
