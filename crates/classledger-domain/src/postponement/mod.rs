mod aggregate;
mod repository;

pub use aggregate::{ClassPostponement, PostponementStatus, STUDENT_LEAVE_REASON};
pub use repository::PostponementRepository;
