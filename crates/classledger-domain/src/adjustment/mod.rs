mod aggregate;
mod repository;

pub use aggregate::{AdjustmentType, ApprovalStatus, HourAdjustment};
pub use repository::AdjustmentRepository;
