// Domain layer - hour ledger, leave and make-up business rules
// No dependencies on infrastructure or presentation layers

pub mod adjustment;
pub mod analytics;
pub mod catalog;
pub mod leave;
pub mod ledger;
pub mod makeup;
pub mod postponement;
pub mod scheduling;
pub mod shared;

// Re-exports for convenience
pub use shared::{Actor, DomainError, ErrorCode, StudentId};
