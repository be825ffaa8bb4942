pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod state;

pub use error::{respond, respond_wrapped, ApiError, ApiResponse};
pub use state::AppState;
