mod adjustment_dto;
mod leave_dto;
mod ledger_dto;
mod makeup_dto;
mod preference_dto;

pub use adjustment_dto::*;
pub use leave_dto::*;
pub use ledger_dto::*;
pub use makeup_dto::*;
pub use preference_dto::*;
