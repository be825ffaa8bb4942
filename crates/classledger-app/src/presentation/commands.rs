// Module declarations
pub mod adjustment;
pub mod analytics;
pub mod config;
pub mod leave;
pub mod ledger;
pub mod makeup;
pub mod preferences;

// Re-export all commands for easy access
pub use adjustment::*;
pub use analytics::*;
pub use config::*;
pub use leave::*;
pub use ledger::*;
pub use makeup::*;
pub use preferences::*;

use classledger_domain::shared::Actor;

/// Recorded as `created_by` on ledger writes; services overwrite it with the
/// checked actor.
fn actor_id(actor: Option<&Actor>) -> String {
    actor.map(|a| a.user_id.clone()).unwrap_or_default()
}
