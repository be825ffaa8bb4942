// Infrastructure layer - SQLite ledger store, logging and store config
// Depends on domain layer, implements its repository traits

pub mod config;
pub mod logging;
pub mod persistence;
