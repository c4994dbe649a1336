// --- File: crates/services/slotbook_cli/src/lib.rs ---
pub mod app_state;
pub mod commands;

pub use app_state::AppState;
pub use commands::{describe_event, run, CliError, Command};
