// procwatch - live process table and kill escalation library

pub mod config;
pub mod engine;
pub mod killer;
pub mod monitor;
pub mod render;
pub mod table;

// Re-export commonly used types
pub use config::Config;
pub use engine::{Engine, Frame};
pub use table::{ProcessIdentity, ProcessRow, Snapshot};

/// Strip control characters from untrusted process names before logging
/// or displaying them, and cap the length so a hostile comm value cannot
/// flood the log.
pub fn sanitize_for_log(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).take(64).collect()
}
