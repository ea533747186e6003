//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `banks` - Bank directory commands (list, add)
//! - `core` - Core commands (init, purge-sessions) and shared utilities (open_db)
//! - `reports` - Spend summary and payment calendar
//! - `serve` - Web server command
//! - `users` - User administration (promote)

pub mod banks;
pub mod core;
pub mod reports;
pub mod serve;
pub mod users;

// Re-export command functions for main.rs
pub use banks::*;
pub use core::*;
pub use reports::*;
pub use serve::*;
pub use users::*;

/// Truncate a string to at most `max` characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
