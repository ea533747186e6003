//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_purge_sessions` - Drop expired login sessions

use std::path::Path;

use anyhow::{Context, Result};
use subtrack_core::db::Database;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let users = db.count_users().context("Failed to count users")?;
    let banks = db.list_banks().context("Failed to list banks")?.len();
    println!("   Users: {}, banks: {}", users, banks);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add banks: subtrack banks add \"My Bank\" https://example.com/icon.png");
    println!("  2. Start web UI: subtrack serve");
    println!("  3. Register, then: subtrack promote you@example.com");

    Ok(())
}

pub fn cmd_purge_sessions(db: &Database) -> Result<()> {
    let purged = db
        .purge_expired_sessions()
        .context("Failed to purge sessions")?;
    println!("🧹 Removed {} expired session(s)", purged);
    Ok(())
}
