//! User administration commands

use anyhow::{Context, Result};
use subtrack_core::db::Database;
use subtrack_core::models::{Role, User};

/// Look up a user by email, case-insensitively
pub fn find_user(db: &Database, email: &str) -> Result<User> {
    let email = email.trim().to_lowercase();
    db.get_user_by_email(&email)
        .context("Failed to look up user")?
        .ok_or_else(|| anyhow::anyhow!("User not found: {}", email))
}

pub fn cmd_promote(db: &Database, email: &str) -> Result<()> {
    let user = find_user(db, email)?;

    if user.is_admin() {
        println!("ℹ️  {} is already an admin", user.email);
        return Ok(());
    }

    db.set_user_role(user.id, Role::Admin)
        .context("Failed to update role")?;
    db.log_audit("cli", "promote", Some("user"), Some(user.id), Some(&user.email))?;

    println!("👑 {} is now an admin (ID: {})", user.email, user.id);
    Ok(())
}
