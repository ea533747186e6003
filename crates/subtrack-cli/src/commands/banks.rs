//! Bank directory commands

use anyhow::{Context, Result};
use subtrack_core::db::Database;
use subtrack_core::validation;

use super::truncate;

pub fn cmd_banks_list(db: &Database) -> Result<()> {
    let banks = db.list_banks()?;

    if banks.is_empty() {
        println!("No banks yet. Add one with:");
        println!("  subtrack banks add \"My Bank\" https://example.com/icon.png");
        return Ok(());
    }

    println!();
    println!("🏦 Banks");
    println!("   ─────────────────────────────────────────────────────────────");
    for bank in banks {
        println!(
            "   {:>4} │ {:24} │ {}",
            bank.id,
            truncate(&bank.name, 24),
            bank.icon_link
        );
    }

    Ok(())
}

pub fn cmd_banks_add(db: &Database, name: &str, icon: &str) -> Result<()> {
    let name = validation::validate_name(name, "Bank name")?;
    let icon = validation::required_text(icon, "Icon link")?;

    let id = db.create_bank(&name, &icon).context("Failed to add bank")?;
    db.log_audit("cli", "create", Some("bank"), Some(id), Some(&name))?;

    println!("✅ Added bank {} (ID: {})", name, id);
    Ok(())
}
