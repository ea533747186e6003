//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting SubTrack web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let config = subtrack_server::ServerConfig::from_env();

    match &config.admin_email {
        Some(email) => println!("   👑 Bootstrap admin: {}", email),
        None => println!(
            "   💡 Tip: Set {} to make that account an admin",
            subtrack_server::ADMIN_EMAIL_ENV
        ),
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {} ({})",
            config.allowed_origins.join(", "),
            subtrack_server::ALLOWED_ORIGINS_ENV
        );
    }
    if config.secure_cookies {
        println!("   🔒 Session cookies marked Secure");
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("Static directory path must be valid UTF-8"))
        .transpose()?;
    subtrack_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
