//! SubTrack CLI - Self-hosted subscription tracker
//!
//! Usage:
//!   subtrack init                    Initialize database
//!   subtrack serve --port 3000       Start web server
//!   subtrack promote EMAIL           Make a user an admin
//!   subtrack summary EMAIL           Monthly spend for a user

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt, static_dir.as_deref())
                .await
        }
        Commands::Promote { email } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_promote(&db, &email)
        }
        Commands::Banks { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_banks_list(&db),
                Some(BanksAction::Add { name, icon }) => {
                    commands::cmd_banks_add(&db, &name, &icon)
                }
            }
        }
        Commands::Summary { email, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_summary(&db, &email, json)
        }
        Commands::Calendar { email, month } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_calendar(&db, &email, month.as_deref())
        }
        Commands::PurgeSessions => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_purge_sessions(&db)
        }
    }
}
