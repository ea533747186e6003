//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SubTrack - Keep track of what your subscriptions cost
#[derive(Parser)]
#[command(name = "subtrack")]
#[command(about = "Self-hosted subscription tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "subtrack.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SUBTRACK_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory with the built web UI to serve at /
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Grant the admin role to an existing user
    Promote {
        /// Email of the user to promote
        email: String,
    },

    /// List banks, or add one
    Banks {
        #[command(subcommand)]
        action: Option<BanksAction>,
    },

    /// Show a user's monthly spend and breakdowns
    Summary {
        /// Email of the user
        email: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a user's projected charges for one month
    Calendar {
        /// Email of the user
        email: String,

        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Delete expired login sessions
    PurgeSessions,
}

#[derive(Subcommand)]
pub enum BanksAction {
    /// Add a bank users can attach cards to
    Add {
        /// Bank name
        name: String,

        /// Icon URL
        icon: String,
    },
}
