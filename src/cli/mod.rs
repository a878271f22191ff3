//! CLI module - Command-line interface for paydash
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

pub use commands::{cmd_check_config, cmd_hash_password, cmd_init};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// paydash - Element Pay dashboard backend
/// Session auth, API-key management and proxy routes for the dashboard
#[derive(Parser)]
#[command(name = "paydash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a config file (overrides the default search path)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    #[command(alias = "daemon")]
    Serve,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load and validate the config, then print the effective upstreams
    #[command(alias = "check")]
    CheckConfig,

    /// Print an Argon2id hash for a password
    HashPassword {
        password: String,
    },
}
