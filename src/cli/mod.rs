//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for rowship using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// rowship - incremental CSV export over SFTP
#[derive(Parser, Debug)]
#[command(name = "rowship")]
#[command(version, about, long_about = None)]
#[command(author = "Rowship Contributors")]
pub struct Cli {
    /// Path to configuration file (environment variables only when omitted)
    #[arg(short, long, env = "ROWSHIP_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "ROWSHIP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export rows added since the last checkpoint and deliver them
    Export(commands::export::ExportArgs),

    /// Validate configuration
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the checkpoint and retained local artifacts
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
