//! CLI interface for Baton
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for driving orchestrator runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Baton task orchestrator
///
/// Plans a goal into tasks, hands each task to a generic executor or a
/// specialist, and merges the results into one report.
#[derive(Parser, Debug)]
#[command(name = "baton")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a goal through the orchestrator
    Run {
        /// The goal to accomplish
        goal: String,

        /// Maximum task transitions before the report is forced
        #[arg(long, value_name = "N")]
        max_iterations: Option<usize>,
    },

    /// List registered specialists and their routing keywords
    Specialists,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run system diagnostics
    Doctor,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Store a provider API key in the OS keychain (read from stdin)
    SetKey {
        /// Provider name (openai, groq)
        provider: String,
    },
}
