//! # Pathwise CLI Module
//!
//! ## Available Commands
//!
//! - `inspect` - Build the graph of a pathElements dump and print its devices
//! - `bandwidth` - Normalize two rates and check the change between them
//! - `config` - Print the effective engine configuration

mod commands;

use clap::{Parser, Subcommand};
use pathwise_core::PathwiseError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Pathwise - circuit reconciliation diagnostics
///
/// Offline views over inventory dumps and engine configuration.
#[derive(Parser, Debug)]
#[command(name = "pathwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the path graph of a pathElements dump
    Inspect {
        /// Path to the JSON dump
        #[arg(short, long)]
        file: PathBuf,

        /// Circuit id (defaults to the path name of the first element)
        #[arg(long)]
        circuit: Option<String>,
    },

    /// Check a bandwidth change
    Bandwidth {
        /// Current rate, e.g. "100 Mbps"
        #[arg(long)]
        current: String,

        /// Requested rate, e.g. "1 Gbps"
        #[arg(long)]
        requested: String,

        /// Duplex thresholds in Mbps (comma-separated)
        #[arg(long)]
        thresholds: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), PathwiseError> {
    let config = crate::config::load_config(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Inspect { file, circuit } => cmd_inspect(&file, circuit.as_deref(), json_mode),
        Commands::Bandwidth {
            current,
            requested,
            thresholds,
        } => cmd_bandwidth(&config, &current, &requested, thresholds.as_deref(), json_mode),
        Commands::Config => cmd_config(&config, json_mode),
    }
}
