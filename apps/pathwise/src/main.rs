//! # Pathwise - Circuit Diagnostics
//!
//! The diagnostics binary for the Pathwise circuit engine.
//!
//! ## Usage
//!
//! ```bash
//! # Build and print the topology of a pathElements dump
//! pathwise inspect -f elements.json --circuit 51.L1XX.004512..CHTR
//!
//! # Check a bandwidth change
//! pathwise bandwidth --current "100 Mbps" --requested "1 Gbps"
//!
//! # Print the effective configuration
//! pathwise config --config pathwise.toml
//! ```

use clap::Parser;
use pathwise::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // PATHWISE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("PATHWISE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pathwise=info,pathwise_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!(code = e.code(), severity = %e.severity(), "Error: {}", e);
        std::process::exit(1);
    }
}
