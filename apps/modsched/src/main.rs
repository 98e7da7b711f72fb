//! # modsched - Staged Module Scheduler
//!
//! The main binary for modsched.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  apps/modsched (THE BINARY)                 │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │  │    CLI      │    │  Manifest   │    │   Scheduler    │   │
//! │  │   (clap)    │    │   (toml)    │    │    (tokio)     │   │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘   │
//! │         └──────────────────┼───────────────────┘            │
//! │                            ▼                                │
//! │                    ┌───────────────┐                        │
//! │                    │ modsched-core │                        │
//! │                    │  (THE LOGIC)  │                        │
//! │                    └───────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! modsched plan -m modules.toml
//! modsched graph -m modules.toml --json
//! modsched run -m modules.toml -v
//! ```

use clap::Parser;
use modsched::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // MODSCHED_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("MODSCHED_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "modsched=debug,modsched_core=debug"
    } else {
        "modsched=info,modsched_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

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

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
