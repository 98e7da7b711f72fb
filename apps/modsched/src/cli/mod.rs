//! # modsched CLI Module
//!
//! This module implements the CLI interface for modsched.
//!
//! ## Available Commands
//!
//! - `plan` - Print the stage plan of a manifest
//! - `graph` - Print the resolved dependency graph
//! - `run` - Run the manifest through the scheduler pipeline

mod commands;

use clap::{Parser, Subcommand};
use modsched_core::SchedulerError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// modsched - staged module scheduler
///
/// Orders interdependent modules into load stages and runs them in order.
#[derive(Parser, Debug)]
#[command(name = "modsched")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the stage plan
    Plan {
        /// Path to the TOML manifest
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Print the dependency graph
    Graph {
        /// Path to the TOML manifest
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Run every stage
    Run {
        /// Path to the TOML manifest
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SchedulerError> {
    let json_mode = cli.json;

    match cli.command {
        Commands::Plan { manifest } => cmd_plan(&manifest, json_mode),
        Commands::Graph { manifest } => cmd_graph(&manifest, json_mode),
        Commands::Run { manifest } => cmd_run(&manifest, json_mode).await,
    }
}

// =============================================================================
// TESTS
// =============================================================================
