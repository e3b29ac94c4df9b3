//! CLI argument definitions using clap
//!
//! Commands:
//! - semisync check-config --config <path>
//! - semisync simulate --config <path> [--replicas N] [--commits N] [--stalled N]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// semisync - semi-synchronous commit acknowledgment coordinator
#[derive(Parser, Debug)]
#[command(name = "semisync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a configuration file, then print it
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./semisync.json")]
        config: PathBuf,
    },

    /// Drive a coordinator with in-process replicas and print a report
    Simulate {
        /// Path to configuration file
        #[arg(long, default_value = "./semisync.json")]
        config: PathBuf,

        /// Number of replicas to register
        #[arg(long, default_value_t = 3)]
        replicas: u32,

        /// Number of commits to wait on
        #[arg(long, default_value_t = 100)]
        commits: u64,

        /// How many of the replicas never acknowledge
        #[arg(long, default_value_t = 0)]
        stalled: u32,

        /// Also log per-ack trace lines
        #[arg(long)]
        trace: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
