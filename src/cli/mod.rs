//! CLI module for semisync
//!
//! Provides command-line interface for:
//! - check-config: Load and validate a configuration file
//! - simulate: Drive a coordinator with in-process replicas

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    check_config, run, run_command, run_simulation, simulate, SimulationParams, SimulationReport,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
