//! CLI command implementations
//!
//! `simulate` wires a real `SemiSyncMaster` to in-process replicas: one
//! thread per acknowledging replica, fed over a channel with every position
//! the primary commits. Stalled replicas are registered but never ack.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::observability::{Logger, MetricsSnapshot, Severity};
use crate::replication::{
    LogPosition, ReplicaHandle, ReplicaId, SemiSyncConfig, SemiSyncMaster, SemiSyncStatus,
    SharedReplica,
};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Bytes of WAL per simulated commit.
const ENTRY_SIZE: u64 = 128;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::CheckConfig { config } => check_config(&config),
        Command::Simulate {
            config,
            replicas,
            commits,
            stalled,
            trace,
        } => {
            if trace {
                Logger::set_min_severity(Severity::Trace);
            }
            simulate(
                &config,
                SimulationParams {
                    replicas,
                    commits,
                    stalled,
                },
            )
        }
    }
}

/// Load, validate and echo a configuration file
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = SemiSyncConfig::load(config_path)?;
    write_response(serde_json::to_value(&config)?)
}

/// Run a simulation from a configuration file and print the report
pub fn simulate(config_path: &Path, params: SimulationParams) -> CliResult<()> {
    let config = SemiSyncConfig::load(config_path)?;
    let report = run_simulation(&config, &params)?;
    write_response(serde_json::to_value(&report)?)
}

/// Shape of a simulation run
#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    pub replicas: u32,
    pub commits: u64,
    pub stalled: u32,
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub replicas: u32,
    pub stalled: u32,
    pub commits: u64,
    /// Commits that actually parked for acknowledgment
    pub waited: u64,
    pub status: SemiSyncStatus,
    pub metrics: MetricsSnapshot,
}

/// In-process replica feed
#[derive(Debug)]
struct SimReplica {
    id: ReplicaId,
    connected: AtomicBool,
}

impl SimReplica {
    fn new(id: u32) -> Self {
        Self {
            id: ReplicaId::new(id),
            connected: AtomicBool::new(true),
        }
    }
}

impl ReplicaHandle for SimReplica {
    fn replica_id(&self) -> ReplicaId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Drive a coordinator through `params.commits` commits.
pub fn run_simulation(
    config: &SemiSyncConfig,
    params: &SimulationParams,
) -> CliResult<SimulationReport> {
    if params.stalled > params.replicas {
        return Err(CliError::simulation_failed(format!(
            "stalled replicas ({}) exceed replicas ({})",
            params.stalled, params.replicas
        )));
    }

    if params.commits.checked_mul(ENTRY_SIZE).is_none() {
        return Err(CliError::simulation_failed(format!(
            "{} commits exceed the log position range",
            params.commits
        )));
    }

    let master = Arc::new(SemiSyncMaster::new());
    let feeds: Vec<Arc<SimReplica>> = (1..=params.replicas)
        .map(|id| Arc::new(SimReplica::new(id)))
        .collect();
    for feed in &feeds {
        master.add_replica(Arc::clone(feed) as SharedReplica)?;
    }
    // after registration, so a zero quorum resolves against the live set
    master.initialize(config)?;

    let mut senders = Vec::new();
    let mut workers = Vec::new();
    for feed in feeds.iter().skip(params.stalled as usize) {
        let (tx, rx) = mpsc::channel::<LogPosition>();
        let master = Arc::clone(&master);
        let replica_id = feed.replica_id();
        workers.push(thread::spawn(move || {
            for position in rx {
                master.handle_ack(replica_id, position);
            }
        }));
        senders.push(tx);
    }

    let started_at = Utc::now();
    let clock = Instant::now();
    let mut waited = 0;

    for i in 1..=params.commits {
        // cannot overflow: bounded by the check above
        let position = LogPosition::new(i * ENTRY_SIZE);
        for tx in &senders {
            tx.send(position)
                .map_err(|_| CliError::simulation_failed("replica thread exited early"))?;
        }
        if master.commit_wait(position) {
            waited += 1;
        }
    }

    drop(senders);
    for worker in workers {
        worker
            .join()
            .map_err(|_| CliError::simulation_failed("replica thread panicked"))?;
    }

    for feed in &feeds {
        feed.connected.store(false, Ordering::Relaxed);
    }

    Ok(SimulationReport {
        started_at,
        finished_at: Utc::now(),
        elapsed_ms: clock.elapsed().as_millis() as u64,
        replicas: params.replicas,
        stalled: params.stalled,
        commits: params.commits,
        waited,
        status: master.status(),
        metrics: master.metrics(),
    })
}
