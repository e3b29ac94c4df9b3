//! Semi-Sync Coordinator
//!
//! States:
//! - Disabled: commits never wait (initial state)
//! - Enabled/Async: commits never wait, acks are watched for recovery
//! - Enabled/Sync: commits park until a quorum acknowledges their position
//!
//! One mutex guards everything: wait registry, ack tracker, flags and the
//! live replica set. It is held for every operation except while a commit
//! thread is parked inside `commit_wait`, where the condvar wait releases it
//! so acks can be delivered.
//!
//! A parked commit returns on quorum signal, on a global wake (disable or
//! fallback), or after `COMMIT_WAIT_TIMEOUT`. There is no other cancellation.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};

use super::ack::{AckInfo, AckTracker};
use super::config::{SemiSyncConfig, MAX_QUORUM};
use super::errors::{SemiSyncError, SemiSyncResult};
use super::position::{LogPosition, ReplicaId};
use super::replica::{validate_handle, ReplicaHandle, SharedReplica};
use super::waiting::WaitingRegistry;

/// Hard deadline of a single commit wait.
pub const COMMIT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Externally visible coordinator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemiSyncMode {
    Disabled,
    Async,
    Sync,
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemiSyncStatus {
    pub mode: SemiSyncMode,
    pub quorum: u32,
    pub auto_fallback: bool,
    pub confirmed_position: LogPosition,
    pub max_awaited_position: LogPosition,
    pub live_replicas: usize,
    pub waiting_positions: Vec<LogPosition>,
    pub tracker_floor: AckInfo,
}

/// Why the coordinator fell back to async.
#[derive(Debug, Clone, Copy)]
enum FallbackReason {
    WaitTimeout,
    ReplicasBelowQuorum,
    Disabled,
}

impl FallbackReason {
    fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::WaitTimeout => "wait_timeout",
            FallbackReason::ReplicasBelowQuorum => "replicas_below_quorum",
            FallbackReason::Disabled => "disabled",
        }
    }
}

/// State guarded by the coordinator mutex.
#[derive(Debug)]
struct MasterState {
    enabled: bool,
    sync_on: bool,
    quorum: u32,
    auto_fallback: bool,
    /// Highest position reported satisfied. Reset only by fallback.
    confirmed: LogPosition,
    /// Highest position any commit has waited on. Reset only by fallback.
    max_awaited: LogPosition,
    /// Present exactly while enabled.
    registry: Option<WaitingRegistry>,
    tracker: AckTracker,
    replicas: Vec<SharedReplica>,
}

impl MasterState {
    fn new() -> Self {
        Self {
            enabled: false,
            sync_on: false,
            quorum: 1,
            auto_fallback: true,
            confirmed: LogPosition::ZERO,
            max_awaited: LogPosition::ZERO,
            registry: None,
            tracker: AckTracker::default(),
            replicas: Vec::new(),
        }
    }

    fn mode(&self) -> SemiSyncMode {
        match (self.enabled, self.sync_on) {
            (false, _) => SemiSyncMode::Disabled,
            (true, true) => SemiSyncMode::Sync,
            (true, false) => SemiSyncMode::Async,
        }
    }

    fn live_replicas(&self) -> usize {
        self.replicas.len()
    }

    /// Drop to async and release every parked commit.
    fn switch_off(&mut self, reason: FallbackReason, metrics: &MetricsRegistry) {
        if self.sync_on {
            metrics.increment_switch_offs();
        }
        self.sync_on = false;
        self.confirmed = LogPosition::ZERO;
        self.max_awaited = LogPosition::ZERO;

        let woken = self.registry.as_mut().map_or(0, WaitingRegistry::signal_all);
        metrics.add_nodes_signalled(woken as u64);

        log_event_with_fields(
            Event::SwitchedOff,
            &[
                ("live_replicas", &self.live_replicas().to_string()),
                ("quorum", &self.quorum.to_string()),
                ("reason", reason.as_str()),
                ("woken", &woken.to_string()),
            ],
        );
    }

    /// Resume sync only once replicas acknowledge past the last position a
    /// commit gave up on.
    fn try_switch_on(&mut self, position: LogPosition, metrics: &MetricsRegistry) {
        if self.enabled && position > self.max_awaited {
            self.sync_on = true;
            metrics.increment_switch_ons();
            log_event_with_fields(
                Event::SwitchedOn,
                &[
                    ("max_awaited", &self.max_awaited.to_string()),
                    ("position", &position.to_string()),
                ],
            );
        }
    }

    /// `position` is acknowledged by a quorum.
    fn report_reply(&mut self, position: LogPosition, metrics: &MetricsRegistry) {
        if !self.enabled {
            return;
        }
        if !self.sync_on {
            self.try_switch_on(position, metrics);
        }

        let woken = self
            .registry
            .as_mut()
            .map_or(0, |registry| registry.signal_up_to(position));
        metrics.add_nodes_signalled(woken as u64);
        metrics.increment_quorum_confirmations();

        self.confirmed = self.confirmed.max(position);

        log_event_with_fields(
            Event::AckConfirmed,
            &[
                ("confirmed", &self.confirmed.to_string()),
                ("position", &position.to_string()),
                ("woken", &woken.to_string()),
            ],
        );
    }
}

/// Commit-acknowledgment coordinator of a semi-synchronous primary.
///
/// Shared between every committing thread and the ack delivery path,
/// typically behind an `Arc`.
#[derive(Debug)]
pub struct SemiSyncMaster {
    state: Mutex<MasterState>,
    /// Held for the whole of `initialize`; taken before `state`.
    initialized: Mutex<bool>,
    metrics: MetricsRegistry,
}

impl Default for SemiSyncMaster {
    fn default() -> Self {
        Self::new()
    }
}

impl SemiSyncMaster {
    /// A disabled coordinator with quorum 1 and auto-fallback on.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MasterState::new()),
            initialized: Mutex::new(false),
            metrics: MetricsRegistry::new(),
        }
    }

    // Every transition is applied whole under the lock, so a poisoned guard
    // still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, MasterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the startup configuration. Only the first call has an effect.
    ///
    /// A quorum that cannot be applied is logged and the enable/disable step
    /// still runs. Concurrent callers block until the first one has applied
    /// the whole configuration.
    pub fn initialize(&self, config: &SemiSyncConfig) -> SemiSyncResult<()> {
        let mut initialized = self
            .initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *initialized {
            return Ok(());
        }
        *initialized = true;

        self.set_auto_fallback(config.auto_fallback);
        if let Err(e) = self.set_quorum(config.quorum) {
            log_event_with_fields(
                Event::InitFailed,
                &[("code", e.code()), ("error", &e.to_string())],
            );
        }

        if config.enabled {
            self.enable_master()
        } else {
            self.disable_master()
        }
    }

    /// Start coordinating commits.
    ///
    /// Starts in sync mode when enough replicas are live for the quorum,
    /// async otherwise. Calling it while enabled re-evaluates the mode.
    pub fn enable_master(&self) -> SemiSyncResult<()> {
        let mut state = self.lock();

        if !state.enabled {
            state.registry.get_or_insert_with(WaitingRegistry::new);
            state.enabled = true;
        }
        state.sync_on = state.live_replicas() >= state.quorum as usize;

        log_event_with_fields(
            Event::Enabled,
            &[
                ("live_replicas", &state.live_replicas().to_string()),
                ("mode", if state.sync_on { "sync" } else { "async" }),
                ("quorum", &state.quorum.to_string()),
            ],
        );
        Ok(())
    }

    /// Stop coordinating commits. Every parked commit is released.
    pub fn disable_master(&self) -> SemiSyncResult<()> {
        let mut state = self.lock();

        if state.enabled {
            state.switch_off(FallbackReason::Disabled, &self.metrics);
            state.registry = None;
            state.enabled = false;
            state.tracker.clear();
            log_event_with_fields(
                Event::Disabled,
                &[("live_replicas", &state.live_replicas().to_string())],
            );
        }
        Ok(())
    }

    /// Add a replica feed to the live set.
    pub fn add_replica(&self, handle: SharedReplica) -> SemiSyncResult<()> {
        let mut state = self.lock();

        let replica_id = validate_handle(handle.as_ref()).map_err(reject_replica)?;
        if state.replicas.iter().any(|r| r.replica_id() == replica_id) {
            return Err(reject_replica(SemiSyncError::DuplicateReplica(replica_id)));
        }

        state.replicas.push(handle);
        log_event_with_fields(
            Event::ReplicaAdded,
            &[
                ("live_replicas", &state.live_replicas().to_string()),
                ("replica_id", &replica_id.to_string()),
            ],
        );
        Ok(())
    }

    /// Remove a replica feed from the live set.
    ///
    /// Falls back to async when the live set drops below the quorum.
    pub fn remove_replica(&self, handle: &dyn ReplicaHandle) -> SemiSyncResult<()> {
        let mut state = self.lock();

        let replica_id = validate_handle(handle).map_err(reject_replica)?;
        let before = state.replicas.len();
        state.replicas.retain(|r| r.replica_id() != replica_id);
        if state.replicas.len() == before {
            return Err(reject_replica(SemiSyncError::UnknownReplica(replica_id)));
        }

        log_event_with_fields(
            Event::ReplicaRemoved,
            &[
                ("live_replicas", &state.live_replicas().to_string()),
                ("replica_id", &replica_id.to_string()),
            ],
        );

        if state.enabled && state.sync_on && state.live_replicas() < state.quorum as usize {
            state.switch_off(FallbackReason::ReplicasBelowQuorum, &self.metrics);
        }
        Ok(())
    }

    /// Block the calling commit until `position` is acknowledged by a
    /// quorum, the coordinator falls back, or the wait times out.
    ///
    /// Returns `false` when the commit did not need to wait at all
    /// (disabled, async, or already confirmed), `true` once it has waited,
    /// whatever ended the wait.
    pub fn commit_wait(&self, position: LogPosition) -> bool {
        let mut state = self.lock();

        if !state.enabled || !state.sync_on || position <= state.confirmed {
            self.metrics.increment_commit_wait_skips();
            return false;
        }

        let Some(registry) = state.registry.as_mut() else {
            log_event_with_fields(
                Event::WaitLost,
                &[("position", &position.to_string()), ("reason", "no_registry")],
            );
            return false;
        };

        // A duplicate is fine: threads awaiting one position share its node.
        registry.insert(position);
        let (node_position, handle, generation) = match registry.find_mut(position) {
            Some(node) => {
                node.add_waiter();
                (node.position(), node.handle(), node.generation())
            }
            None => {
                log_event_with_fields(
                    Event::WaitLost,
                    &[("position", &position.to_string()), ("reason", "not_found")],
                );
                return false;
            }
        };
        self.metrics.increment_commit_waits();

        let deadline = Instant::now() + COMMIT_WAIT_TIMEOUT;
        let mut timed_out = false;
        loop {
            let now = Instant::now();
            if now >= deadline {
                timed_out = true;
                break;
            }
            let (guard, _) = handle
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;

            // Woken by a signal, or our node is gone (disable). Anything
            // else is spurious: park again against the same deadline.
            let node = state
                .registry
                .as_ref()
                .and_then(|r| r.get(node_position))
                .filter(|n| n.owns_handle(&handle));
            match node {
                Some(n) if n.generation() == generation => continue,
                _ => break,
            }
        }

        let remaining = state
            .registry
            .as_mut()
            .and_then(|r| r.get_mut(node_position))
            .filter(|n| n.owns_handle(&handle))
            .map(|n| {
                n.remove_waiter();
                n.waiters()
            });

        if timed_out {
            self.metrics.increment_wait_timeouts();
            log_event_with_fields(
                Event::WaitTimeout,
                &[
                    ("position", &position.to_string()),
                    ("timeout_secs", &COMMIT_WAIT_TIMEOUT.as_secs().to_string()),
                ],
            );
            if state.enabled {
                state.switch_off(FallbackReason::WaitTimeout, &self.metrics);
            }
        }

        state.max_awaited = state.max_awaited.max(position);

        if remaining == Some(0) {
            if let Some(registry) = state.registry.as_mut() {
                registry.reap_up_to(position);
            }
        }

        true
    }

    /// Deliver one replica acknowledgment.
    pub fn handle_ack(&self, replica_id: ReplicaId, position: LogPosition) {
        let mut state = self.lock();
        self.metrics.increment_acks_received();

        if state.quorum == 1 {
            state.report_reply(position, &self.metrics);
        } else if let Some(ack) = state.tracker.insert(replica_id, position) {
            state.report_reply(ack.position, &self.metrics);
        }
    }

    /// Change the quorum size. Zero selects a majority of the live replicas.
    ///
    /// If the resized tracker already holds a quorum, that position is
    /// reported immediately.
    pub fn set_quorum(&self, quorum: u32) -> SemiSyncResult<()> {
        let mut state = self.lock();

        let effective = if quorum == 0 {
            (state.live_replicas() / 2 + 1) as u32
        } else {
            quorum
        };
        if effective > MAX_QUORUM {
            return Err(SemiSyncError::InvalidQuorum(effective));
        }

        let confirmed = state.tracker.resize(effective)?;
        if let Some(ack) = confirmed {
            state.report_reply(ack.position, &self.metrics);
        }
        state.quorum = effective;

        log_event_with_fields(
            Event::QuorumSet,
            &[
                ("live_replicas", &state.live_replicas().to_string()),
                ("quorum", &effective.to_string()),
                ("requested", &quorum.to_string()),
            ],
        );
        Ok(())
    }

    /// Record the auto-fallback setting.
    ///
    /// The setting is stored and reported only. A commit wait timeout always
    /// falls back to async.
    pub fn set_auto_fallback(&self, enabled: bool) {
        let mut state = self.lock();
        state.auto_fallback = enabled;
        log_event_with_fields(
            Event::AutoFallbackSet,
            &[("enabled", if enabled { "true" } else { "false" })],
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Whether commits currently wait for quorum.
    pub fn is_sync(&self) -> bool {
        self.lock().mode() == SemiSyncMode::Sync
    }

    pub fn mode(&self) -> SemiSyncMode {
        self.lock().mode()
    }

    pub fn quorum(&self) -> u32 {
        self.lock().quorum
    }

    pub fn auto_fallback(&self) -> bool {
        self.lock().auto_fallback
    }

    /// Highest position reported as quorum-acknowledged.
    pub fn confirmed_position(&self) -> LogPosition {
        self.lock().confirmed
    }

    pub fn live_replicas(&self) -> usize {
        self.lock().live_replicas()
    }

    /// Ids of the live replica set, in registration order.
    pub fn replica_ids(&self) -> Vec<ReplicaId> {
        self.lock().replicas.iter().map(|r| r.replica_id()).collect()
    }

    pub fn status(&self) -> SemiSyncStatus {
        let state = self.lock();
        SemiSyncStatus {
            mode: state.mode(),
            quorum: state.quorum,
            auto_fallback: state.auto_fallback,
            confirmed_position: state.confirmed,
            max_awaited_position: state.max_awaited,
            live_replicas: state.live_replicas(),
            waiting_positions: state
                .registry
                .as_ref()
                .map(WaitingRegistry::positions)
                .unwrap_or_default(),
            tracker_floor: state.tracker.floor(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn reject_replica(error: SemiSyncError) -> SemiSyncError {
    log_event_with_fields(
        Event::ReplicaRejected,
        &[("code", error.code()), ("error", &error.to_string())],
    );
    error
}
