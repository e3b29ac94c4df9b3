//! Observable semi-sync events
//!
//! Events are explicit and typed; each maps to a stable log name and a
//! default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events of the semi-sync coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Semi-sync enabled on the primary
    Enabled,
    /// Semi-sync disabled on the primary
    Disabled,
    /// Initialization could not apply the configured quorum
    InitFailed,

    // Mode transitions
    /// Fell back to asynchronous replication
    SwitchedOff,
    /// Replicas caught up, synchronous replication resumed
    SwitchedOn,

    // Membership
    /// Replica joined the live set
    ReplicaAdded,
    /// Replica left the live set
    ReplicaRemoved,
    /// Replica handle rejected
    ReplicaRejected,

    // Settings
    /// Quorum size changed
    QuorumSet,
    /// Auto-fallback toggled
    AutoFallbackSet,

    // Commit path
    /// A second wait node was requested for an awaited position
    DuplicateWait,
    /// A just-registered wait position could not be found
    WaitLost,
    /// A commit wait hit its deadline
    WaitTimeout,

    // Ack path
    /// An acknowledged position reached quorum
    AckConfirmed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Enabled => "SEMISYNC_ENABLED",
            Event::Disabled => "SEMISYNC_DISABLED",
            Event::InitFailed => "SEMISYNC_INIT_FAILED",
            Event::SwitchedOff => "SEMISYNC_SWITCHED_OFF",
            Event::SwitchedOn => "SEMISYNC_SWITCHED_ON",
            Event::ReplicaAdded => "SEMISYNC_REPLICA_ADDED",
            Event::ReplicaRemoved => "SEMISYNC_REPLICA_REMOVED",
            Event::ReplicaRejected => "SEMISYNC_REPLICA_REJECTED",
            Event::QuorumSet => "SEMISYNC_QUORUM_SET",
            Event::AutoFallbackSet => "SEMISYNC_AUTO_FALLBACK_SET",
            Event::DuplicateWait => "SEMISYNC_DUPLICATE_WAIT",
            Event::WaitLost => "SEMISYNC_WAIT_LOST",
            Event::WaitTimeout => "SEMISYNC_WAIT_TIMEOUT",
            Event::AckConfirmed => "SEMISYNC_ACK_CONFIRMED",
        }
    }

    /// Default severity this event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::AckConfirmed => Severity::Trace,
            Event::DuplicateWait | Event::SwitchedOff => Severity::Warn,
            Event::InitFailed
            | Event::ReplicaRejected
            | Event::WaitLost
            | Event::WaitTimeout => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
