//! Semi-synchronous replication coordinator
//!
//! A committing thread on the primary may block until a quorum of replicas
//! has acknowledged the WAL up to its commit position. This is acknowledgment
//! counting for a fixed primary, not consensus:
//! - No leader election, no voting
//! - Replicas are not checked for mutual consistency
//! - A stalled wait degrades to async replication instead of blocking
//! - Sync mode resumes on its own once replicas catch up
//!
//! # Components
//!
//! - `WaitingRegistry`: one suspension point per awaited log position
//! - `AckTracker`: highest position acknowledged by `quorum` replicas, O(quorum) space
//! - `SemiSyncMaster`: the state machine tying both together under one lock
//!
//! Ack decoding, replica connections and WAL storage live outside this
//! module and reach it only through `ReplicaHandle` and `handle_ack`.

mod ack;
mod config;
mod coordinator;
mod errors;
mod position;
mod replica;
mod waiting;

pub use ack::{AckInfo, AckTracker};
pub use config::{SemiSyncConfig, MAX_QUORUM};
pub use coordinator::{SemiSyncMaster, SemiSyncMode, SemiSyncStatus, COMMIT_WAIT_TIMEOUT};
pub use errors::{SemiSyncError, SemiSyncResult};
pub use position::{LogPosition, ReplicaId};
pub use replica::{validate_handle, ReplicaHandle, SharedReplica};
pub use waiting::{WaitNode, WaitingRegistry};
