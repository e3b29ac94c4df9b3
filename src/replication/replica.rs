//! Replica handles
//!
//! The coordinator does not own replica connections. The surrounding
//! replication engine registers a handle per replica feed; the coordinator
//! only counts and iterates them to make quorum decisions.

use std::fmt;
use std::sync::Arc;

use super::errors::{SemiSyncError, SemiSyncResult};
use super::position::ReplicaId;

/// What the coordinator needs from a replica feed.
pub trait ReplicaHandle: Send + Sync {
    /// Identity carried in this replica's acknowledgments.
    fn replica_id(&self) -> ReplicaId;

    /// Whether the feed currently has a live connection.
    fn is_connected(&self) -> bool;
}

impl fmt::Debug for dyn ReplicaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaHandle")
            .field("replica_id", &self.replica_id())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Shared replica handle as stored in the live set.
pub type SharedReplica = Arc<dyn ReplicaHandle>;

/// Reject a handle lacking an identity or a live connection.
///
/// Either condition alone is enough to reject.
pub fn validate_handle(handle: &dyn ReplicaHandle) -> SemiSyncResult<ReplicaId> {
    let replica_id = handle.replica_id();
    if replica_id.is_empty() {
        return Err(SemiSyncError::InvalidReplica {
            replica_id,
            reason: "replica id is the reserved empty id",
        });
    }
    if !handle.is_connected() {
        return Err(SemiSyncError::InvalidReplica {
            replica_id,
            reason: "connection is not active",
        });
    }
    Ok(replica_id)
}
