//! Semi-sync error types
//!
//! Every failure is handled inside the coordinator: the caller gets a plain
//! `Err` and decides whether to log or retry. Nothing here is fatal; the
//! worst outcome of any error is degradation to asynchronous replication.

use thiserror::Error;

use super::config::MAX_QUORUM;
use super::position::ReplicaId;

/// Result type for semi-sync operations
pub type SemiSyncResult<T> = Result<T, SemiSyncError>;

/// Semi-sync coordinator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemiSyncError {
    /// Quorum size outside 1..=MAX_QUORUM
    #[error("invalid quorum size {0}: must be between 1 and {max}", max = MAX_QUORUM)]
    InvalidQuorum(u32),

    /// Replica handle has no identity or no live connection
    #[error("invalid replica handle {replica_id}: {reason}")]
    InvalidReplica {
        replica_id: ReplicaId,
        reason: &'static str,
    },

    /// Replica id is already part of the live set
    #[error("replica {0} is already registered")]
    DuplicateReplica(ReplicaId),

    /// Replica id is not part of the live set
    #[error("replica {0} is not registered")]
    UnknownReplica(ReplicaId),

    /// Configuration could not be parsed or failed validation
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(String),
}

impl SemiSyncError {
    /// Stable error code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            SemiSyncError::InvalidQuorum(_) => "SEMISYNC_INVALID_QUORUM",
            SemiSyncError::InvalidReplica { .. } => "SEMISYNC_INVALID_REPLICA",
            SemiSyncError::DuplicateReplica(_) => "SEMISYNC_DUPLICATE_REPLICA",
            SemiSyncError::UnknownReplica(_) => "SEMISYNC_UNKNOWN_REPLICA",
            SemiSyncError::Config(_) => "SEMISYNC_CONFIG_ERROR",
            SemiSyncError::Io(_) => "SEMISYNC_IO_ERROR",
        }
    }
}

impl From<serde_json::Error> for SemiSyncError {
    fn from(e: serde_json::Error) -> Self {
        SemiSyncError::Config(format!("invalid JSON: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            SemiSyncError::InvalidQuorum(0),
            SemiSyncError::InvalidReplica {
                replica_id: ReplicaId::EMPTY,
                reason: "empty id",
            },
            SemiSyncError::DuplicateReplica(ReplicaId::new(1)),
            SemiSyncError::UnknownReplica(ReplicaId::new(1)),
            SemiSyncError::Config("bad".into()),
            SemiSyncError::Io("gone".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(SemiSyncError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_names_replica() {
        let err = SemiSyncError::InvalidReplica {
            replica_id: ReplicaId::new(9),
            reason: "connection is not active",
        };
        assert_eq!(
            err.to_string(),
            "invalid replica handle 9: connection is not active"
        );
        assert_eq!(err.code(), "SEMISYNC_INVALID_REPLICA");
    }

    #[test]
    fn test_invalid_quorum_names_bounds() {
        let err = SemiSyncError::InvalidQuorum(0);
        assert_eq!(
            err.to_string(),
            "invalid quorum size 0: must be between 1 and 1024"
        );
    }

    #[test]
    fn test_json_error_is_config_error() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SemiSyncError = json.into();
        assert_eq!(err.code(), "SEMISYNC_CONFIG_ERROR");
    }
}
