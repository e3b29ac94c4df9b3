//! semisync - Semi-synchronous commit acknowledgment for a replicated WAL
//!
//! The primary's commit path calls `SemiSyncMaster::commit_wait`; the ack
//! delivery path calls `SemiSyncMaster::handle_ack`. Everything else is
//! lifecycle, membership and tuning.

pub mod cli;
pub mod observability;
pub mod replication;
