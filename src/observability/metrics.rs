//! Semi-sync counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Thread-safe, Relaxed ordering

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one coordinator.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Commit waits that actually parked
    commit_waits: AtomicU64,
    /// Commit waits that returned without parking
    commit_wait_skips: AtomicU64,
    /// Commit waits that hit the deadline
    wait_timeouts: AtomicU64,
    /// Acks delivered to the coordinator
    acks_received: AtomicU64,
    /// Positions reported as quorum-confirmed
    quorum_confirmations: AtomicU64,
    /// Sync -> Async transitions
    switch_offs: AtomicU64,
    /// Async -> Sync transitions
    switch_ons: AtomicU64,
    /// Wait nodes signalled
    nodes_signalled: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_commit_waits(&self) {
        self.commit_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commit_wait_skips(&self) {
        self.commit_wait_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_wait_timeouts(&self) {
        self.wait_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_acks_received(&self) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_quorum_confirmations(&self) {
        self.quorum_confirmations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_switch_offs(&self) {
        self.switch_offs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_switch_ons(&self) {
        self.switch_ons.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the number of nodes woken by one signal pass
    pub fn add_nodes_signalled(&self, count: u64) {
        self.nodes_signalled.fetch_add(count, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commit_waits: self.commit_waits.load(Ordering::Relaxed),
            commit_wait_skips: self.commit_wait_skips.load(Ordering::Relaxed),
            wait_timeouts: self.wait_timeouts.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            quorum_confirmations: self.quorum_confirmations.load(Ordering::Relaxed),
            switch_offs: self.switch_offs.load(Ordering::Relaxed),
            switch_ons: self.switch_ons.load(Ordering::Relaxed),
            nodes_signalled: self.nodes_signalled.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commit_waits: u64,
    pub commit_wait_skips: u64,
    pub wait_timeouts: u64,
    pub acks_received: u64,
    pub quorum_confirmations: u64,
    pub switch_offs: u64,
    pub switch_ons: u64,
    pub nodes_signalled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zeroed() {
        let metrics = MetricsRegistry::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = MetricsRegistry::new();
        metrics.increment_commit_waits();
        metrics.increment_commit_waits();
        metrics.increment_acks_received();
        metrics.add_nodes_signalled(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commit_waits, 2);
        assert_eq!(snapshot.acks_received, 1);
        assert_eq!(snapshot.nodes_signalled, 3);
        assert_eq!(snapshot.wait_timeouts, 0);
    }

    #[test]
    fn test_snapshot_serializes_as_object() {
        let metrics = MetricsRegistry::new();
        metrics.increment_switch_offs();

        let parsed = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(parsed["switch_offs"], 1);
        assert_eq!(parsed["switch_ons"], 0);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        m.increment_acks_received();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().acks_received, 1000);
    }
}
