//! Shared fixtures for coordinator integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use semisync::replication::{
    LogPosition, ReplicaHandle, ReplicaId, SemiSyncMaster, SharedReplica,
};

/// Replica feed whose connection state a test can flip.
#[derive(Debug)]
pub struct TestReplica {
    id: ReplicaId,
    connected: AtomicBool,
}

impl TestReplica {
    pub fn new(id: u32) -> Arc<Self> {
        Arc::new(Self {
            id: ReplicaId::new(id),
            connected: AtomicBool::new(true),
        })
    }

    pub fn id(&self) -> ReplicaId {
        self.id
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl ReplicaHandle for TestReplica {
    fn replica_id(&self) -> ReplicaId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

pub fn shared(replica: &Arc<TestReplica>) -> SharedReplica {
    Arc::clone(replica) as SharedReplica
}

pub fn pos(value: u64) -> LogPosition {
    LogPosition::new(value)
}

/// Coordinator with `replicas` registered feeds (ids 1..=n), quorum set and
/// enabled.
pub fn enabled_master(replicas: u32, quorum: u32) -> (Arc<SemiSyncMaster>, Vec<Arc<TestReplica>>) {
    let master = Arc::new(SemiSyncMaster::new());
    let feeds: Vec<_> = (1..=replicas).map(TestReplica::new).collect();
    for feed in &feeds {
        master.add_replica(shared(feed)).unwrap();
    }
    master.set_quorum(quorum).unwrap();
    master.enable_master().unwrap();
    (master, feeds)
}

/// Poll until `positions` are all parked in the registry.
pub fn wait_for_parked(master: &SemiSyncMaster, positions: &[u64]) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let parked = master.status().waiting_positions;
        if positions.iter().all(|p| parked.contains(&pos(*p))) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "waiters never parked: want {:?}, have {:?}",
            positions,
            parked
        );
        thread::sleep(Duration::from_millis(5));
    }
}

/// Spawn a committing thread parked on `position`.
pub fn spawn_commit(
    master: &Arc<SemiSyncMaster>,
    position: u64,
) -> thread::JoinHandle<(bool, Duration)> {
    let master = Arc::clone(master);
    thread::spawn(move || {
        let start = Instant::now();
        let waited = master.commit_wait(pos(position));
        (waited, start.elapsed())
    })
}
