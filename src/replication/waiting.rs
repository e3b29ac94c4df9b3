//! Waiting Registry
//!
//! Ordered set of suspension points, one per distinct log position that at
//! least one committing thread is waiting on. All nodes are owned by value in
//! a `BTreeMap`; callers only ever hold a clone of a node's `Condvar` while
//! parked, never the node itself.
//!
//! The registry does no locking of its own. It lives inside the coordinator's
//! mutex, and every `Condvar` handed out here must be waited on with that
//! same mutex's guard.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar};

use crate::observability::{log_event_with_fields, Event};

use super::position::LogPosition;

/// Suspension point shared by every thread awaiting the same position.
#[derive(Debug)]
pub struct WaitNode {
    position: LogPosition,
    waiters: usize,
    /// Bumped on every wake so parked threads can tell a signal from a
    /// spurious wakeup.
    generation: u64,
    cond: Arc<Condvar>,
}

impl WaitNode {
    fn new(position: LogPosition) -> Self {
        Self {
            position,
            waiters: 0,
            generation: 0,
            cond: Arc::new(Condvar::new()),
        }
    }

    pub fn position(&self) -> LogPosition {
        self.position
    }

    /// Number of threads currently parked on this node.
    pub fn waiters(&self) -> usize {
        self.waiters
    }

    /// Number of wakes delivered to this node so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The suspension handle. Parked threads keep their own clone.
    pub fn handle(&self) -> Arc<Condvar> {
        Arc::clone(&self.cond)
    }

    /// Whether `handle` was taken from this very node.
    pub fn owns_handle(&self, handle: &Arc<Condvar>) -> bool {
        Arc::ptr_eq(&self.cond, handle)
    }

    pub fn add_waiter(&mut self) {
        self.waiters += 1;
    }

    pub fn remove_waiter(&mut self) {
        debug_assert!(self.waiters > 0, "waiter count underflow");
        self.waiters = self.waiters.saturating_sub(1);
    }

    fn wake(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.cond.notify_all();
    }
}

/// Ordered registry of wait nodes keyed by log position.
#[derive(Debug, Default)]
pub struct WaitingRegistry {
    nodes: BTreeMap<LogPosition, WaitNode>,
}

impl WaitingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registered positions in ascending order.
    pub fn positions(&self) -> Vec<LogPosition> {
        self.nodes.keys().copied().collect()
    }

    /// Waiter count of the node at exactly `position`.
    pub fn waiters_at(&self, position: LogPosition) -> Option<usize> {
        self.nodes.get(&position).map(WaitNode::waiters)
    }

    /// Register a node for `position`.
    ///
    /// Returns `false` if a node for `position` already exists; the existing
    /// node is kept and callers simply share it.
    pub fn insert(&mut self, position: LogPosition) -> bool {
        if self.nodes.contains_key(&position) {
            log_event_with_fields(
                Event::DuplicateWait,
                &[("position", &position.to_string())],
            );
            return false;
        }
        self.nodes.insert(position, WaitNode::new(position));
        true
    }

    /// The node with the smallest position `>= position`.
    ///
    /// Falls back to the lowest registered node when every node is below
    /// `position`. Callers insert before finding, so the fallback only
    /// triggers if that contract is broken.
    pub fn find(&self, position: LogPosition) -> Option<&WaitNode> {
        self.nodes
            .range(position..)
            .next()
            .map(|(_, node)| node)
            .or_else(|| self.nodes.values().next())
    }

    /// Mutable variant of [`find`](Self::find), same fallback.
    pub fn find_mut(&mut self, position: LogPosition) -> Option<&mut WaitNode> {
        let key = self
            .nodes
            .range(position..)
            .next()
            .map(|(k, _)| *k)
            .or_else(|| self.nodes.keys().next().copied())?;
        self.nodes.get_mut(&key)
    }

    /// The node at exactly `position`.
    pub fn get(&self, position: LogPosition) -> Option<&WaitNode> {
        self.nodes.get(&position)
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, position: LogPosition) -> Option<&mut WaitNode> {
        self.nodes.get_mut(&position)
    }

    /// Wake every node at or below `position`, ascending. Returns the count.
    pub fn signal_up_to(&mut self, position: LogPosition) -> usize {
        let mut signalled = 0;
        for (_, node) in self.nodes.range_mut(..=position) {
            node.wake();
            signalled += 1;
        }
        signalled
    }

    /// Wake every registered node. Returns the count.
    pub fn signal_all(&mut self) -> usize {
        for node in self.nodes.values_mut() {
            node.wake();
        }
        self.nodes.len()
    }

    /// Remove every node at or below `position` that has no waiters.
    ///
    /// A node that still has waiters is skipped, not treated as a barrier:
    /// idle nodes above it in the prefix are still removed. Returns the
    /// number of nodes removed.
    pub fn reap_up_to(&mut self, position: LogPosition) -> usize {
        let idle: Vec<LogPosition> = self
            .nodes
            .range(..=position)
            .filter(|(_, node)| node.waiters == 0)
            .map(|(k, _)| *k)
            .collect();
        for key in &idle {
            self.nodes.remove(key);
        }
        idle.len()
    }
}
