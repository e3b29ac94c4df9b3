//! Ack Quorum Tracker
//!
//! Tracks the latest acknowledgment of up to `quorum - 1` distinct replicas
//! and reports the highest position acknowledged by `quorum` of them.
//!
//! The tracker never sorts. Once every slot is taken and an ack arrives from
//! yet another replica, the smallest slot position is, by construction,
//! acknowledged by `quorum` replicas: the slot owners and the newcomer all
//! sit at or above it. That minimum is promoted to the floor and its slot is
//! freed for the newcomer. Slots only move up and the evicted value is
//! always the current minimum, so the floor never moves down.

use serde::Serialize;

use super::config::MAX_QUORUM;
use super::errors::{SemiSyncError, SemiSyncResult};
use super::position::{LogPosition, ReplicaId};

/// Most recent known acknowledgment of one replica.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AckInfo {
    pub replica_id: ReplicaId,
    pub position: LogPosition,
}

impl AckInfo {
    pub fn new(replica_id: ReplicaId, position: LogPosition) -> Self {
        Self {
            replica_id,
            position,
        }
    }

    /// Whether this slot holds no acknowledgment.
    pub fn is_empty(&self) -> bool {
        self.replica_id.is_empty()
    }

    fn reset(&mut self) {
        *self = AckInfo::default();
    }
}

/// Bounded quorum tracker with `quorum - 1` slots and a monotonic floor.
#[derive(Debug, Clone)]
pub struct AckTracker {
    slots: Vec<AckInfo>,
    floor: AckInfo,
}

impl Default for AckTracker {
    /// Quorum of one: no slots, every ack confirms itself.
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            floor: AckInfo::default(),
        }
    }
}

impl AckTracker {
    /// Create a tracker for the given quorum size.
    pub fn new(quorum: u32) -> SemiSyncResult<Self> {
        if quorum == 0 || quorum > MAX_QUORUM {
            return Err(SemiSyncError::InvalidQuorum(quorum));
        }
        Ok(Self {
            slots: vec![AckInfo::default(); (quorum - 1) as usize],
            floor: AckInfo::default(),
        })
    }

    /// Number of slots, one less than the quorum size.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[AckInfo] {
        &self.slots
    }

    /// The last quorum-confirmed acknowledgment.
    pub fn floor(&self) -> AckInfo {
        self.floor
    }

    /// Record an acknowledgment.
    ///
    /// Returns the new floor when this ack completes a quorum, `None`
    /// otherwise (stale ack, known replica catching up, or free slot taken).
    pub fn insert(&mut self, replica_id: ReplicaId, position: LogPosition) -> Option<AckInfo> {
        if replica_id.is_empty() || position < self.floor.position {
            return None;
        }

        if let Some(slot) = self.slots.iter_mut().find(|s| s.replica_id == replica_id) {
            slot.position = slot.position.max(position);
            return None;
        }

        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_empty()) {
            *slot = AckInfo::new(replica_id, position);
            return None;
        }

        // Every slot holds a distinct replica: this ack completes a quorum.
        // The newcomer competes for the minimum too, so a lagging newcomer
        // becomes the floor itself.
        self.floor = self
            .slots
            .iter()
            .filter(|s| s.position < position)
            .min_by_key(|s| s.position)
            .copied()
            .unwrap_or_else(|| AckInfo::new(replica_id, position));

        let freed = self.remove_all(self.floor.position);

        if position > self.floor.position {
            if let Some(index) = freed {
                self.slots[index] = AckInfo::new(replica_id, position);
            }
        }

        Some(self.floor)
    }

    /// Clear every slot sitting exactly at `position`; returns the last
    /// index freed.
    fn remove_all(&mut self, position: LogPosition) -> Option<usize> {
        let mut freed = None;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.is_empty() && slot.position == position {
                slot.reset();
                freed = Some(index);
            }
        }
        freed
    }

    /// Change the quorum size.
    ///
    /// Previously held slots are re-fed through [`insert`](Self::insert)
    /// against the new capacity; the floor is kept as-is. If re-feeding
    /// completes a quorum the resulting floor is returned.
    pub fn resize(&mut self, quorum: u32) -> SemiSyncResult<Option<AckInfo>> {
        if quorum == 0 || quorum > MAX_QUORUM {
            return Err(SemiSyncError::InvalidQuorum(quorum));
        }
        let capacity = (quorum - 1) as usize;
        if capacity == self.slots.len() {
            return Ok(None);
        }

        let previous = std::mem::replace(&mut self.slots, vec![AckInfo::default(); capacity]);
        let mut confirmed = None;
        for info in previous.into_iter().filter(|i| !i.is_empty()) {
            if let Some(ack) = self.insert(info.replica_id, info.position) {
                confirmed = Some(ack);
            }
        }
        Ok(confirmed)
    }

    /// Forget every acknowledgment and the floor.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        self.floor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(v: u32) -> ReplicaId {
        ReplicaId::new(v)
    }

    fn pos(v: u64) -> LogPosition {
        LogPosition::new(v)
    }

    fn tracker(quorum: u32) -> AckTracker {
        AckTracker::new(quorum).unwrap()
    }

    // ==================== construction ====================

    #[test]
    fn test_zero_quorum_rejected() {
        assert_eq!(AckTracker::new(0).unwrap_err(), SemiSyncError::InvalidQuorum(0));
    }

    #[test]
    fn test_default_is_quorum_of_one() {
        assert_eq!(AckTracker::default().capacity(), 0);
    }

    #[test]
    fn test_capacity_is_quorum_minus_one() {
        assert_eq!(tracker(1).capacity(), 0);
        assert_eq!(tracker(3).capacity(), 2);
    }

    // ==================== quorum formation ====================

    #[test]
    fn test_quorum_of_two() {
        let mut t = tracker(2);

        assert_eq!(t.insert(rid(1), pos(10)), None);
        assert_eq!(t.slots()[0], AckInfo::new(rid(1), pos(10)));

        let confirmed = t.insert(rid(2), pos(20)).unwrap();
        assert_eq!(confirmed, AckInfo::new(rid(1), pos(10)));
        assert_eq!(t.floor(), AckInfo::new(rid(1), pos(10)));
        assert_eq!(t.slots()[0], AckInfo::new(rid(2), pos(20)));
    }

    #[test]
    fn test_quorum_of_three_confirms_third_highest() {
        let mut t = tracker(3);
        assert_eq!(t.insert(rid(1), pos(30)), None);
        assert_eq!(t.insert(rid(2), pos(10)), None);

        let confirmed = t.insert(rid(3), pos(20)).unwrap();
        assert_eq!(confirmed.position, pos(10));

        let mut held: Vec<_> = t.slots().iter().map(|s| s.position.value()).collect();
        held.sort();
        assert_eq!(held, vec![20, 30]);
    }

    #[test]
    fn test_lagging_newcomer_becomes_floor() {
        let mut t = tracker(3);
        t.insert(rid(1), pos(50));
        t.insert(rid(2), pos(60));

        let confirmed = t.insert(rid(3), pos(40)).unwrap();
        assert_eq!(confirmed, AckInfo::new(rid(3), pos(40)));
        // the newcomer is not placed, both slots survive
        assert!(t.slots().iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn test_newcomer_equal_to_floor_not_placed() {
        let mut t = tracker(2);
        t.insert(rid(1), pos(10));

        let confirmed = t.insert(rid(2), pos(10)).unwrap();
        assert_eq!(confirmed.position, pos(10));
        assert!(t.slots()[0].is_empty());
    }

    #[test]
    fn test_quorum_of_one_confirms_every_ack() {
        let mut t = tracker(1);
        assert_eq!(t.insert(rid(1), pos(5)).unwrap().position, pos(5));
        assert_eq!(t.insert(rid(2), pos(9)).unwrap().position, pos(9));
    }

    // ==================== slot updates ====================

    #[test]
    fn test_known_replica_only_advances() {
        let mut t = tracker(3);
        t.insert(rid(1), pos(10));

        assert_eq!(t.insert(rid(1), pos(30)), None);
        assert_eq!(t.slots()[0].position, pos(30));

        assert_eq!(t.insert(rid(1), pos(20)), None);
        assert_eq!(t.slots()[0].position, pos(30));
    }

    #[test]
    fn test_repeated_acks_never_form_quorum() {
        let mut t = tracker(2);
        for p in 1..100 {
            assert_eq!(t.insert(rid(7), pos(p)), None);
        }
        assert_eq!(t.floor(), AckInfo::default());
    }

    #[test]
    fn test_stale_ack_rejected_without_mutation() {
        let mut t = tracker(2);
        t.insert(rid(1), pos(10));
        t.insert(rid(2), pos(20));
        assert_eq!(t.floor().position, pos(10));

        let before = t.slots().to_vec();
        assert_eq!(t.insert(rid(3), pos(5)), None);
        assert_eq!(t.slots(), before.as_slice());
    }

    #[test]
    fn test_empty_replica_id_ignored() {
        let mut t = tracker(2);
        assert_eq!(t.insert(ReplicaId::EMPTY, pos(10)), None);
        assert!(t.slots()[0].is_empty());
    }

    #[test]
    fn test_no_duplicate_replica_slots() {
        let mut t = tracker(4);
        for (r, p) in [(1, 10), (2, 20), (1, 15), (2, 25), (3, 30)] {
            t.insert(rid(r), pos(p));
        }
        let mut ids: Vec<_> = t
            .slots()
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.replica_id)
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    // ==================== floor monotonicity ====================

    #[test]
    fn test_floor_monotonic_under_mixed_acks() {
        // Deterministic LCG so failures reproduce.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            seed >> 33
        };

        for quorum in 1..=5 {
            let mut t = tracker(quorum);
            let mut last_floor = t.floor().position;
            for _ in 0..2_000 {
                let replica = rid((next() % 7) as u32 + 1);
                let position = pos(next() % 1_000);
                t.insert(replica, position);
                assert!(t.floor().position >= last_floor);
                last_floor = t.floor().position;
                assert!(t
                    .slots()
                    .iter()
                    .filter(|s| !s.is_empty())
                    .all(|s| s.position >= last_floor));
            }
        }
    }

    // ==================== resize / clear ====================

    #[test]
    fn test_resize_rejects_zero() {
        let mut t = tracker(2);
        assert_eq!(t.resize(0).unwrap_err(), SemiSyncError::InvalidQuorum(0));
        assert_eq!(t.capacity(), 1);
    }

    #[test]
    fn test_resize_same_size_is_noop() {
        let mut t = tracker(3);
        t.insert(rid(1), pos(10));
        assert_eq!(t.resize(3).unwrap(), None);
        assert_eq!(t.slots()[0], AckInfo::new(rid(1), pos(10)));
    }

    #[test]
    fn test_resize_down_surfaces_confirmation() {
        let mut t = tracker(3);
        t.insert(rid(1), pos(10));
        t.insert(rid(2), pos(20));

        // Two replicas were already held; with quorum 2 that is a quorum.
        let confirmed = t.resize(2).unwrap().unwrap();
        assert_eq!(confirmed, AckInfo::new(rid(1), pos(10)));
        assert_eq!(t.capacity(), 1);
        assert_eq!(t.slots()[0], AckInfo::new(rid(2), pos(20)));
    }

    #[test]
    fn test_resize_up_keeps_slots_and_floor() {
        let mut t = tracker(2);
        t.insert(rid(1), pos(10));
        t.insert(rid(2), pos(20));

        assert_eq!(t.resize(4).unwrap(), None);
        assert_eq!(t.capacity(), 3);
        assert_eq!(t.floor().position, pos(10));
        assert_eq!(t.slots()[0], AckInfo::new(rid(2), pos(20)));
    }

    #[test]
    fn test_clear_resets_slots_and_floor() {
        let mut t = tracker(2);
        t.insert(rid(1), pos(10));
        t.insert(rid(2), pos(20));

        t.clear();
        assert_eq!(t.floor(), AckInfo::default());
        assert!(t.slots().iter().all(AckInfo::is_empty));
        // a lower ack is accepted again after clear
        assert_eq!(t.insert(rid(3), pos(1)), None);
    }
}
