//! Projection of live slots into keyed collections.

use std::collections::BTreeMap;
use std::fmt::Debug;

use slab::Slab;
use tracing::warn;

use crate::allocator::node::RawSlot;
use crate::allocator::pool::NodePool;
use crate::error::CorruptionError;

/// Live entries of one allocator region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection<K, T, V> {
    /// Transformed key -> value, live slots only
    pub entries: BTreeMap<T, V>,

    /// 1-based slot number -> untransformed key, live slots only.
    /// Other records reference entries by this number.
    pub slot_keys: BTreeMap<u32, K>,
}

impl<K, T, V> Default for Projection<K, T, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            slot_keys: BTreeMap::new(),
        }
    }
}

/// Project the live slots of a slab (see [`NodePool::into_live_slots`]).
///
/// `transform` maps each stored key to the key of the output map, e.g.
/// unwrapping a single-field wrapper. If two live slots map to the same
/// transformed key the higher slot index wins and a warning is logged; the
/// allocator keeps live keys unique, so a collision means upstream
/// corruption, but the caller already holds the data and gets all of it.
pub fn project<K, T, V, F>(live: Slab<RawSlot<K, V>>, mut transform: F) -> Projection<K, T, V>
where
    K: Clone,
    T: Ord + Debug,
    F: FnMut(K) -> T,
{
    let mut projection = Projection::default();

    // Slab iterates in ascending key order, i.e. allocator index order
    for (index, slot) in live {
        let (key, value) = slot.into_entry();
        let slot_number = index as u32 + 1;
        let mapped = transform(key.clone());

        if projection.entries.contains_key(&mapped) {
            warn!(
                slot = slot_number,
                key = ?mapped,
                "duplicate live key; later slot overwrites earlier entry"
            );
        }
        projection.entries.insert(mapped, value);
        projection.slot_keys.insert(slot_number, key);
    }

    projection
}

impl<K, V> NodePool<K, V> {
    /// Resolve the free list and project the live slots in one step.
    pub fn project<T, F>(self, transform: F) -> Result<Projection<K, T, V>, CorruptionError>
    where
        K: Clone,
        T: Ord + Debug,
        F: FnMut(K) -> T,
    {
        let free = self.free_slots()?;
        Ok(project(self.into_live_slots(&free), transform))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchIdKey, MatchRecord};

    fn slot(next_free: u32, id: u64, amount: u64) -> RawSlot<MatchIdKey, MatchRecord> {
        RawSlot::new(
            next_free,
            MatchIdKey { match_id: id },
            MatchRecord {
                amount_in_p2p: amount,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_project_excludes_free_slots() {
        // Slot 2 (index 1) is free
        let pool = NodePool::from_parts(2, vec![slot(0, 10, 1), slot(4, 11, 2), slot(0, 12, 3)]);
        let projection = pool.project(MatchIdKey::into_id).unwrap();

        assert_eq!(projection.entries.keys().copied().collect::<Vec<_>>(), vec![10, 12]);
        assert_eq!(projection.entries[&12].amount_in_p2p, 3);
        assert_eq!(projection.slot_keys.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(projection.slot_keys[&3], MatchIdKey { match_id: 12 });
    }

    #[test]
    fn test_project_collision_last_write_wins() {
        let pool = NodePool::from_parts(4, vec![slot(0, 7, 100), slot(0, 7, 200), slot(0, 8, 300)]);
        let projection = pool.project(MatchIdKey::into_id).unwrap();

        assert_eq!(projection.entries.len(), 2);
        assert_eq!(projection.entries[&7].amount_in_p2p, 200);
        // Both slots still resolve by number
        assert_eq!(projection.slot_keys.len(), 3);
    }

    #[test]
    fn test_project_identity_transform() {
        let pool = NodePool::from_parts(2, vec![slot(0, 1, 5)]);
        let projection = pool.project(|key| key.match_id * 2).unwrap();

        assert_eq!(projection.entries[&2].amount_in_p2p, 5);
    }

    #[test]
    fn test_project_propagates_corruption() {
        let pool = NodePool::from_parts(1, vec![slot(1, 1, 1)]);

        assert!(pool.project(MatchIdKey::into_id).is_err());
    }
}
