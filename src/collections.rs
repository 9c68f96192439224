//! Bounded-capacity hash table used for the registry and resolution stores.
//!
//! Open addressing with linear probing and tombstone deletion. Capacity is
//! fixed at construction and never grows; inserting a new key into a full
//! table is rejected rather than evicting an existing entry. Slot placement
//! must be identical on every node replaying the same history, so there is no
//! per-process hash seeding: keys are expected to already be well-spread
//! 64-bit digests and map to a slot by modulo.
//!
//! Removal leaves a tombstone and never relocates other entries, which lets
//! the epoch sweep delete while walking the table by slot index without
//! skipping or revisiting anything. `cleanup_if_needed` rebuilds the table
//! once tombstones accumulate, the same hook the sweep runs after eviction.

use serde::{Deserialize, Serialize};

/// Keys must place themselves into one of `capacity` slots deterministically.
pub trait SlotKey: Copy + Eq {
    fn home_slot(&self, capacity: usize) -> usize;
}

impl SlotKey for u64 {
    fn home_slot(&self, capacity: usize) -> usize {
        (*self % capacity as u64) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Slot<K, V> {
    Vacant,
    Tombstone,
    Occupied(K, V),
}

/// Fixed-capacity associative table. At most one value per key, no ordering
/// guarantee across keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedMap<K, V> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    tombstones: usize,
}

impl<K: SlotKey, V> FixedMap<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "table capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Vacant);
        Self { slots, len: 0, tombstones: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Index of the slot holding `key`, probing from its home slot.
    fn find(&self, key: &K) -> Option<usize> {
        let capacity = self.slots.len();
        let start = key.home_slot(capacity);
        for offset in 0..capacity {
            let idx = (start + offset) % capacity;
            match &self.slots[idx] {
                Slot::Occupied(k, _) if k == key => return Some(idx),
                Slot::Occupied(..) | Slot::Tombstone => continue,
                Slot::Vacant => return None,
            }
        }
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let idx = self.find(key)?;
        match &self.slots[idx] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.find(key)?;
        match &mut self.slots[idx] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Insert or overwrite. Returns `false` when the key is new and the table
    /// is already full; the table is left unchanged in that case.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let capacity = self.slots.len();
        let start = key.home_slot(capacity);
        let mut free: Option<usize> = None;
        for offset in 0..capacity {
            let idx = (start + offset) % capacity;
            match &self.slots[idx] {
                Slot::Occupied(k, _) if *k == key => {
                    self.slots[idx] = Slot::Occupied(key, value);
                    return true;
                }
                Slot::Occupied(..) => continue,
                Slot::Tombstone => {
                    if free.is_none() {
                        free = Some(idx);
                    }
                }
                Slot::Vacant => {
                    if free.is_none() {
                        free = Some(idx);
                    }
                    break;
                }
            }
        }

        if self.len == capacity {
            return false;
        }
        let Some(idx) = free else {
            return false;
        };
        if matches!(self.slots[idx], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[idx] = Slot::Occupied(key, value);
        self.len += 1;
        true
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.find(key)?;
        match std::mem::replace(&mut self.slots[idx], Slot::Tombstone) {
            Slot::Occupied(_, v) => {
                self.len -= 1;
                self.tombstones += 1;
                Some(v)
            }
            other => {
                self.slots[idx] = other;
                None
            }
        }
    }

    /// The entry stored at slot `index`, if that slot is occupied. Together
    /// with `capacity()` this supports a full table sweep that checks every
    /// slot exactly once.
    pub fn slot(&self, index: usize) -> Option<(&K, &V)> {
        match self.slots.get(index) {
            Some(Slot::Occupied(k, v)) => Some((k, v)),
            _ => None,
        }
    }

    /// Iterate occupied entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(k, v) => Some((k, v)),
            _ => None,
        })
    }

    /// Rebuild the table when more than a quarter of the slots are
    /// tombstones, restoring probe-sequence locality after heavy deletion.
    pub fn cleanup_if_needed(&mut self) {
        if self.tombstones * 4 <= self.slots.len() {
            return;
        }
        let capacity = self.slots.len();
        let old = std::mem::replace(&mut self.slots, {
            let mut fresh = Vec::with_capacity(capacity);
            fresh.resize_with(capacity, || Slot::Vacant);
            fresh
        });
        self.len = 0;
        self.tombstones = 0;
        for slot in old {
            if let Slot::Occupied(k, v) = slot {
                let inserted = self.insert(k, v);
                debug_assert!(inserted, "rebuild reinserts into equal capacity");
            }
        }
    }
}
