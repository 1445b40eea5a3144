//! Byte-bounded LRU cache of structural item metadata.
//!
//! # Responsibility
//! - Map item ids to structural metadata or a negative marker.
//! - Keep the aggregate declared weight of all entries within a byte budget.
//!
//! # Invariants
//! - `weight()` never exceeds `capacity_bytes()` after a `put` returns.
//! - An entry heavier than the whole budget is never admitted.
//! - A budget of zero disables the cache: every `get` misses.

use crate::model::item::{ItemId, StructuralMetadata};
use log::debug;
use lru::LruCache;
use std::sync::{Mutex, MutexGuard};

/// Weight charged for a negative marker.
const ABSENT_SLOT_WEIGHT: u64 = 32;

/// One cached lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSlot {
    /// Item exists with the given structure.
    Present(StructuralMetadata),
    /// Item is known not to exist.
    Absent,
}

impl CacheSlot {
    fn weight(&self) -> u64 {
        match self {
            Self::Present(metadata) => metadata.data_length(),
            Self::Absent => ABSENT_SLOT_WEIGHT,
        }
    }
}

struct CacheState {
    entries: LruCache<ItemId, (CacheSlot, u64)>,
    weight: u64,
}

/// Thread-safe structural metadata cache.
pub struct StructuralCache {
    capacity_bytes: u64,
    state: Mutex<CacheState>,
}

impl StructuralCache {
    /// Creates an empty cache holding at most `capacity_bytes` of declared weight.
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                weight: 0,
            }),
        }
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity_bytes > 0
    }

    /// Looks up one item and marks it most recently used.
    pub fn get(&self, item_id: &ItemId) -> Option<CacheSlot> {
        let mut state = self.lock();
        state.entries.get(item_id).map(|(slot, _)| slot.clone())
    }

    /// Caches `slot` for `item_id`, replacing any previous entry.
    ///
    /// Returns `false` when the entry was not admitted.
    pub fn put(&self, item_id: ItemId, slot: CacheSlot) -> bool {
        let weight = slot.weight();
        if weight > self.capacity_bytes {
            return false;
        }

        let mut state = self.lock();
        if let Some((_, previous_weight)) = state.entries.put(item_id, (slot, weight)) {
            state.weight -= previous_weight;
        }
        state.weight += weight;

        let mut evicted = 0usize;
        while state.weight > self.capacity_bytes {
            match state.entries.pop_lru() {
                Some((_, (_, entry_weight))) => {
                    state.weight -= entry_weight;
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            debug!(
                "event=cache_evict module=cache status=ok evicted={} weight={} capacity={}",
                evicted, state.weight, self.capacity_bytes
            );
        }
        true
    }

    /// Drops the entry for `item_id`, returning it if present.
    pub fn remove(&self, item_id: &ItemId) -> Option<CacheSlot> {
        let mut state = self.lock();
        let (slot, weight) = state.entries.pop(item_id)?;
        state.weight -= weight;
        Some(slot)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate declared weight of all entries.
    pub fn weight(&self) -> u64 {
        self.lock().weight
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.weight = 0;
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // `weight` is updated right after every `entries` mutation.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
