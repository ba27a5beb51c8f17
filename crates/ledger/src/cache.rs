//! Bounded caches for the root layer.
//!
//! Both root caches (entries and best-offer lists) use a
//! "least-recent-out-of-2-random-choices" eviction strategy: on overflow,
//! pick two random slots and evict whichever was accessed less recently.
//! This is O(1) per eviction, needs no ordering structure, and degrades
//! more gracefully than strict LRU under pathological access patterns.
//!
//! A capacity of zero disables the cache entirely: nothing is stored and
//! every lookup misses, so behavior with and without caching is identical
//! apart from store traffic.

use std::collections::HashMap;
use std::hash::Hash;

use rand::Rng;
use strata_common::{Asset, LedgerEntry, LedgerKey};

/// Caches committed entry lookups, present (`Some`) or known-absent
/// (`None`).
pub(crate) type EntryCache = RandomEvictionCache<LedgerKey, Option<LedgerEntry>>;

/// Caches the full price-ordered offer list per `(buying, selling)` pair.
pub(crate) type BestOffersCache = RandomEvictionCache<(Asset, Asset), Vec<LedgerEntry>>;

struct Slot<V> {
    value: V,
    /// Access counter value at last touch.
    access: u64,
    /// Index into `keys` for O(1) swap-removal.
    vec_index: usize,
}

/// A bounded map with least-recent-of-2-random-choices eviction.
pub(crate) struct RandomEvictionCache<K, V> {
    max_entries: usize,
    map: HashMap<K, Slot<V>>,
    keys: Vec<K>,
    access_counter: u64,
}

impl<K: Eq + Hash + Clone, V> RandomEvictionCache<K, V> {
    pub(crate) fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            map: HashMap::new(),
            keys: Vec::new(),
            access_counter: 0,
        }
    }

    /// Looks up `key`, refreshing its access time on a hit.
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        self.access_counter += 1;
        let counter = self.access_counter;
        if let Some(slot) = self.map.get_mut(key) {
            slot.access = counter;
            Some(&slot.value)
        } else {
            None
        }
    }

    /// Inserts or replaces `key`. A no-op when the cache is disabled.
    pub(crate) fn put(&mut self, key: K, value: V) {
        if self.max_entries == 0 {
            return;
        }
        self.access_counter += 1;
        let counter = self.access_counter;
        if let Some(slot) = self.map.get_mut(&key) {
            slot.value = value;
            slot.access = counter;
            return;
        }
        if self.map.len() >= self.max_entries {
            self.evict_one();
        }
        self.keys.push(key.clone());
        self.map.insert(
            key,
            Slot {
                value,
                access: counter,
                vec_index: self.keys.len() - 1,
            },
        );
    }

    /// Drops `key` if present.
    pub(crate) fn remove(&mut self, key: &K) {
        if let Some(slot) = self.map.remove(key) {
            self.remove_key_at(slot.vec_index);
        }
    }

    /// Evicts the less recently used of two randomly chosen slots.
    fn evict_one(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let mut rng = rand::thread_rng();
        let a = rng.gen_range(0..self.keys.len());
        let b = rng.gen_range(0..self.keys.len());
        let access_of = |cache: &Self, idx: usize| {
            cache.map.get(&cache.keys[idx]).map_or(0, |slot| slot.access)
        };
        let victim = if access_of(self, a) <= access_of(self, b) {
            a
        } else {
            b
        };
        let key = self.keys[victim].clone();
        self.map.remove(&key);
        self.remove_key_at(victim);
    }

    fn remove_key_at(&mut self, index: usize) {
        self.keys.swap_remove(index);
        if index < self.keys.len() {
            let moved = self.keys[index].clone();
            if let Some(slot) = self.map.get_mut(&moved) {
                slot.vec_index = index;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let mut cache: RandomEvictionCache<u32, String> = RandomEvictionCache::new(4);
        cache.put(1, "one".to_string());
        cache.put(2, "two".to_string());
        assert_eq!(cache.get(&1), Some(&"one".to_string()));
        assert_eq!(cache.get(&3), None);
    }

    #[test]
    fn test_replace_existing() {
        let mut cache: RandomEvictionCache<u32, u32> = RandomEvictionCache::new(4);
        cache.put(1, 10);
        cache.put(1, 20);
        assert_eq!(cache.map.len(), 1);
        assert_eq!(cache.get(&1), Some(&20));
    }

    #[test]
    fn test_capacity_bound() {
        let mut cache: RandomEvictionCache<u32, u32> = RandomEvictionCache::new(8);
        for i in 0..100 {
            cache.put(i, i);
        }
        assert!(cache.map.len() <= 8);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut cache: RandomEvictionCache<u32, u32> = RandomEvictionCache::new(0);
        cache.put(1, 10);
        assert_eq!(cache.map.len(), 0);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_remove() {
        let mut cache: RandomEvictionCache<u32, u32> = RandomEvictionCache::new(4);
        cache.put(1, 10);
        cache.put(2, 20);
        cache.remove(&1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&20));
        cache.remove(&7);
        assert_eq!(cache.map.len(), 1);
    }

    #[test]
    fn test_eviction_keeps_map_and_keys_in_sync() {
        let mut cache: RandomEvictionCache<u32, u32> = RandomEvictionCache::new(3);
        for i in 0..50 {
            cache.put(i, i);
            assert_eq!(cache.map.len(), cache.keys.len());
        }
        for key in cache.keys.clone() {
            assert!(cache.map.contains_key(&key));
        }
    }
}
