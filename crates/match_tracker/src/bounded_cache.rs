//! Capacity-bounded map shared between tasks.
//!
//! Inserting a new key at capacity evicts one existing entry first. Which
//! entry goes is decided by an [`EvictionFn`]; the default picks whatever the
//! map yields first, which is not LRU and not insertion order. Replacing an
//! existing key never evicts.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// Chooses the victim among the current entries.
pub type EvictionFn<K, V> = fn(&HashMap<K, V>) -> Option<K>;

pub fn evict_arbitrary<K: Clone, V>(entries: &HashMap<K, V>) -> Option<K> {
    entries.keys().next().cloned()
}

pub struct BoundedCache<K, V> {
    capacity: usize,
    entries:  RwLock<HashMap<K, V>>,
    evict:    EvictionFn<K, V>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, evict_arbitrary)
    }

    pub fn with_policy(capacity: usize, evict: EvictionFn<K, V>) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: RwLock::new(HashMap::with_capacity(capacity)), evict }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns the evicted key, if any.
    pub fn put(&self, key: K, value: V) -> Option<K> {
        self.put_with(key, value, |_| {})
    }

    /// Like [`put`](Self::put), but when a new key meets a full cache
    /// `make_room` runs first under the same lock; the eviction policy only
    /// applies if the cache is still full afterwards.
    pub fn put_with<F>(&self, key: K, value: V, make_room: F) -> Option<K>
    where
        F: FnOnce(&mut HashMap<K, V>),
    {
        let mut entries = self.entries.write();
        let mut evicted = None;
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            make_room(&mut entries);
            if entries.len() >= self.capacity {
                if let Some(victim) = (self.evict)(&entries) {
                    entries.remove(&victim);
                    evicted = Some(victim);
                }
            }
        }
        entries.insert(key, value);
        evicted
    }

    pub fn evict_one(&self) -> Option<K> {
        let mut entries = self.entries.write();
        let victim = (self.evict)(&entries)?;
        entries.remove(&victim);
        Some(victim)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().remove(key)
    }

    /// Keeps entries for which `keep` returns true; returns how many were dropped.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|k, v| keep(k, v));
        before - entries.len()
    }
}
