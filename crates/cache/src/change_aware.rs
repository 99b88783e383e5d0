//! Change-aware cache: a cache that records its own mutations.
//!
//! Every edit records one change per logical mutation into a pending batch
//! while simultaneously updating the visible mapping. `capture_changes`
//! atomically returns and clears the pending batch. Invariant: replaying a
//! captured batch onto an empty cache reproduces the live mapping.

use crate::cache::Cache;
use alloc::vec::Vec;
use beck_core::{ChangeBatch, ChangeRecord};
use core::hash::Hash;
use core::mem;

/// A keyed cache accumulating a pending change batch.
#[derive(Clone, Debug)]
pub struct ChangeAwareCache<K, V> {
    cache: Cache<K, V>,
    pending: ChangeBatch<K, V>,
}

impl<K, V> Default for ChangeAwareCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ChangeAwareCache<K, V> {
    /// Creates a new empty change-aware cache.
    pub fn new() -> Self {
        Self {
            cache: Cache::new(),
            pending: ChangeBatch::new(),
        }
    }

    /// Returns a read-only view of the underlying cache.
    #[inline]
    pub fn cache(&self) -> &Cache<K, V> {
        &self.cache
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if the cache holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns true if edits have been recorded since the last capture.
    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the recorded-but-uncaptured changes.
    #[inline]
    pub fn pending(&self) -> &ChangeBatch<K, V> {
        &self.pending
    }

    /// Atomically returns and clears the pending batch.
    pub fn capture_changes(&mut self) -> ChangeBatch<K, V> {
        mem::take(&mut self.pending)
    }

    /// Discards the pending batch without emitting it.
    pub fn discard_changes(&mut self) {
        self.pending.clear();
    }
}

impl<K, V> ChangeAwareCache<K, V>
where
    K: Eq + Hash,
{
    /// Point-in-time read of the value for a key.
    #[inline]
    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.cache.lookup(key)
    }

    /// Returns true if the key is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.cache.contains_key(key)
    }

    /// Iterates the current key-value pairs. No ordering guarantee.
    #[inline]
    pub fn key_values(&self) -> impl Iterator<Item = (&K, &V)> {
        self.cache.key_values()
    }
}

impl<K, V> ChangeAwareCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Applies an upstream batch to the visible mapping without recording
    /// it; the batch is already the record of these mutations.
    pub fn apply(&mut self, batch: &ChangeBatch<K, V>) {
        self.cache.apply(batch);
    }

    /// Inserts or replaces a value, recording an Add or Update.
    ///
    /// For direct edits every replacement counts as distinct; value
    /// equality is consulted only by the diff engine.
    pub fn add_or_update(&mut self, key: K, value: V) {
        match self.cache.insert(key.clone(), value.clone()) {
            None => self.pending.push(ChangeRecord::add(key, value)),
            Some(previous) => self
                .pending
                .push(ChangeRecord::update(key, value, previous)),
        }
    }

    /// Removes a key, recording a Remove if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.cache.remove(key);
        if let Some(value) = &removed {
            self.pending
                .push(ChangeRecord::remove(key.clone(), value.clone()));
        }
        removed
    }

    /// Removes every entry, recording one Remove per key.
    pub fn clear(&mut self) {
        for (key, value) in self.cache.drain() {
            self.pending.push(ChangeRecord::remove(key, value));
        }
    }

    /// Records a Refresh for a key, leaving contents untouched.
    ///
    /// Returns true if the key was present.
    pub fn refresh(&mut self, key: &K) -> bool {
        match self.cache.lookup(key) {
            Some(value) => {
                self.pending
                    .push(ChangeRecord::refresh(key.clone(), value.clone()));
                true
            }
            None => false,
        }
    }

    /// Records a Moved for a key, leaving contents untouched.
    ///
    /// Returns true if the key was present.
    pub fn moved(&mut self, key: &K) -> bool {
        match self.cache.lookup(key) {
            Some(value) => {
                self.pending
                    .push(ChangeRecord::moved(key.clone(), value.clone()));
                true
            }
            None => false,
        }
    }

    /// Records a Refresh for every live key.
    pub fn refresh_all(&mut self) {
        let entries: Vec<(K, V)> = self
            .cache
            .key_values()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in entries {
            self.pending.push(ChangeRecord::refresh(key, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beck_core::ChangeReason;

    #[test]
    fn test_add_then_update_records_both() {
        let mut cache = ChangeAwareCache::new();
        cache.add_or_update(1, "a");
        cache.add_or_update(1, "b");

        let batch = cache.capture_changes();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.records()[0].reason(), ChangeReason::Add);
        assert_eq!(batch.records()[1].reason(), ChangeReason::Update);
        assert_eq!(batch.records()[1].previous(), Some(&"a"));
        assert_eq!(cache.lookup(&1), Some(&"b"));
    }

    #[test]
    fn test_remove_missing_records_nothing() {
        let mut cache: ChangeAwareCache<u32, &str> = ChangeAwareCache::new();
        assert_eq!(cache.remove(&1), None);
        assert!(!cache.has_pending());
    }

    #[test]
    fn test_clear_records_one_remove_per_key() {
        let mut cache = ChangeAwareCache::new();
        cache.add_or_update(1, "a");
        cache.add_or_update(2, "b");
        cache.capture_changes();

        cache.clear();
        let batch = cache.capture_changes();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.count_of(ChangeReason::Remove), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_refresh_leaves_contents_untouched() {
        let mut cache = ChangeAwareCache::new();
        cache.add_or_update(1, "a");
        cache.capture_changes();

        assert!(cache.refresh(&1));
        assert!(!cache.refresh(&2));

        let batch = cache.capture_changes();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records()[0].reason(), ChangeReason::Refresh);
        assert_eq!(cache.lookup(&1), Some(&"a"));
    }

    #[test]
    fn test_capture_clears_pending() {
        let mut cache = ChangeAwareCache::new();
        cache.add_or_update(1, "a");

        assert!(cache.has_pending());
        let first = cache.capture_changes();
        assert_eq!(first.len(), 1);

        assert!(!cache.has_pending());
        assert!(cache.capture_changes().is_empty());
    }

    #[test]
    fn test_replay_reproduces_mapping() {
        let mut cache = ChangeAwareCache::new();
        cache.add_or_update(1, "a");
        cache.add_or_update(2, "b");
        cache.add_or_update(1, "c");
        cache.remove(&2);
        cache.add_or_update(3, "d");

        let batch = cache.capture_changes();

        let mut replayed = Cache::new();
        replayed.apply(&batch);
        assert!(replayed.same_entries(cache.cache()));
    }
}
