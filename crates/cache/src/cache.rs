//! Keyed cache of current state.
//!
//! A `Cache` is a plain keyed mapping with unique keys and no ordering
//! guarantee on iteration. It is owned exclusively by the operator that
//! constructed it and is mutated by applying change batches in record
//! order.

use alloc::vec::Vec;
use beck_core::{ChangeBatch, ChangeReason};
use core::hash::Hash;
use hashbrown::HashMap;

/// Mapping from key to current value.
#[derive(Clone, Debug)]
pub struct Cache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> PartialEq for Cache<K, V>
where
    K: Eq + Hash,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V> Eq for Cache<K, V>
where
    K: Eq + Hash,
    V: Eq,
{
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V> {
    /// Creates a new empty cache.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Creates an empty cache with room for `capacity` entries.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
{
    /// Point-in-time read of the value for a key.
    #[inline]
    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Returns true if the key is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates the current key-value pairs. No ordering guarantee.
    #[inline]
    pub fn key_values(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Iterates the current keys. No ordering guarantee.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Inserts or replaces a value, returning the replaced value.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// Removes a key, returning its value if it was present.
    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns true if both caches hold exactly the same key-value pairs.
    pub fn same_entries(&self, other: &Self) -> bool
    where
        V: PartialEq,
    {
        self.entries == other.entries
    }

    /// Drains all entries into a vector. No ordering guarantee.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        self.entries.drain().collect()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Applies a change batch in record order.
    ///
    /// Add and Update insert, Remove deletes, Refresh and Moved leave the
    /// contents untouched.
    pub fn apply(&mut self, batch: &ChangeBatch<K, V>) {
        for record in batch.iter() {
            match record.reason() {
                ChangeReason::Add | ChangeReason::Update => {
                    self.entries
                        .insert(record.key().clone(), record.current().clone());
                }
                ChangeReason::Remove => {
                    self.entries.remove(record.key());
                }
                ChangeReason::Refresh | ChangeReason::Moved => {}
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Cache<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
