//! Staged diff engine.
//!
//! `edit_diff` turns "here is the new desired full set" into a minimal edit
//! against the cache's current contents: removals for keys absent from the
//! target, add-or-updates for new keys and for keys whose value the
//! caller's equality rejects, and no record at all for unchanged keys.
//!
//! The whole plan — target consumption and every equality comparison — is
//! staged before the first mutation, so a failing equality predicate leaves
//! the cache and the pending batch untouched.

use crate::change_aware::ChangeAwareCache;
use alloc::vec::Vec;
use beck_core::{Error, Result};
use core::hash::Hash;
use hashbrown::HashMap;

impl<K, V> ChangeAwareCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Diffs the cache against a target full set and applies the minimal
    /// edit as one pending batch: removals first, then add-or-updates.
    ///
    /// Target keys are derived by `key_of`; later duplicates in the target
    /// win. Keys present on both sides whose values `eq` accepts produce no
    /// record.
    pub fn edit_diff<I, F, E>(&mut self, target: I, mut key_of: F, mut eq: E)
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V) -> K,
        E: FnMut(&V, &V) -> bool,
    {
        let result = self.try_edit_diff(target, |v| Ok(key_of(v)), |a, b| Ok(eq(a, b)));
        debug_assert!(result.is_ok());
    }

    /// Fallible variant of [`edit_diff`](Self::edit_diff).
    ///
    /// The key selector and the equality predicate may fail; on failure
    /// the cache and the pending batch are left exactly as they were and
    /// the wrapped error is returned.
    pub fn try_edit_diff<I, F, E>(&mut self, target: I, mut key_of: F, mut eq: E) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V) -> Result<K>,
        E: FnMut(&V, &V) -> Result<bool>,
    {
        // Key-deduplicated target, remembering first-occurrence order so
        // emission is deterministic for a given input sequence.
        let mut staged: HashMap<K, V> = HashMap::new();
        let mut order: Vec<K> = Vec::new();
        for value in target {
            let key = key_of(&value).map_err(wrap_selector)?;
            if staged.insert(key.clone(), value).is_none() {
                order.push(key);
            }
        }

        // Stage the full plan before mutating anything.
        let mut upserts: Vec<K> = Vec::with_capacity(order.len());
        for key in &order {
            let incoming = &staged[key];
            match self.lookup(key) {
                Some(current) => {
                    if !eq(current, incoming).map_err(wrap_equality)? {
                        upserts.push(key.clone());
                    }
                }
                None => upserts.push(key.clone()),
            }
        }
        let removes: Vec<K> = self
            .key_values()
            .filter(|(k, _)| !staged.contains_key(*k))
            .map(|(k, _)| k.clone())
            .collect();

        // Commit: removals first, then adds and updates.
        for key in &removes {
            self.remove(key);
        }
        for key in upserts {
            if let Some(value) = staged.remove(&key) {
                self.add_or_update(key, value);
            }
        }
        Ok(())
    }
}

fn wrap_equality(err: Error) -> Error {
    match err {
        Error::Predicate { .. } => err,
        other => Error::predicate(alloc::format!("{}", other)),
    }
}

fn wrap_selector(err: Error) -> Error {
    match err {
        Error::KeySelector { .. } => err,
        other => Error::key_selector(alloc::format!("{}", other)),
    }
}
