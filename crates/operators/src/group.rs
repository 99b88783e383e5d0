//! Incremental grouping operator.
//!
//! Continuously partitions a keyed stream into immutable `Group` snapshots,
//! one per distinct group key. Snapshots are replaced wholesale whenever
//! membership changes and are never mutated in place once emitted, so a
//! downstream consumer can never observe a half-updated grouping.

use alloc::rc::Rc;
use alloc::vec::Vec;
use beck_cache::Cache;
use beck_core::{ChangeBatch, ChangeReason, ChangeRecord};
use core::fmt;
use core::hash::Hash;
use hashbrown::HashMap;

/// Immutable snapshot of all items currently mapped to one group key.
pub struct Group<GK, K, V> {
    key: GK,
    items: Rc<Cache<K, V>>,
}

impl<GK, K, V> Group<GK, K, V> {
    /// Creates an explicit empty group for a key.
    pub fn empty(key: GK) -> Self {
        Self {
            key,
            items: Rc::new(Cache::new()),
        }
    }

    pub(crate) fn from_shared(key: GK, items: Rc<Cache<K, V>>) -> Self {
        Self { key, items }
    }

    /// Returns the group key.
    #[inline]
    pub fn key(&self) -> &GK {
        &self.key
    }

    /// Returns the items in this snapshot.
    #[inline]
    pub fn items(&self) -> &Cache<K, V> {
        &self.items
    }

    /// Returns the number of items in this snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the snapshot holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if both groups share the same underlying snapshot.
    ///
    /// Snapshots are replaced wholesale on membership change, so pointer
    /// identity is a faithful sameness test between emissions.
    pub fn same_snapshot(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }
}

impl<GK, K, V> Group<GK, K, V>
where
    K: Eq + Hash,
{
    /// Point-in-time read of an item in this snapshot.
    #[inline]
    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.items.lookup(key)
    }
}

impl<GK: Clone, K, V> Clone for Group<GK, K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            items: Rc::clone(&self.items),
        }
    }
}

impl<GK, K, V> fmt::Debug for Group<GK, K, V>
where
    GK: fmt::Debug,
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("key", &self.key)
            .field("items", &self.items)
            .finish()
    }
}

impl<GK, K, V> PartialEq for Group<GK, K, V>
where
    GK: PartialEq,
    K: Eq + Hash,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && (Rc::ptr_eq(&self.items, &other.items) || self.items.same_entries(&other.items))
    }
}

/// First-touch-ordered set of groups affected by a batch, remembering the
/// snapshot each group had before the batch started mutating it.
struct TouchSet<GK, K, V> {
    order: Vec<GK>,
    old: HashMap<GK, Option<Rc<Cache<K, V>>>>,
}

impl<GK, K, V> TouchSet<GK, K, V>
where
    GK: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self {
            order: Vec::new(),
            old: HashMap::new(),
        }
    }

    fn touch(&mut self, groups: &HashMap<GK, Rc<Cache<K, V>>>, key: &GK) {
        if !self.old.contains_key(key) {
            self.old.insert(key.clone(), groups.get(key).cloned());
            self.order.push(key.clone());
        }
    }
}

/// A stateful grouping of a keyed stream by a derived group key.
///
/// Emits exactly one record per group a batch touches: Add when the group
/// comes into existence, Update (previous snapshot attached) when its
/// membership changes, Remove when it empties. Batches whose net effect
/// leaves a group unchanged emit nothing for it and retain the prior
/// snapshot pointer.
pub struct GroupBy<K, V, GK, F> {
    key_of: F,
    groups: HashMap<GK, Rc<Cache<K, V>>>,
    item_group: HashMap<K, GK>,
}

impl<K, V, GK, F> GroupBy<K, V, GK, F>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
    GK: Eq + Hash + Clone,
    F: FnMut(&V) -> GK,
{
    /// Creates an empty grouping with the given group-key function.
    pub fn new(key_of: F) -> Self {
        Self {
            key_of,
            groups: HashMap::new(),
            item_group: HashMap::new(),
        }
    }

    /// Returns the current snapshot for a group key, if the group exists.
    pub fn group(&self, key: &GK) -> Option<Group<GK, K, V>> {
        self.groups
            .get(key)
            .map(|items| Group::from_shared(key.clone(), Rc::clone(items)))
    }

    /// Returns the current snapshot for a group key, or an explicit empty
    /// group if it does not exist.
    pub fn group_or_empty(&self, key: &GK) -> Group<GK, K, V> {
        self.group(key).unwrap_or_else(|| Group::empty(key.clone()))
    }

    /// Returns the number of non-empty groups.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the number of grouped items.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.item_group.len()
    }

    /// Iterates the current group keys. No ordering guarantee.
    pub fn group_keys(&self) -> impl Iterator<Item = &GK> {
        self.groups.keys()
    }

    /// Processes one upstream batch, emitting one record per touched group.
    pub fn process(&mut self, batch: &ChangeBatch<K, V>) -> ChangeBatch<GK, Group<GK, K, V>> {
        let mut touched = TouchSet::new();
        for record in batch.iter() {
            let key = record.key();
            match record.reason() {
                ChangeReason::Add | ChangeReason::Update => {
                    let target = (self.key_of)(record.current());
                    self.place(&mut touched, key, record.current(), target);
                }
                ChangeReason::Remove => {
                    self.displace(&mut touched, key);
                }
                ChangeReason::Refresh => {
                    // Refresh re-evaluates the group key; the item moves
                    // only if the key changed.
                    if self.item_group.contains_key(key) {
                        let target = (self.key_of)(record.current());
                        self.place(&mut touched, key, record.current(), target);
                    }
                }
                ChangeReason::Moved => {}
            }
        }
        self.emit(touched)
    }

    /// Re-evaluates the group key for every live item and applies the
    /// resulting moves as one batch. Cost is proportional to the total
    /// number of grouped items.
    pub fn regroup(&mut self) -> ChangeBatch<GK, Group<GK, K, V>> {
        let mut moves: Vec<(K, GK, V)> = Vec::new();
        let key_of = &mut self.key_of;
        for (key, current_gk) in &self.item_group {
            if let Some(items) = self.groups.get(current_gk) {
                if let Some(value) = items.lookup(key) {
                    let target = key_of(value);
                    if target != *current_gk {
                        moves.push((key.clone(), target, value.clone()));
                    }
                }
            }
        }

        let mut touched = TouchSet::new();
        for (key, target, value) in moves {
            self.place(&mut touched, &key, &value, target);
        }
        self.emit(touched)
    }

    fn place(&mut self, touched: &mut TouchSet<GK, K, V>, key: &K, value: &V, target: GK) {
        let needs_move = match self.item_group.get(key) {
            Some(current) => *current != target,
            None => false,
        };
        if needs_move {
            self.displace(touched, key);
        }
        touched.touch(&self.groups, &target);
        let slot = self
            .groups
            .entry(target.clone())
            .or_insert_with(|| Rc::new(Cache::new()));
        Rc::make_mut(slot).insert(key.clone(), value.clone());
        self.item_group.insert(key.clone(), target);
    }

    fn displace(&mut self, touched: &mut TouchSet<GK, K, V>, key: &K) {
        if let Some(current) = self.item_group.remove(key) {
            touched.touch(&self.groups, &current);
            if let Some(slot) = self.groups.get_mut(&current) {
                Rc::make_mut(slot).remove(key);
            }
        }
    }

    fn emit(&mut self, mut touched: TouchSet<GK, K, V>) -> ChangeBatch<GK, Group<GK, K, V>> {
        let mut out = ChangeBatch::new();
        for gk in touched.order.drain(..) {
            let old = touched.old.remove(&gk).flatten();
            let new = self.groups.get(&gk).cloned();
            match (old, new) {
                (None, Some(new_items)) => {
                    if new_items.is_empty() {
                        // created and emptied within one batch
                        self.groups.remove(&gk);
                    } else {
                        out.push(ChangeRecord::add(
                            gk.clone(),
                            Group::from_shared(gk, new_items),
                        ));
                    }
                }
                (Some(old_items), Some(new_items)) => {
                    if new_items.is_empty() {
                        self.groups.remove(&gk);
                        out.push(ChangeRecord::remove(
                            gk.clone(),
                            Group::from_shared(gk, old_items),
                        ));
                    } else if old_items.same_entries(&new_items) {
                        // No net membership change: keep the prior snapshot
                        // so pointer identity stays meaningful downstream.
                        self.groups.insert(gk, old_items);
                    } else {
                        out.push(ChangeRecord::update(
                            gk.clone(),
                            Group::from_shared(gk.clone(), new_items),
                            Group::from_shared(gk, old_items),
                        ));
                    }
                }
                (_, None) => {}
            }
        }
        out
    }
}
