//! Per-item resource attachment.
//!
//! Binds an external resource to each live item of a keyed stream,
//! releasing it exactly once when the item is replaced, removed, or the
//! operator is torn down. Resources live in a side table keyed identically
//! to the main cache and are driven by the change stream, never by
//! finalizer timing; release is the resource's `Drop`.

use beck_core::{ChangeBatch, ChangeReason};
use core::hash::Hash;
use hashbrown::HashMap;

/// Attaches one factory-created resource per live key.
///
/// Invariants: exactly one resource exists per live key; on Update the old
/// resource is dropped strictly before its replacement is created; teardown
/// drops every remaining resource exactly once and stops further creation.
pub struct SubscribeMany<K, V, R, F> {
    factory: F,
    resources: HashMap<K, R>,
    torn_down: bool,
    _marker: core::marker::PhantomData<fn(&V)>,
}

impl<K, V, R, F> SubscribeMany<K, V, R, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(&V, &K) -> R,
{
    /// Creates the operator with an empty resource table.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            resources: HashMap::new(),
            torn_down: false,
            _marker: core::marker::PhantomData,
        }
    }

    /// Returns the number of live resources.
    #[inline]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Returns the resource attached to a key.
    #[inline]
    pub fn resource(&self, key: &K) -> Option<&R> {
        self.resources.get(key)
    }

    /// Observes one upstream batch, creating and releasing resources at
    /// the transitions it implies. The batch itself flows on unchanged.
    pub fn process(&mut self, batch: &ChangeBatch<K, V>) {
        if self.torn_down {
            return;
        }
        for record in batch.iter() {
            match record.reason() {
                ChangeReason::Add | ChangeReason::Update => {
                    // The old resource must be gone before its replacement
                    // exists.
                    if let Some(old) = self.resources.remove(record.key()) {
                        drop(old);
                    }
                    let resource = (self.factory)(record.current(), record.key());
                    self.resources.insert(record.key().clone(), resource);
                }
                ChangeReason::Remove => {
                    self.resources.remove(record.key());
                }
                ChangeReason::Refresh | ChangeReason::Moved => {}
            }
        }
    }

    /// Releases every remaining resource and stops further creation.
    /// Idempotent.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.resources.clear();
    }
}

/// Factory-less variant: invokes a callback at the same transition points
/// instead of owning a resource.
///
/// The callback fires once per key with the replaced-on-update old value,
/// the removed value, and every remaining value at teardown.
pub struct OnItemRemoved<K, V, F> {
    callback: F,
    live: HashMap<K, V>,
    torn_down: bool,
}

impl<K, V, F> OnItemRemoved<K, V, F>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: FnMut(&V, &K),
{
    /// Creates the operator with an empty live-value table.
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            live: HashMap::new(),
            torn_down: false,
        }
    }

    /// Returns the number of tracked live values.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Observes one upstream batch, invoking the callback for each value
    /// that stops being current.
    pub fn process(&mut self, batch: &ChangeBatch<K, V>) {
        if self.torn_down {
            return;
        }
        for record in batch.iter() {
            let key = record.key();
            match record.reason() {
                ChangeReason::Add | ChangeReason::Update => {
                    if let Some(old) = self.live.insert(key.clone(), record.current().clone()) {
                        (self.callback)(&old, key);
                    }
                }
                ChangeReason::Remove => {
                    if let Some(old) = self.live.remove(key) {
                        (self.callback)(&old, key);
                    }
                }
                ChangeReason::Refresh | ChangeReason::Moved => {}
            }
        }
    }

    /// Invokes the callback once for every remaining value, then stops.
    /// Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for (key, value) in self.live.drain() {
            (self.callback)(&value, &key);
        }
    }
}
