//! Observable keyed cache.
//!
//! `ObservableCache` is the capability surface of the engine: attach and
//! detach observers, apply atomic edits producing exactly one batch,
//! perform synchronous point-in-time reads, and terminate the stream with
//! an error or completion. Source caches own a key selector; derived
//! caches (pipeline outputs) are fed through `apply` and cannot be edited.

use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::boxed::Box;
use alloc::format;
use beck_cache::ChangeAwareCache;
use beck_core::{ChangeBatch, Error, Result};
use core::hash::Hash;

/// Fallible selector deriving a key from a value.
pub type KeySelector<K, V> = Box<dyn Fn(&V) -> Result<K>>;

/// A keyed cache that pushes one ordered change batch per edit to any
/// number of observers.
pub struct ObservableCache<K, V> {
    cache: ChangeAwareCache<K, V>,
    key_of: Option<KeySelector<K, V>>,
    subscriptions: SubscriptionManager<K, V>,
    terminated: bool,
}

impl<K, V> ObservableCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a source cache with an infallible key selector.
    pub fn new<F>(key_of: F) -> Self
    where
        F: Fn(&V) -> K + 'static,
    {
        Self::new_fallible(move |value| Ok(key_of(value)))
    }

    /// Creates a source cache with a fallible key selector.
    ///
    /// A selector failure inside an edit discards the pending batch,
    /// terminates the stream through the error channel and surfaces the
    /// wrapped error to the caller.
    pub fn new_fallible<F>(key_of: F) -> Self
    where
        F: Fn(&V) -> Result<K> + 'static,
    {
        Self {
            cache: ChangeAwareCache::new(),
            key_of: Some(Box::new(key_of)),
            subscriptions: SubscriptionManager::new(),
            terminated: false,
        }
    }

    /// Creates a derived cache: fed through [`apply`](Self::apply) by a
    /// pipeline stage, not editable directly.
    pub fn derived() -> Self {
        Self {
            cache: ChangeAwareCache::new(),
            key_of: None,
            subscriptions: SubscriptionManager::new(),
            terminated: false,
        }
    }

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

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if the cache holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns true once the stream has errored or completed.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Attaches a batch observer. Returns the detach handle.
    pub fn subscribe<F>(&mut self, on_batch: F) -> SubscriptionId
    where
        F: Fn(&ChangeBatch<K, V>) + 'static,
    {
        self.subscriptions.subscribe(on_batch)
    }

    /// Attaches a full observer with error and completion callbacks.
    pub fn subscribe_observer<B, E, C>(
        &mut self,
        on_batch: B,
        on_error: E,
        on_completed: C,
    ) -> SubscriptionId
    where
        B: Fn(&ChangeBatch<K, V>) + 'static,
        E: Fn(&Error) + 'static,
        C: Fn() + 'static,
    {
        self.subscriptions
            .subscribe_observer(on_batch, on_error, on_completed)
    }

    /// Detaches an observer. Idempotent.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Returns the number of attached observers.
    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns the current contents as one Add batch, for seeding a
    /// late-attaching downstream.
    pub fn snapshot_batch(&self) -> ChangeBatch<K, V> {
        self.cache
            .key_values()
            .map(|(k, v)| beck_core::ChangeRecord::add(k.clone(), v.clone()))
            .collect()
    }

    /// Applies an atomic group of mutations, producing exactly one batch
    /// to attached observers.
    ///
    /// A key selector or diff-equality failure inside the edit discards
    /// the pending batch (no partial batch is delivered), terminates the
    /// stream through the error channel, and is returned to the caller.
    pub fn edit<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut CacheEditor<'_, K, V>),
    {
        if self.terminated {
            return Err(Error::invalid_operation("stream already terminated"));
        }
        let key_of = match &self.key_of {
            Some(key_of) => key_of,
            None => {
                return Err(Error::invalid_operation(
                    "derived caches are fed by their upstream, not edited",
                ))
            }
        };

        let mut editor = CacheEditor {
            cache: &mut self.cache,
            key_of,
            error: None,
        };
        mutate(&mut editor);

        match editor.error.take() {
            Some(error) => {
                self.cache.discard_changes();
                self.terminated = true;
                self.subscriptions.error_all(&error);
                Err(error)
            }
            None => {
                let batch = self.cache.capture_changes();
                if !batch.is_empty() {
                    self.subscriptions.notify_all(&batch);
                }
                Ok(())
            }
        }
    }

    /// Ingests an upstream batch verbatim and re-emits it to observers.
    pub fn apply(&mut self, batch: &ChangeBatch<K, V>) {
        if self.terminated || batch.is_empty() {
            return;
        }
        self.cache.apply(batch);
        self.subscriptions.notify_all(batch);
    }

    /// Terminates the stream with an error. Idempotent.
    pub fn fail(&mut self, error: Error) {
        if !self.terminated {
            self.terminated = true;
            self.subscriptions.error_all(&error);
        }
    }

    /// Terminates the stream with completion. Idempotent.
    pub fn complete(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.subscriptions.complete_all();
        }
    }
}

/// Editing surface handed to [`ObservableCache::edit`] mutators.
///
/// After the first failure the editor goes inert: subsequent operations
/// are no-ops and the edit as a whole fails.
pub struct CacheEditor<'a, K, V> {
    cache: &'a mut ChangeAwareCache<K, V>,
    key_of: &'a KeySelector<K, V>,
    error: Option<Error>,
}

impl<K, V> CacheEditor<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Inserts or replaces a value under its derived key.
    pub fn add_or_update(&mut self, value: V) {
        if self.error.is_some() {
            return;
        }
        match (self.key_of)(&value) {
            Ok(key) => self.cache.add_or_update(key, value),
            Err(error) => self.error = Some(wrap_selector(error)),
        }
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if self.error.is_some() {
            return None;
        }
        self.cache.remove(key)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        if self.error.is_some() {
            return;
        }
        self.cache.clear();
    }

    /// Records a Refresh for a key.
    pub fn refresh(&mut self, key: &K) -> bool {
        if self.error.is_some() {
            return false;
        }
        self.cache.refresh(key)
    }

    /// Records a Refresh for every live key.
    pub fn refresh_all(&mut self) {
        if self.error.is_some() {
            return;
        }
        self.cache.refresh_all();
    }

    /// Diffs the cache against a target full set using the cache's own
    /// key selector, applying the minimal edit.
    pub fn edit_diff<I, E>(&mut self, target: I, mut eq: E)
    where
        I: IntoIterator<Item = V>,
        E: FnMut(&V, &V) -> bool,
    {
        if self.error.is_some() {
            return;
        }
        let key_of = self.key_of;
        if let Err(error) =
            self.cache
                .try_edit_diff(target, |value| key_of(value), |a, b| Ok(eq(a, b)))
        {
            self.error = Some(error);
        }
    }

    /// Point-in-time read of the value for a key.
    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.cache.lookup(key)
    }
}

fn wrap_selector(error: Error) -> Error {
    match error {
        Error::KeySelector { .. } => error,
        other => Error::key_selector(format!("{}", other)),
    }
}
