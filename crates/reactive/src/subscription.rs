//! Subscription management for observable caches.
//!
//! A subscription carries a batch callback and optional error/completion
//! callbacks. The manager delivers batches to every active subscription in
//! registration-independent order; error and completion are terminal and
//! detach everything after delivery.

use alloc::boxed::Box;
use alloc::vec::Vec;
use beck_core::{ChangeBatch, Error};
use hashbrown::HashMap;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for batch delivery.
pub type BatchCallback<K, V> = Box<dyn Fn(&ChangeBatch<K, V>)>;

/// Callback type for terminal errors.
pub type ErrorCallback = Box<dyn Fn(&Error)>;

/// Callback type for completion.
pub type CompletedCallback = Box<dyn Fn()>;

/// A subscription to an observable cache.
pub struct Subscription<K, V> {
    id: SubscriptionId,
    on_batch: BatchCallback<K, V>,
    on_error: Option<ErrorCallback>,
    on_completed: Option<CompletedCallback>,
    active: bool,
}

impl<K, V> Subscription<K, V> {
    /// Creates a batch-only subscription.
    pub fn new<F>(id: SubscriptionId, on_batch: F) -> Self
    where
        F: Fn(&ChangeBatch<K, V>) + 'static,
    {
        Self {
            id,
            on_batch: Box::new(on_batch),
            on_error: None,
            on_completed: None,
            active: true,
        }
    }

    /// Creates a subscription with error and completion callbacks.
    pub fn with_observer(
        id: SubscriptionId,
        on_batch: BatchCallback<K, V>,
        on_error: ErrorCallback,
        on_completed: CompletedCallback,
    ) -> Self {
        Self {
            id,
            on_batch,
            on_error: Some(on_error),
            on_completed: Some(on_completed),
            active: true,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether this subscription is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivates this subscription.
    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Delivers a batch to this subscription.
    pub fn notify(&self, batch: &ChangeBatch<K, V>) {
        if self.active {
            (self.on_batch)(batch);
        }
    }

    /// Delivers a terminal error to this subscription.
    pub fn notify_error(&self, error: &Error) {
        if self.active {
            if let Some(on_error) = &self.on_error {
                on_error(error);
            }
        }
    }

    /// Delivers completion to this subscription.
    pub fn notify_completed(&self) {
        if self.active {
            if let Some(on_completed) = &self.on_completed {
                on_completed();
            }
        }
    }
}

/// Manages the subscriptions of one observable cache.
pub struct SubscriptionManager<K, V> {
    subscriptions: HashMap<SubscriptionId, Subscription<K, V>>,
    next_id: SubscriptionId,
}

impl<K, V> Default for SubscriptionManager<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SubscriptionManager<K, V> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Subscribes a batch callback. Returns the ID used to detach.
    pub fn subscribe<F>(&mut self, on_batch: F) -> SubscriptionId
    where
        F: Fn(&ChangeBatch<K, V>) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, Subscription::new(id, on_batch));
        id
    }

    /// Subscribes a full observer with error and completion callbacks.
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
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(
            id,
            Subscription::with_observer(
                id,
                Box::new(on_batch),
                Box::new(on_error),
                Box::new(on_completed),
            ),
        );
        id
    }

    /// Detaches by ID. Idempotent: returns false if already detached.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Delivers a batch to all active subscriptions.
    pub fn notify_all(&self, batch: &ChangeBatch<K, V>) {
        for subscription in self.subscriptions.values() {
            subscription.notify(batch);
        }
    }

    /// Delivers a terminal error to all subscriptions, then detaches them.
    ///
    /// Every subscriber sees the error; one subscriber cannot suppress
    /// delivery to the others.
    pub fn error_all(&mut self, error: &Error) {
        for subscription in self.subscriptions.values() {
            subscription.notify_error(error);
        }
        self.subscriptions.clear();
    }

    /// Delivers completion to all subscriptions, then detaches them.
    pub fn complete_all(&mut self) {
        for subscription in self.subscriptions.values() {
            subscription.notify_completed();
        }
        self.subscriptions.clear();
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Returns all subscription IDs.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions.keys().copied().collect()
    }
}
