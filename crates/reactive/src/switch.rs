//! Wired source-switching operator.
//!
//! Consumes a sequence of source caches, keeping one destination cache
//! that always mirrors the active source. Selecting a new source detaches
//! the previous one, then emits a single atomic batch clearing the
//! destination and repopulating it from the new source's snapshot;
//! subsequent batches from the active source are forwarded, while
//! stragglers from abandoned sources are discarded by generation.

use crate::pipe::SharedCache;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::rc::Rc;
use alloc::vec::Vec;
use beck_core::{ChangeBatch, Error};
use beck_operators::{SourceGeneration, SwitchCore};
use core::cell::RefCell;
use core::hash::Hash;

/// The single shared state struct of a switch: destination cache,
/// generation counter and downstream subscriptions, all inside one
/// mutual-exclusion domain (the `RefCell`), so clearing and repopulating
/// can never interleave across sources.
struct SwitchState<K, V> {
    core: SwitchCore<K, V>,
    subscriptions: SubscriptionManager<K, V>,
    terminated: bool,
}

struct ActiveSource<K, V> {
    source: SharedCache<K, V>,
    subscription: SubscriptionId,
}

/// A source-switching derived cache.
///
/// Callbacks attached to the switch must not re-enter it.
pub struct Switch<K, V> {
    state: Rc<RefCell<SwitchState<K, V>>>,
    active: Option<ActiveSource<K, V>>,
}

impl<K, V> Default for Switch<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Switch<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    /// Creates a switch with no active source and an empty destination.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SwitchState {
                core: SwitchCore::new(),
                subscriptions: SubscriptionManager::new(),
                terminated: false,
            })),
            active: None,
        }
    }

    /// Selects a new active source.
    ///
    /// The previous source is detached first; then one atomic batch is
    /// emitted in which every record of the old contents is removed before
    /// the first record of the new snapshot, so no observer sees a
    /// cleared-but-unpopulated destination or a mix of two sources.
    pub fn switch_to(&mut self, source: &SharedCache<K, V>) {
        self.detach_active();

        let (generation, batch) = {
            let mut state = self.state.borrow_mut();
            let src = source.borrow();
            let snapshot: Vec<(K, V)> = src
                .key_values()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            state.core.begin(snapshot)
        };
        if !batch.is_empty() {
            let state = self.state.borrow();
            if !state.terminated {
                state.subscriptions.notify_all(&batch);
            }
        }

        let batch_state = Rc::downgrade(&self.state);
        let error_state = Rc::downgrade(&self.state);
        let subscription = source.borrow_mut().subscribe_observer(
            move |batch| {
                if let Some(state) = batch_state.upgrade() {
                    let forwarded = state.borrow_mut().core.forward(generation, batch);
                    if let Some(batch) = forwarded {
                        let state = state.borrow();
                        if !state.terminated {
                            state.subscriptions.notify_all(&batch);
                        }
                    }
                }
            },
            move |error| {
                if let Some(state) = error_state.upgrade() {
                    let mut state = state.borrow_mut();
                    if !state.terminated {
                        state.terminated = true;
                        state.subscriptions.error_all(error);
                    }
                }
            },
            // Completion of an inner source does not complete the switch
            // output; only detach/complete on the switch itself does.
            || {},
        );

        self.active = Some(ActiveSource {
            source: Rc::clone(source),
            subscription,
        });
    }

    /// Returns the current source generation.
    pub fn generation(&self) -> SourceGeneration {
        self.state.borrow().core.generation()
    }

    /// Point-in-time read of the destination value for a key.
    pub fn get(&self, key: &K) -> Option<V> {
        self.state.borrow().core.destination().lookup(key).cloned()
    }

    /// Returns the destination's current key-value pairs.
    pub fn key_values(&self) -> Vec<(K, V)> {
        self.state
            .borrow()
            .core
            .destination()
            .key_values()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns the number of destination entries.
    pub fn len(&self) -> usize {
        self.state.borrow().core.destination().len()
    }

    /// Returns true if the destination holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().core.destination().is_empty()
    }

    /// Attaches a batch observer to the switch output.
    pub fn subscribe<F>(&mut self, on_batch: F) -> SubscriptionId
    where
        F: Fn(&ChangeBatch<K, V>) + 'static,
    {
        self.state.borrow_mut().subscriptions.subscribe(on_batch)
    }

    /// Attaches a full observer to the switch output.
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
        self.state
            .borrow_mut()
            .subscriptions
            .subscribe_observer(on_batch, on_error, on_completed)
    }

    /// Detaches an output observer. Idempotent.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.state.borrow_mut().subscriptions.unsubscribe(id)
    }

    /// Detaches from the active source without terminating the output.
    /// Idempotent.
    pub fn detach(&mut self) {
        self.detach_active();
    }

    /// Detaches from the active source and completes the output.
    /// Idempotent.
    pub fn complete(&mut self) {
        self.detach_active();
        let mut state = self.state.borrow_mut();
        if !state.terminated {
            state.terminated = true;
            state.subscriptions.complete_all();
        }
    }

    fn detach_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.source.borrow_mut().unsubscribe(active.subscription);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::ObservableCache;
    use crate::pipe::shared;
    use beck_core::ChangeReason;
    use core::cell::Cell;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: u32,
        value: i64,
    }

    fn item(id: u32, value: i64) -> Item {
        Item { id, value }
    }

    fn source(items: &[Item]) -> SharedCache<u32, Item> {
        let mut cache = ObservableCache::new(|item: &Item| item.id);
        cache
            .edit(|editor| {
                for item in items {
                    editor.add_or_update(item.clone());
                }
            })
            .unwrap();
        shared(cache)
    }

    #[test]
    fn test_switch_clears_before_repopulating() {
        let mut switch: Switch<u32, Item> = Switch::new();

        let batches: Rc<RefCell<Vec<ChangeBatch<u32, Item>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&batches);
        switch.subscribe(move |batch| sink.borrow_mut().push(batch.clone()));

        switch.switch_to(&source(&[item(1, 10), item(2, 20)]));
        switch.switch_to(&source(&[item(3, 30)]));

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);

        // The second emission removes everything before adding anything.
        let reasons: Vec<_> = batches[1].iter().map(|r| r.reason()).collect();
        assert_eq!(
            reasons,
            alloc::vec![ChangeReason::Remove, ChangeReason::Remove, ChangeReason::Add]
        );
        assert_eq!(switch.len(), 1);
        assert_eq!(switch.get(&3), Some(item(3, 30)));
    }

    #[test]
    fn test_switch_forwards_active_source_batches() {
        let mut switch: Switch<u32, Item> = Switch::new();
        let first = source(&[]);
        switch.switch_to(&first);

        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        switch.subscribe(move |_| c.set(c.get() + 1));

        first
            .borrow_mut()
            .edit(|editor| editor.add_or_update(item(1, 10)))
            .unwrap();

        assert_eq!(count.get(), 1);
        assert_eq!(switch.get(&1), Some(item(1, 10)));
    }

    #[test]
    fn test_switch_detaches_abandoned_source() {
        let mut switch: Switch<u32, Item> = Switch::new();
        let first = source(&[]);
        switch.switch_to(&first);
        assert_eq!(first.borrow().subscription_count(), 1);

        let second = source(&[]);
        switch.switch_to(&second);
        assert_eq!(first.borrow().subscription_count(), 0);

        // Edits on the abandoned source never reach the destination.
        first
            .borrow_mut()
            .edit(|editor| editor.add_or_update(item(9, 90)))
            .unwrap();
        assert!(switch.is_empty());
    }

    #[test]
    fn test_switch_never_mixes_sources_in_one_batch() {
        let mut switch: Switch<u32, Item> = Switch::new();

        let batches: Rc<RefCell<Vec<ChangeBatch<u32, Item>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&batches);
        switch.subscribe(move |batch| sink.borrow_mut().push(batch.clone()));

        let first = source(&[item(1, 10)]);
        let second = source(&[item(2, 20)]);
        switch.switch_to(&first);
        switch.switch_to(&second);
        second
            .borrow_mut()
            .edit(|editor| editor.add_or_update(item(3, 30)))
            .unwrap();

        // Per batch, keys belong to exactly one source's key space: batch 1
        // is {1}, batch 2 is remove(1)+add(2), batch 3 is {3}. A clear is
        // observed strictly before the first record of the new source.
        let batches = batches.borrow();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].records()[0].reason(), ChangeReason::Remove);
        assert_eq!(*batches[1].records()[0].key(), 1);
        assert_eq!(batches[1].records()[1].reason(), ChangeReason::Add);
        assert_eq!(*batches[1].records()[1].key(), 2);
    }

    #[test]
    fn test_switch_forwards_inner_error_and_terminates() {
        let mut switch: Switch<u32, Item> = Switch::new();
        let first = source(&[]);
        switch.switch_to(&first);

        let errors = Rc::new(Cell::new(0));
        let e = Rc::clone(&errors);
        switch.subscribe_observer(|_| {}, move |_| e.set(e.get() + 1), || {});

        first.borrow_mut().fail(Error::upstream("inner died"));
        assert_eq!(errors.get(), 1);
    }

    #[test]
    fn test_inner_completion_does_not_complete_switch() {
        let mut switch: Switch<u32, Item> = Switch::new();
        let first = source(&[]);
        switch.switch_to(&first);

        let dones = Rc::new(Cell::new(0));
        let d = Rc::clone(&dones);
        switch.subscribe_observer(|_| {}, |_| {}, move || d.set(d.get() + 1));

        first.borrow_mut().complete();
        assert_eq!(dones.get(), 0);

        switch.complete();
        assert_eq!(dones.get(), 1);

        // Idempotent.
        switch.complete();
        assert_eq!(dones.get(), 1);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut switch: Switch<u32, Item> = Switch::new();
        let first = source(&[]);
        switch.switch_to(&first);

        switch.detach();
        switch.detach();
        assert_eq!(first.borrow().subscription_count(), 0);
    }
}
