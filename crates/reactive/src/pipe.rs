//! Pipeline glue.
//!
//! Binds a pure operator between an upstream observable cache and a fresh
//! derived cache: the stage is seeded with the upstream's current
//! contents, every upstream batch flows through the operator into the
//! derived cache, and terminal signals run the operator's teardown before
//! they are forwarded downstream.
//!
//! Stages hold their derived cache weakly, so dropping every handle to a
//! stage's output detaches it: later callbacks find the cache gone and do
//! nothing, and per-item stages still release their resources on terminal
//! signals.

use crate::observable::ObservableCache;
use alloc::rc::Rc;
use beck_operators::{Filter, OnItemRemoved, SubscribeMany, Transform};
use core::cell::RefCell;
use core::hash::Hash;

/// A shared handle to an observable cache, as pipeline stages hold them.
pub type SharedCache<K, V> = Rc<RefCell<ObservableCache<K, V>>>;

/// Wraps a cache in the shared handle used by pipeline stages.
pub fn shared<K, V>(cache: ObservableCache<K, V>) -> SharedCache<K, V> {
    Rc::new(RefCell::new(cache))
}

/// Connects a filter stage to `source`, returning the derived cache
/// holding the matching subset.
pub fn pipe_filter<K, V, P>(source: &mut ObservableCache<K, V>, predicate: P) -> SharedCache<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
    P: FnMut(&V) -> bool + 'static,
{
    let op = Rc::new(RefCell::new(Filter::new(predicate)));
    let out = shared(ObservableCache::derived());

    let seed = source.snapshot_batch();
    if !seed.is_empty() {
        let produced = op.borrow_mut().process(&seed);
        out.borrow_mut().apply(&produced);
    }

    let batch_out = Rc::downgrade(&out);
    let error_out = Rc::downgrade(&out);
    let done_out = Rc::downgrade(&out);
    source.subscribe_observer(
        move |batch| {
            if let Some(out) = batch_out.upgrade() {
                let produced = op.borrow_mut().process(batch);
                out.borrow_mut().apply(&produced);
            }
        },
        move |error| {
            if let Some(out) = error_out.upgrade() {
                out.borrow_mut().fail(error.clone());
            }
        },
        move || {
            if let Some(out) = done_out.upgrade() {
                out.borrow_mut().complete();
            }
        },
    );
    out
}

/// Connects a transform stage to `source`, returning the derived cache of
/// mapped values.
pub fn pipe_transform<K, V, U, F>(
    source: &mut ObservableCache<K, V>,
    mapper: F,
) -> SharedCache<K, U>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
    U: Clone + 'static,
    F: FnMut(&V, &K) -> U + 'static,
{
    let op = Rc::new(RefCell::new(Transform::new(mapper)));
    let out = shared(ObservableCache::derived());

    let seed = source.snapshot_batch();
    if !seed.is_empty() {
        let produced = op.borrow_mut().process(&seed);
        out.borrow_mut().apply(&produced);
    }

    let batch_out = Rc::downgrade(&out);
    let error_out = Rc::downgrade(&out);
    let done_out = Rc::downgrade(&out);
    source.subscribe_observer(
        move |batch| {
            if let Some(out) = batch_out.upgrade() {
                let produced = op.borrow_mut().process(batch);
                out.borrow_mut().apply(&produced);
            }
        },
        move |error| {
            if let Some(out) = error_out.upgrade() {
                out.borrow_mut().fail(error.clone());
            }
        },
        move || {
            if let Some(out) = done_out.upgrade() {
                out.borrow_mut().complete();
            }
        },
    );
    out
}

/// Connects a per-item resource scope to `source`.
///
/// The batch itself flows on unchanged into the returned derived cache.
/// Terminal signals release every held resource *before* they are
/// forwarded downstream; the operator handle is returned so a host
/// detaching the stage manually can run its teardown too.
pub fn pipe_subscribe_many<K, V, R, F>(
    source: &mut ObservableCache<K, V>,
    factory: F,
) -> (SharedCache<K, V>, Rc<RefCell<SubscribeMany<K, V, R, F>>>)
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
    R: 'static,
    F: FnMut(&V, &K) -> R + 'static,
{
    let op = Rc::new(RefCell::new(SubscribeMany::new(factory)));
    let out = shared(ObservableCache::derived());

    let seed = source.snapshot_batch();
    if !seed.is_empty() {
        op.borrow_mut().process(&seed);
        out.borrow_mut().apply(&seed);
    }

    let batch_op = Rc::clone(&op);
    let error_op = Rc::clone(&op);
    let done_op = Rc::clone(&op);
    let batch_out = Rc::downgrade(&out);
    let error_out = Rc::downgrade(&out);
    let done_out = Rc::downgrade(&out);
    source.subscribe_observer(
        move |batch| {
            batch_op.borrow_mut().process(batch);
            if let Some(out) = batch_out.upgrade() {
                out.borrow_mut().apply(batch);
            }
        },
        move |error| {
            // Resource release precedes error forwarding.
            error_op.borrow_mut().teardown();
            if let Some(out) = error_out.upgrade() {
                out.borrow_mut().fail(error.clone());
            }
        },
        move || {
            done_op.borrow_mut().teardown();
            if let Some(out) = done_out.upgrade() {
                out.borrow_mut().complete();
            }
        },
    );
    (out, op)
}

/// Connects a removal-notification scope to `source`; the factory-less
/// counterpart of [`pipe_subscribe_many`].
pub fn pipe_on_item_removed<K, V, F>(
    source: &mut ObservableCache<K, V>,
    callback: F,
) -> (SharedCache<K, V>, Rc<RefCell<OnItemRemoved<K, V, F>>>)
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
    F: FnMut(&V, &K) + 'static,
{
    let op = Rc::new(RefCell::new(OnItemRemoved::new(callback)));
    let out = shared(ObservableCache::derived());

    let seed = source.snapshot_batch();
    if !seed.is_empty() {
        op.borrow_mut().process(&seed);
        out.borrow_mut().apply(&seed);
    }

    let batch_op = Rc::clone(&op);
    let error_op = Rc::clone(&op);
    let done_op = Rc::clone(&op);
    let batch_out = Rc::downgrade(&out);
    let error_out = Rc::downgrade(&out);
    let done_out = Rc::downgrade(&out);
    source.subscribe_observer(
        move |batch| {
            batch_op.borrow_mut().process(batch);
            if let Some(out) = batch_out.upgrade() {
                out.borrow_mut().apply(batch);
            }
        },
        move |error| {
            error_op.borrow_mut().teardown();
            if let Some(out) = error_out.upgrade() {
                out.borrow_mut().fail(error.clone());
            }
        },
        move || {
            done_op.borrow_mut().teardown();
            if let Some(out) = done_out.upgrade() {
                out.borrow_mut().complete();
            }
        },
    );
    (out, op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use beck_core::{ChangeReason, Error};
    use core::cell::Cell;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: u32,
        value: i64,
    }

    fn item(id: u32, value: i64) -> Item {
        Item { id, value }
    }

    fn source() -> ObservableCache<u32, Item> {
        ObservableCache::new(|item: &Item| item.id)
    }

    #[test]
    fn test_pipe_filter_end_to_end() {
        let mut cache = source();
        cache
            .edit(|editor| {
                editor.add_or_update(item(1, 5));
                editor.add_or_update(item(2, 50));
            })
            .unwrap();

        // Seeded from the source's current contents.
        let filtered = pipe_filter(&mut cache, |item: &Item| item.value > 10);
        assert_eq!(filtered.borrow().len(), 1);
        assert!(filtered.borrow().contains_key(&2));

        // Membership transitions flow through.
        cache
            .edit(|editor| editor.add_or_update(item(1, 15)))
            .unwrap();
        assert_eq!(filtered.borrow().len(), 2);

        cache.edit(|editor| editor.add_or_update(item(2, 3))).unwrap();
        assert_eq!(filtered.borrow().len(), 1);
        assert!(filtered.borrow().contains_key(&1));
    }

    #[test]
    fn test_pipe_filter_forwards_terminal_error() {
        let mut cache = source();
        let filtered = pipe_filter(&mut cache, |item: &Item| item.value > 10);

        let errors = Rc::new(Cell::new(0));
        let e = Rc::clone(&errors);
        filtered
            .borrow_mut()
            .subscribe_observer(|_| {}, move |_| e.set(e.get() + 1), || {});

        cache.fail(Error::upstream("gone"));
        assert_eq!(errors.get(), 1);
        assert!(filtered.borrow().is_terminated());
    }

    #[test]
    fn test_dropped_output_detaches_stage() {
        let mut cache = source();
        let filtered = pipe_filter(&mut cache, |item: &Item| item.value > 10);
        drop(filtered);

        // The stage is inert: upstream edits no longer reach anything.
        cache
            .edit(|editor| editor.add_or_update(item(1, 50)))
            .unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_pipe_transform_chains_with_filter() {
        let mut cache = source();
        cache
            .edit(|editor| {
                editor.add_or_update(item(1, 4));
                editor.add_or_update(item(2, 6));
            })
            .unwrap();

        let doubled = pipe_transform(&mut cache, |item: &Item, _key: &u32| item.value * 2);
        // Output of one stage is valid input to the next.
        let big = pipe_filter(&mut *doubled.borrow_mut(), |value: &i64| *value > 10);

        assert_eq!(doubled.borrow().lookup(&1), Some(&8));
        assert_eq!(big.borrow().len(), 1);
        assert!(big.borrow().contains_key(&2));

        cache.edit(|editor| editor.add_or_update(item(1, 7))).unwrap();
        assert_eq!(doubled.borrow().lookup(&1), Some(&14));
        assert_eq!(big.borrow().len(), 2);
    }

    #[test]
    fn test_pipe_subscribe_many_releases_before_error_forwarding() {
        struct Resource {
            releases: Rc<Cell<u32>>,
        }
        impl Drop for Resource {
            fn drop(&mut self) {
                self.releases.set(self.releases.get() + 1);
            }
        }

        let mut cache = source();
        cache
            .edit(|editor| {
                editor.add_or_update(item(1, 5));
                editor.add_or_update(item(2, 50));
            })
            .unwrap();

        let releases = Rc::new(Cell::new(0));
        let factory_releases = Rc::clone(&releases);
        let (out, op) = pipe_subscribe_many(&mut cache, move |_: &Item, _: &u32| Resource {
            releases: Rc::clone(&factory_releases),
        });
        assert_eq!(op.borrow().resource_count(), 2);

        // When the error reaches the downstream observer, every resource
        // has already been released.
        let seen = Rc::new(Cell::new(0u32));
        let seen_at_error = Rc::clone(&seen);
        let releases_at_error = Rc::clone(&releases);
        out.borrow_mut().subscribe_observer(
            |_| {},
            move |_| seen_at_error.set(releases_at_error.get()),
            || {},
        );

        cache.fail(Error::upstream("gone"));
        assert_eq!(releases.get(), 2);
        assert_eq!(seen.get(), 2);
        assert_eq!(op.borrow().resource_count(), 0);
    }

    #[test]
    fn test_pipe_on_item_removed_fires_at_completion() {
        let mut cache = source();
        cache
            .edit(|editor| {
                editor.add_or_update(item(1, 5));
            })
            .unwrap();

        let removed: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&removed);
        let (out, _op) =
            pipe_on_item_removed(&mut cache, move |_: &Item, key: &u32| {
                sink.borrow_mut().push(*key)
            });

        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        out.borrow_mut().subscribe_observer(|_| {}, |_| {}, move || d.set(true));

        cache.complete();
        assert_eq!(*removed.borrow(), alloc::vec![1]);
        assert!(done.get());
    }

    #[test]
    fn test_pipe_preserves_batch_order_downstream() {
        let mut cache = source();
        let filtered = pipe_filter(&mut cache, |item: &Item| item.value > 0);

        let reasons: Rc<RefCell<Vec<ChangeReason>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reasons);
        filtered.borrow_mut().subscribe(move |batch| {
            sink.borrow_mut().extend(batch.iter().map(|r| r.reason()));
        });

        cache
            .edit(|editor| {
                editor.add_or_update(item(1, 1));
                editor.remove(&1);
                editor.add_or_update(item(1, 2));
            })
            .unwrap();

        assert_eq!(
            *reasons.borrow(),
            alloc::vec![ChangeReason::Add, ChangeReason::Remove, ChangeReason::Add]
        );
    }
}
