//! Incremental filter operator.
//!
//! Maintains the subset of a keyed stream matching a predicate and derives
//! membership transitions per incoming record, without rescanning the
//! source collection.

use beck_cache::{Cache, ChangeAwareCache};
use beck_core::{ChangeBatch, ChangeReason};
use core::hash::Hash;

/// A stateful filter over a keyed change stream.
///
/// The operator owns a change-aware cache holding exactly the items that
/// currently match. Each incoming record is turned into the membership
/// transition it implies: entering the subset emits Add, leaving it emits
/// Remove, staying inside emits Update or Refresh, staying outside emits
/// nothing. The predicate is evaluated at most once per incoming record.
pub struct Filter<K, V, P> {
    predicate: P,
    filtered: ChangeAwareCache<K, V>,
}

impl<K, V, P> Filter<K, V, P>
where
    K: Eq + Hash + Clone,
    V: Clone,
    P: FnMut(&V) -> bool,
{
    /// Creates a filter with an empty subset cache.
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            filtered: ChangeAwareCache::new(),
        }
    }

    /// Returns the current matching subset.
    #[inline]
    pub fn filtered(&self) -> &Cache<K, V> {
        self.filtered.cache()
    }

    /// Returns the number of matching items.
    #[inline]
    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    /// Returns true if nothing currently matches.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// Processes one upstream batch, emitting the membership transitions in
    /// upstream record order.
    pub fn process(&mut self, batch: &ChangeBatch<K, V>) -> ChangeBatch<K, V> {
        for record in batch.iter() {
            let key = record.key();
            let was = self.filtered.contains_key(key);

            match record.reason() {
                ChangeReason::Remove => {
                    if was {
                        self.filtered.remove(key);
                    }
                }
                ChangeReason::Moved => {
                    // Passes through unchanged iff the item currently
                    // matches; the predicate is not consulted.
                    if was {
                        self.filtered.moved(key);
                    }
                }
                ChangeReason::Add | ChangeReason::Update | ChangeReason::Refresh => {
                    let matches = (self.predicate)(record.current());
                    match (was, matches) {
                        (false, false) => {}
                        (false, true) => {
                            self.filtered.add_or_update(key.clone(), record.current().clone());
                        }
                        (true, false) => {
                            self.filtered.remove(key);
                        }
                        (true, true) => {
                            if record.reason() == ChangeReason::Refresh {
                                self.filtered.refresh(key);
                            } else {
                                self.filtered.add_or_update(key.clone(), record.current().clone());
                            }
                        }
                    }
                }
            }
        }
        self.filtered.capture_changes()
    }
}
