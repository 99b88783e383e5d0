//! Property-triggered regroup with optional coalescing.
//!
//! Wraps the grouping operator with a secondary trigger: a "property
//! changed" firing re-evaluates the group key for all items and runs a
//! fresh diff/apply cycle, independently of the primary change stream.
//! With a coalescing window, bursts of triggers collapse into one regroup
//! pass when the window elapses.

use crate::group::{Group, GroupBy};
use beck_core::ChangeBatch;
use core::hash::Hash;

/// A cancellable single-shot timer owned by the regroup operator.
///
/// The timing source itself is external; the operator only demands that
/// `restart` cancels any pending shot and schedules a new one, and that the
/// host calls [`PropertyRegroup::on_window_elapsed`] when the shot fires.
pub trait CoalesceTimer {
    /// Cancels any pending shot and schedules a new one.
    fn restart(&mut self);
    /// Cancels any pending shot.
    fn cancel(&mut self);
}

/// No-op timer for operators constructed without a coalescing window.
impl CoalesceTimer for () {
    fn restart(&mut self) {}
    fn cancel(&mut self) {}
}

/// A grouping that re-evaluates membership when a designated property
/// changes, optionally coalescing trigger bursts over a delay window.
pub struct PropertyRegroup<K, V, GK, F, T = ()> {
    groups: GroupBy<K, V, GK, F>,
    window: Option<T>,
    pending: bool,
    torn_down: bool,
}

impl<K, V, GK, F> PropertyRegroup<K, V, GK, F, ()>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
    GK: Eq + Hash + Clone,
    F: FnMut(&V) -> GK,
{
    /// Creates a regrouper without a coalescing window: every trigger
    /// regroups immediately.
    pub fn new(key_of: F) -> Self {
        Self {
            groups: GroupBy::new(key_of),
            window: None,
            pending: false,
            torn_down: false,
        }
    }
}

impl<K, V, GK, F, T> PropertyRegroup<K, V, GK, F, T>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
    GK: Eq + Hash + Clone,
    F: FnMut(&V) -> GK,
    T: CoalesceTimer,
{
    /// Creates a regrouper that coalesces triggers over the given timer's
    /// window.
    pub fn with_window(key_of: F, timer: T) -> Self {
        Self {
            groups: GroupBy::new(key_of),
            window: Some(timer),
            pending: false,
            torn_down: false,
        }
    }

    /// Returns the underlying grouping.
    #[inline]
    pub fn groups(&self) -> &GroupBy<K, V, GK, F> {
        &self.groups
    }

    /// Processes a primary-stream batch. Never coalesced.
    pub fn process(&mut self, batch: &ChangeBatch<K, V>) -> ChangeBatch<GK, Group<GK, K, V>> {
        if self.torn_down {
            return ChangeBatch::new();
        }
        self.groups.process(batch)
    }

    /// Handles one firing of the property-changed trigger.
    ///
    /// Without a window the regroup pass runs immediately and its batch is
    /// returned. With a window the trigger is coalesced: the timer is
    /// restarted and `None` is returned; the pass runs when the window
    /// elapses.
    pub fn on_trigger(&mut self) -> Option<ChangeBatch<GK, Group<GK, K, V>>> {
        if self.torn_down {
            return None;
        }
        match &mut self.window {
            Some(timer) => {
                self.pending = true;
                timer.restart();
                None
            }
            None => Some(self.groups.regroup()),
        }
    }

    /// Runs the coalesced regroup pass after the delay window elapsed.
    ///
    /// Returns an empty batch if no trigger fired since the last pass.
    pub fn on_window_elapsed(&mut self) -> ChangeBatch<GK, Group<GK, K, V>> {
        if self.torn_down || !self.pending {
            return ChangeBatch::new();
        }
        self.pending = false;
        self.groups.regroup()
    }

    /// Tears the operator down: cancels the timer and drops any pending
    /// trigger. Idempotent; a torn-down operator emits nothing.
    pub fn teardown(&mut self) {
        if let Some(timer) = &mut self.window {
            timer.cancel();
        }
        self.pending = false;
        self.torn_down = true;
    }
}
