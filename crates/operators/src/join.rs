//! Incremental grouping joins.
//!
//! Joins a "one" side keyed by `KL` against a continuously maintained
//! grouping of a "many" side, where each many item maps to one `KL` via a
//! caller key-selector. The joined result for a key is re-evaluated
//! whenever either side's batch touches it; unaffected keys are never
//! revisited.

use crate::group::{Group, GroupBy};
use alloc::vec::Vec;
use beck_cache::Cache;
use beck_core::{ChangeBatch, ChangeReason, ChangeRecord};
use core::hash::Hash;
use hashbrown::HashSet;

/// Which keys of the one side surface in the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    /// Results exist only for keys present on the one side.
    Left,
    /// Results exist for keys present on either side; an absent one-side
    /// value surfaces as `None`.
    Full,
}

/// One joined result: the one-side value (absent only under a full join)
/// and the many-side grouping, which is always supplied and explicitly
/// empty when no many items exist for the key.
pub struct Joined<KL, L, KR, R> {
    left: Option<L>,
    group: Group<KL, KR, R>,
}

impl<KL, L, KR, R> Joined<KL, L, KR, R> {
    /// Returns the one-side value, if the key is present on the one side.
    #[inline]
    pub fn left(&self) -> Option<&L> {
        self.left.as_ref()
    }

    /// Returns the many-side grouping, possibly empty.
    #[inline]
    pub fn group(&self) -> &Group<KL, KR, R> {
        &self.group
    }
}

impl<KL: Clone, L: Clone, KR, R> Clone for Joined<KL, L, KR, R> {
    fn clone(&self) -> Self {
        Self {
            left: self.left.clone(),
            group: self.group.clone(),
        }
    }
}

impl<KL, L, KR, R> core::fmt::Debug for Joined<KL, L, KR, R>
where
    KL: core::fmt::Debug,
    L: core::fmt::Debug,
    KR: core::fmt::Debug,
    R: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Joined")
            .field("left", &self.left)
            .field("group", &self.group)
            .finish()
    }
}

impl<KL, L, KR, R> PartialEq for Joined<KL, L, KR, R>
where
    KL: PartialEq,
    L: PartialEq,
    KR: Eq + Hash,
    R: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left && self.group == other.group
    }
}

/// A stateful join of a one side against a grouped many side.
///
/// The kind is fixed at construction; both kinds keep the same state and
/// differ only in when a key is considered present in the result.
pub struct JoinMany<KL, L, KR, R, F> {
    kind: JoinKind,
    left: Cache<KL, L>,
    right: GroupBy<KR, R, KL, F>,
    results: Cache<KL, Joined<KL, L, KR, R>>,
}

impl<KL, L, KR, R, F> JoinMany<KL, L, KR, R, F>
where
    KL: Eq + Hash + Clone,
    L: Clone + PartialEq,
    KR: Eq + Hash + Clone,
    R: Clone + PartialEq,
    F: FnMut(&R) -> KL,
{
    /// Creates a join of the given kind; `right_key_of` maps each many
    /// item to its one-side key.
    pub fn new(kind: JoinKind, right_key_of: F) -> Self {
        Self {
            kind,
            left: Cache::new(),
            right: GroupBy::new(right_key_of),
            results: Cache::new(),
        }
    }

    /// Creates a left join.
    pub fn left_join(right_key_of: F) -> Self {
        Self::new(JoinKind::Left, right_key_of)
    }

    /// Creates a full join.
    pub fn full_join(right_key_of: F) -> Self {
        Self::new(JoinKind::Full, right_key_of)
    }

    /// Returns the join kind.
    #[inline]
    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Returns the current joined results.
    #[inline]
    pub fn results(&self) -> &Cache<KL, Joined<KL, L, KR, R>> {
        &self.results
    }

    /// Processes a one-side batch, re-evaluating every key it touches.
    pub fn on_left_batch(
        &mut self,
        batch: &ChangeBatch<KL, L>,
    ) -> ChangeBatch<KL, Joined<KL, L, KR, R>> {
        let mut affected: Vec<KL> = Vec::new();
        let mut seen: HashSet<KL> = HashSet::new();
        for record in batch.iter() {
            let key = record.key();
            match record.reason() {
                ChangeReason::Add | ChangeReason::Update => {
                    self.left.insert(key.clone(), record.current().clone());
                }
                ChangeReason::Remove => {
                    self.left.remove(key);
                }
                ChangeReason::Refresh => {}
                ChangeReason::Moved => continue,
            }
            if seen.insert(key.clone()) {
                affected.push(key.clone());
            }
        }

        let mut out = ChangeBatch::new();
        for key in affected {
            if let Some(record) = self.re_evaluate(key) {
                out.push(record);
            }
        }
        out
    }

    /// Processes a many-side batch, re-evaluating every one-side key whose
    /// grouping changed.
    pub fn on_right_batch(
        &mut self,
        batch: &ChangeBatch<KR, R>,
    ) -> ChangeBatch<KL, Joined<KL, L, KR, R>> {
        let grouped = self.right.process(batch);

        let mut out = ChangeBatch::new();
        for record in grouped.iter() {
            if let Some(record) = self.re_evaluate(record.key().clone()) {
                out.push(record);
            }
        }
        out
    }

    fn re_evaluate(&mut self, key: KL) -> Option<ChangeRecord<KL, Joined<KL, L, KR, R>>> {
        let left = self.left.lookup(&key).cloned();
        let group = self.right.group(&key);
        let has_many = group.as_ref().map_or(false, |g| !g.is_empty());

        let present = match self.kind {
            JoinKind::Left => left.is_some(),
            JoinKind::Full => left.is_some() || has_many,
        };

        let old = self.results.lookup(&key).cloned();
        match (old, present) {
            (None, false) => None,
            (None, true) => {
                let joined = Joined {
                    left,
                    group: group.unwrap_or_else(|| Group::empty(key.clone())),
                };
                self.results.insert(key.clone(), joined.clone());
                Some(ChangeRecord::add(key, joined))
            }
            (Some(old), true) => {
                let group = group.unwrap_or_else(|| Group::empty(key.clone()));
                if old.left == left && same_grouping(&old.group, &group) {
                    return None;
                }
                let joined = Joined { left, group };
                self.results.insert(key.clone(), joined.clone());
                Some(ChangeRecord::update(key, joined, old))
            }
            (Some(old), false) => {
                self.results.remove(&key);
                Some(ChangeRecord::remove(key, old))
            }
        }
    }
}

/// Snapshot sameness: pointer identity, or both explicitly empty.
fn same_grouping<GK, K, V>(a: &Group<GK, K, V>, b: &Group<GK, K, V>) -> bool {
    a.same_snapshot(b) || (a.is_empty() && b.is_empty())
}
