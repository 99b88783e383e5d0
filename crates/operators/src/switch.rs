//! Source-switch core.
//!
//! Keeps the destination cache of a source-switching stream consistent: on
//! selection of a new source the destination is cleared and repopulated in
//! one atomic batch, and batches from abandoned sources are discarded via a
//! generation counter, so no emitted batch ever mixes two sources.

use beck_cache::Cache;
use beck_core::{ChangeBatch, ChangeRecord};
use core::hash::Hash;

/// Generation of the active source. Bumped on every switch.
pub type SourceGeneration = u64;

/// Destination state of a source-switching stream.
pub struct SwitchCore<K, V> {
    destination: Cache<K, V>,
    generation: SourceGeneration,
}

impl<K, V> Default for SwitchCore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SwitchCore<K, V> {
    /// Creates a switch core with an empty destination.
    pub fn new() -> Self {
        Self {
            destination: Cache::new(),
            generation: 0,
        }
    }

    /// Returns the current source generation.
    #[inline]
    pub fn generation(&self) -> SourceGeneration {
        self.generation
    }

    /// Returns the destination cache.
    #[inline]
    pub fn destination(&self) -> &Cache<K, V> {
        &self.destination
    }
}

impl<K, V> SwitchCore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Activates a new source.
    ///
    /// Bumps the generation and produces one atomic batch: removes for
    /// every current destination entry followed by adds for the new
    /// source's snapshot, so observable clearing precedes observable
    /// repopulation and no intermediate state is visible.
    pub fn begin<I>(&mut self, snapshot: I) -> (SourceGeneration, ChangeBatch<K, V>)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.generation += 1;

        let mut batch = ChangeBatch::new();
        for (key, value) in self.destination.drain() {
            batch.push(ChangeRecord::remove(key, value));
        }
        for (key, value) in snapshot {
            batch.push(ChangeRecord::add(key.clone(), value.clone()));
            self.destination.insert(key, value);
        }
        (self.generation, batch)
    }

    /// Forwards a batch from the source of the given generation.
    ///
    /// Returns `None` for stale generations (batches from an abandoned
    /// source), otherwise applies the batch to the destination and hands
    /// it back for emission.
    pub fn forward(
        &mut self,
        generation: SourceGeneration,
        batch: &ChangeBatch<K, V>,
    ) -> Option<ChangeBatch<K, V>> {
        if generation != self.generation {
            return None;
        }
        self.destination.apply(batch);
        Some(batch.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use beck_core::{ChangeReason, ChangeRecord};

    #[test]
    fn test_begin_emits_clear_before_repopulation() {
        let mut core: SwitchCore<u32, &str> = SwitchCore::new();

        let (gen1, batch) = core.begin(vec![(1, "a"), (2, "b")]);
        assert_eq!(gen1, 1);
        assert_eq!(batch.count_of(ChangeReason::Add), 2);
        assert_eq!(batch.count_of(ChangeReason::Remove), 0);

        let (gen2, batch) = core.begin(vec![(3, "c")]);
        assert_eq!(gen2, 2);
        // Every record of the old source is removed strictly before the
        // first record of the new one.
        let reasons: Vec<_> = batch.iter().map(|r| r.reason()).collect();
        assert_eq!(
            reasons,
            vec![ChangeReason::Remove, ChangeReason::Remove, ChangeReason::Add]
        );
        assert_eq!(core.destination().len(), 1);
        assert_eq!(core.destination().lookup(&3), Some(&"c"));
    }

    #[test]
    fn test_forward_applies_current_generation() {
        let mut core: SwitchCore<u32, &str> = SwitchCore::new();
        let (generation, _) = core.begin(Vec::new());

        let mut batch = ChangeBatch::new();
        batch.push(ChangeRecord::add(1, "a"));

        let out = core.forward(generation, &batch);
        assert_eq!(out.unwrap().len(), 1);
        assert_eq!(core.destination().lookup(&1), Some(&"a"));
    }

    #[test]
    fn test_forward_discards_stale_generation() {
        let mut core: SwitchCore<u32, &str> = SwitchCore::new();
        let (old_generation, _) = core.begin(vec![(1, "a")]);
        core.begin(Vec::new());

        // A straggler from the abandoned source must not leak through.
        let mut batch = ChangeBatch::new();
        batch.push(ChangeRecord::add(9, "stale"));

        assert!(core.forward(old_generation, &batch).is_none());
        assert!(core.destination().is_empty());
    }

    #[test]
    fn test_switch_to_empty_source_clears() {
        let mut core: SwitchCore<u32, &str> = SwitchCore::new();
        core.begin(vec![(1, "a")]);

        let (_, batch) = core.begin(Vec::new());
        assert_eq!(batch.count_of(ChangeReason::Remove), 1);
        assert!(core.destination().is_empty());
    }
}
