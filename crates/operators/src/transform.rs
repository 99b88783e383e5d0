//! Incremental transform operator.
//!
//! Maps each value through a caller-supplied function, preserving keys and
//! reasons. A side cache of transformed values supplies the correct
//! previous/current values for Update, Remove, Refresh and Moved records
//! without re-invoking the mapper on old inputs.

use beck_cache::Cache;
use beck_core::{ChangeBatch, ChangeReason, ChangeRecord};
use core::hash::Hash;

/// A stateful value transform over a keyed change stream.
pub struct Transform<K, V, U, F> {
    mapper: F,
    transformed: Cache<K, U>,
    _marker: core::marker::PhantomData<fn(&V)>,
}

impl<K, V, U, F> Transform<K, V, U, F>
where
    K: Eq + Hash + Clone,
    U: Clone,
    F: FnMut(&V, &K) -> U,
{
    /// Creates a transform with an empty side cache.
    pub fn new(mapper: F) -> Self {
        Self {
            mapper,
            transformed: Cache::new(),
            _marker: core::marker::PhantomData,
        }
    }

    /// Returns the current transformed values.
    #[inline]
    pub fn transformed(&self) -> &Cache<K, U> {
        &self.transformed
    }

    /// Processes one upstream batch, emitting one transformed record per
    /// consumed record in upstream order.
    pub fn process(&mut self, batch: &ChangeBatch<K, V>) -> ChangeBatch<K, U> {
        let mut out = ChangeBatch::with_capacity(batch.len());
        for record in batch.iter() {
            let key = record.key();
            match record.reason() {
                ChangeReason::Add | ChangeReason::Update => {
                    let mapped = (self.mapper)(record.current(), key);
                    match self.transformed.insert(key.clone(), mapped.clone()) {
                        None => out.push(ChangeRecord::add(key.clone(), mapped)),
                        Some(previous) => {
                            out.push(ChangeRecord::update(key.clone(), mapped, previous));
                        }
                    }
                }
                ChangeReason::Remove => {
                    if let Some(old) = self.transformed.remove(key) {
                        out.push(ChangeRecord::remove(key.clone(), old));
                    }
                }
                ChangeReason::Refresh => {
                    if let Some(current) = self.transformed.lookup(key) {
                        out.push(ChangeRecord::refresh(key.clone(), current.clone()));
                    }
                }
                ChangeReason::Moved => {
                    if let Some(current) = self.transformed.lookup(key) {
                        out.push(ChangeRecord::moved(key.clone(), current.clone()));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::Cell;

    fn batch(records: Vec<ChangeRecord<u32, i64>>) -> ChangeBatch<u32, i64> {
        records.into_iter().collect()
    }

    #[test]
    fn test_transform_add_and_update() {
        let mut transform = Transform::new(|v: &i64, _k: &u32| v * 2);

        let out = transform.process(&batch(vec![ChangeRecord::add(1, 10)]));
        assert_eq!(out.records()[0].reason(), ChangeReason::Add);
        assert_eq!(*out.records()[0].current(), 20);

        let out = transform.process(&batch(vec![ChangeRecord::update(1, 15, 10)]));
        assert_eq!(out.records()[0].reason(), ChangeReason::Update);
        assert_eq!(*out.records()[0].current(), 30);
        // Previous is the previously transformed value, not a re-mapping.
        assert_eq!(out.records()[0].previous(), Some(&20));
    }

    #[test]
    fn test_transform_remove_carries_last_transformed() {
        let mut transform = Transform::new(|v: &i64, _: &u32| v + 1);
        transform.process(&batch(vec![ChangeRecord::add(1, 10)]));

        let out = transform.process(&batch(vec![ChangeRecord::remove(1, 10)]));
        assert_eq!(out.records()[0].reason(), ChangeReason::Remove);
        assert_eq!(*out.records()[0].current(), 11);
        assert!(transform.transformed().is_empty());
    }

    #[test]
    fn test_transform_refresh_does_not_remap() {
        let calls = Cell::new(0u32);
        let mut transform = Transform::new(|v: &i64, _: &u32| {
            calls.set(calls.get() + 1);
            v * 2
        });
        transform.process(&batch(vec![ChangeRecord::add(1, 10)]));
        assert_eq!(calls.get(), 1);

        let out = transform.process(&batch(vec![ChangeRecord::refresh(1, 10)]));
        assert_eq!(calls.get(), 1);
        assert_eq!(out.records()[0].reason(), ChangeReason::Refresh);
        assert_eq!(*out.records()[0].current(), 20);
    }

    #[test]
    fn test_transform_key_is_available_to_mapper() {
        let mut transform =
            Transform::new(|v: &i64, k: &u32| alloc::format!("{}:{}", k, v));

        let out = transform.process(&batch(vec![ChangeRecord::add(7, 1)]));
        let current: &String = out.records()[0].current();
        assert_eq!(current, "7:1");
    }

    #[test]
    fn test_transform_preserves_order() {
        let mut transform = Transform::new(|v: &i64, _: &u32| *v);

        let out = transform.process(&batch(vec![
            ChangeRecord::add(1, 1),
            ChangeRecord::remove(1, 1),
            ChangeRecord::add(1, 2),
        ]));
        let reasons: Vec<_> = out.iter().map(|r| r.reason()).collect();
        assert_eq!(
            reasons,
            vec![ChangeReason::Add, ChangeReason::Remove, ChangeReason::Add]
        );
    }
}
