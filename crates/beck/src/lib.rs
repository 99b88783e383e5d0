//! Beck - incremental change propagation for keyed collections.
//!
//! A keyed, mutable cache propagates every mutation as an ordered batch of
//! typed change records to any number of derived views, built by composing
//! operators — filter, transform, diff-against-target, join, group,
//! per-item resource attachment, source switching — each of which derives
//! a new, internally consistent change stream without rescanning the full
//! collection.
//!
//! This crate is the umbrella over the engine's four layers:
//!
//! - [`beck_core`]: change records, batches and errors
//! - [`beck_cache`]: keyed caches and the staged diff engine
//! - [`beck_operators`]: the stateful batch-in/batch-out operators
//! - [`beck_reactive`]: subscriptions, observable caches and pipeline glue
//!
//! # Example
//!
//! ```rust
//! use beck::{pipe_filter, ObservableCache};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Order { id: u64, total: i64 }
//!
//! let mut orders = ObservableCache::new(|o: &Order| o.id);
//! let large = pipe_filter(&mut orders, |o: &Order| o.total >= 1000);
//!
//! orders.edit(|editor| {
//!     editor.add_or_update(Order { id: 1, total: 250 });
//!     editor.add_or_update(Order { id: 2, total: 4000 });
//! }).unwrap();
//!
//! assert_eq!(large.borrow().len(), 1);
//! assert!(large.borrow().contains_key(&2));
//! ```

#![no_std]

pub use beck_cache::{Cache, ChangeAwareCache};
pub use beck_core::{ChangeBatch, ChangeReason, ChangeRecord, Error, Result};
pub use beck_operators::{
    CoalesceTimer, Filter, Group, GroupBy, JoinKind, JoinMany, Joined, OnItemRemoved,
    PropertyRegroup, SourceGeneration, SubscribeMany, SwitchCore, Transform,
};
pub use beck_reactive::{
    pipe_filter, pipe_on_item_removed, pipe_subscribe_many, pipe_transform, shared, CacheEditor,
    KeySelector, ObservableCache, SharedCache, Subscription, SubscriptionId, SubscriptionManager,
    Switch,
};
