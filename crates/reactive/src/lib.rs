//! Beck Reactive - the push boundary of the beck engine.
//!
//! This crate connects the pure batch-in/batch-out operators of
//! `beck-operators` to a single-threaded push runtime:
//!
//! - `ObservableCache`: the capability surface — attach/detach observers,
//!   atomic `edit` producing exactly one batch, synchronous reads,
//!   terminal error/completion signals
//! - `SubscriptionManager`: ordered batch delivery with error and
//!   completion channels
//! - `pipe_*` helpers: bind an operator between an upstream cache and a
//!   fresh derived cache, seeding it from the upstream snapshot and
//!   running operator teardown before terminal signals are forwarded
//! - `Switch`: the wired source-switching cache
//!
//! # Example
//!
//! ```rust
//! use beck_reactive::{pipe_filter, ObservableCache};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Reading { sensor: u32, value: i64 }
//!
//! let mut cache = ObservableCache::new(|r: &Reading| r.sensor);
//! let hot = pipe_filter(&mut cache, |r: &Reading| r.value > 100);
//!
//! cache.edit(|editor| {
//!     editor.add_or_update(Reading { sensor: 1, value: 40 });
//!     editor.add_or_update(Reading { sensor: 2, value: 140 });
//! }).unwrap();
//!
//! assert_eq!(hot.borrow().len(), 1);
//! ```

#![no_std]

extern crate alloc;

mod observable;
mod pipe;
mod subscription;
mod switch;

pub use observable::{CacheEditor, KeySelector, ObservableCache};
pub use pipe::{
    pipe_filter, pipe_on_item_removed, pipe_subscribe_many, pipe_transform, shared, SharedCache,
};
pub use subscription::{
    BatchCallback, CompletedCallback, ErrorCallback, Subscription, SubscriptionId,
    SubscriptionManager,
};
pub use switch::Switch;

// Re-export commonly used types from dependencies
pub use beck_core::{ChangeBatch, ChangeReason, ChangeRecord, Error, Result};
pub use beck_operators::{
    CoalesceTimer, Filter, Group, GroupBy, JoinKind, JoinMany, Joined, OnItemRemoved,
    PropertyRegroup, SourceGeneration, SubscribeMany, SwitchCore, Transform,
};
