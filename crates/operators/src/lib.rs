//! Beck Operators - stateful change-stream operators for the beck engine.
//!
//! Each operator consumes one or more incoming change batches and produces
//! a new, internally consistent batch, maintaining exactly the private
//! state it needs to stay correct, minimal and order-preserving as its
//! upstream changes arbitrarily. Operators are plain batch-in/batch-out
//! state machines; the push boundary lives in `beck-reactive`.
//!
//! # Operators
//!
//! - `Filter`: membership transitions for a predicate-defined subset
//! - `Transform`: value mapping with correct transformed previous values
//! - `GroupBy` / `Group`: immutable group snapshots per derived group key
//! - `JoinMany` / `JoinKind`: left or full join of a one side against a
//!   grouped many side
//! - `PropertyRegroup` / `CoalesceTimer`: full regroup on a property
//!   trigger, optionally coalesced over a delay window
//! - `SubscribeMany` / `OnItemRemoved`: per-item resource attachment and
//!   removal notification
//! - `SwitchCore`: atomic clear-and-repopulate destination for
//!   source-switching streams
//!
//! # Example
//!
//! ```rust
//! use beck_core::{ChangeBatch, ChangeRecord};
//! use beck_operators::Filter;
//!
//! let mut filter = Filter::new(|v: &i64| *v > 10);
//! let batch: ChangeBatch<u32, i64> =
//!     [ChangeRecord::add(1, 5), ChangeRecord::add(2, 25)].into_iter().collect();
//!
//! let out = filter.process(&batch);
//! assert_eq!(out.len(), 1);
//! assert_eq!(*out.records()[0].key(), 2);
//! ```

#![no_std]

extern crate alloc;

mod attach;
mod filter;
mod group;
mod join;
mod regroup;
mod switch;
mod transform;

pub use attach::{OnItemRemoved, SubscribeMany};
pub use filter::Filter;
pub use group::{Group, GroupBy};
pub use join::{JoinKind, JoinMany, Joined};
pub use regroup::{CoalesceTimer, PropertyRegroup};
pub use switch::{SourceGeneration, SwitchCore};
pub use transform::Transform;
