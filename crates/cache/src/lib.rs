//! Beck Cache - keyed state for the beck engine.
//!
//! This crate provides the mutable keyed stores that every beck operator
//! builds on:
//!
//! - `Cache<K, V>`: a keyed mapping with no iteration-order guarantee,
//!   mutated by applying change batches in record order
//! - `ChangeAwareCache<K, V>`: a cache that additionally accumulates one
//!   change record per logical mutation into a pending batch, drained
//!   atomically by `capture_changes`
//! - `edit_diff` / `try_edit_diff`: the staged diff engine that turns a
//!   target full set into a minimal remove/add-or-update batch
//!
//! # Example
//!
//! ```rust
//! use beck_cache::ChangeAwareCache;
//! use beck_core::ChangeReason;
//!
//! let mut cache = ChangeAwareCache::new();
//! cache.add_or_update(1u32, "a");
//! cache.add_or_update(2u32, "b");
//! cache.edit_diff(["a", "c"], |v| if *v == "a" { 1 } else { 3 }, |a, b| a == b);
//!
//! let batch = cache.capture_changes();
//! // 1:"a" survives silently; 2:"b" is removed; 3:"c" is added
//! assert_eq!(batch.count_of(ChangeReason::Remove), 1);
//! ```

#![no_std]

extern crate alloc;

mod cache;
mod change_aware;
mod diff;

pub use cache::Cache;
pub use change_aware::ChangeAwareCache;
