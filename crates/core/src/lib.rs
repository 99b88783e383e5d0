//! Beck Core - change records, batches and errors for the beck engine.
//!
//! This crate provides the foundational types for beck's incremental
//! change-propagation engine:
//!
//! - `ChangeReason`: Why a key changed (Add, Update, Remove, Refresh, Moved)
//! - `ChangeRecord`: One keyed mutation event, with the previous value where
//!   the reason requires it
//! - `ChangeBatch`: An ordered sequence of records produced by one emission
//! - `Error`: Error types for engine operations
//!
//! # Example
//!
//! ```rust
//! use beck_core::{ChangeBatch, ChangeReason, ChangeRecord};
//!
//! let mut batch = ChangeBatch::new();
//! batch.push(ChangeRecord::add(1u32, "a"));
//! batch.push(ChangeRecord::update(1u32, "b", "a"));
//!
//! assert_eq!(batch.len(), 2);
//! assert_eq!(batch.iter().next().unwrap().reason(), ChangeReason::Add);
//! ```

#![no_std]

extern crate alloc;

mod batch;
mod change;
mod error;

pub use batch::ChangeBatch;
pub use change::{ChangeReason, ChangeRecord};
pub use error::{Error, Result};
