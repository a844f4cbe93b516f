// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative collection of submissions and everything computed from it.
//!
//! The collection is written from two sides: workflow mutations of the local user and changes
//! pushed by the backend. Both go through [`Change`] and are applied one at a time by a
//! [`SubmissionStore`] implementation. Every record carries a version, pushes older than what is
//! stored are dropped instead of overwriting newer local state.
//!
//! [`query`] filters, sorts and paginates snapshots of the collection and [`views`] computes the
//! aggregated numbers shown on the dashboard.
mod memory;
pub mod query;
mod traits;
pub mod views;

pub use memory::{InnerMemoryStore, MemoryStore};
pub use traits::{Applied, Change, LocalSubmissionStore, StoreError, StoreEvent, SubmissionStore};
