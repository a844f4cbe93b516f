// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connects the local submission store to a remote backend.
//!
//! [`Backend`] is the contract a remote service implements: it loads submissions, persists
//! mutations atomically and pushes change events. The [`Controller`] runs workflow functions
//! against the store, persists their results with a timeout and rolls them back on failure.
//! [`SyncAdapter`] merges pushed change events into the store.
pub mod backend;
mod config;
mod controller;
mod sync;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use backend::{Backend, ChangeEvent, Mutation, Scope, Subscription, SubscriptionId};
pub use config::{Config, DEFAULT_REQUEST_TIMEOUT};
pub use controller::{BulkOutcome, Consumer, ConsumerError, Controller, ControllerError};
pub use sync::{MergeOutcome, SyncAdapter};
