// SPDX-License-Identifier: MIT OR Apache-2.0

//! Approval dashboard for data asset registrations and access requests.
//!
//! A [`Dashboard`] loads the submissions visible to the signed-in user from a
//! [`Backend`](steward_client::Backend), keeps them in sync with changes pushed by the backend
//! and runs the review workflow on them: approve, reject, request revisions, comment, escalate,
//! start reviews and retry the auto-approval rules, one submission at a time or in bulk.
//!
//! Every write is applied to the local collection right away and rolled back when the backend
//! does not confirm it. Workflow input is validated before anything is sent.
mod builder;
mod config;
mod dashboard;
mod notification;
#[cfg(feature = "test_utils")]
pub mod test_utils;

pub use builder::DashboardBuilder;
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardError};
pub use notification::{Level, Notification};

pub use steward_client::{Backend, BulkOutcome, Config, Scope};
pub use steward_core::{EscalationTarget, Policy, Role, Status, Submission, SubmissionId};
pub use steward_store::query::{FilterField, PageView, SortKey};
