// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model and workflow rules for reviewing data asset submissions.
//!
//! A [`Submission`] is a producer's request to register a data asset (dataset, API, stream or
//! model) or a consumer's request to access one. Data stewards move submissions through a small
//! set of [`Status`] values by approving, rejecting or requesting revisions, and discuss them with
//! [`Comment`]s.
//!
//! All mutations in [`workflow`] are pure functions which validate their input, check the status
//! transition and return an updated copy, so they can be applied optimistically and rolled back by
//! simply keeping the previous value around.
//!
//! ## Example
//!
//! ```
//! use steward_core::{Actor, AssetType, Status, Submission, Timestamp, workflow};
//!
//! let submission = Submission::new(
//!     "S1",
//!     "Customer Analytics Dataset",
//!     AssetType::Dataset,
//!     "p1",
//!     "Analytics Team",
//!     Timestamp::from_secs(1_700_000_000),
//! );
//!
//! let steward = Actor::new("u1", "Sarah Mitchell");
//! let approved = workflow::approve(
//!     &submission,
//!     &steward,
//!     "Meets all criteria",
//!     Timestamp::from_secs(1_700_000_060),
//! )
//! .unwrap();
//!
//! assert_eq!(approved.status, Status::Approved);
//! assert_eq!(approved.comments.len(), 1);
//! ```
mod comment;
pub mod draft;
mod identity;
pub mod metadata;
pub mod policy;
mod status;
mod submission;
mod timeline;
mod timestamp;
mod types;
pub mod validate;
pub mod workflow;

pub use comment::{Comment, CommentKind};
pub use draft::SubmissionDraft;
pub use identity::{Actor, ActorId, CommentId, Role, SubmissionId};
pub use metadata::Metadata;
pub use policy::{Eligibility, Policy, PolicyRejection, Rule};
pub use status::{Status, Transition, TransitionError};
pub use submission::{InvariantError, MAX_RISK_SCORE, RequestKind, Submission};
pub use timeline::{TimelineEvent, TimelineEventKind, build_timeline};
pub use timestamp::Timestamp;
pub use types::{AssetType, Classification, EscalationTarget, Priority, UnknownVariant};
pub use validate::ValidationError;
pub use workflow::WorkflowError;
