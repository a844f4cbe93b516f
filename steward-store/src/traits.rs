// SPDX-License-Identifier: MIT OR Apache-2.0

use steward_core::{Comment, InvariantError, Status, Submission, SubmissionId};
use thiserror::Error;
use tokio::sync::broadcast;

/// Write to the submission collection.
///
/// All writes, local and remote, go through this type so every change is applied as a whole and
/// readers never observe a partially updated submission.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// Authoritative record, either pushed by the backend or confirmed by a write.
    ///
    /// Records with a lower version than the stored one are stale and get dropped.
    Replace(Submission),

    /// Locally computed record which is not persisted yet.
    Optimistic(Submission),

    /// Rolls back a failed optimistic change.
    ///
    /// The previous record is restored if the failed one is still in place. When another change
    /// landed in the meantime only the comments introduced by the failed change are removed.
    Restore {
        previous: Submission,
        failed: Submission,
    },

    /// Newly inserted comment, idempotent by comment id.
    AppendComment(Comment),
}

/// What happened to a change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Replaced,
    Stale { current: u64, incoming: u64 },
    Appended,
    Duplicate,
    Restored,
    /// No submission with that id is loaded.
    Unknown,
}

/// Notification about an effective change of the collection.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    Loaded {
        count: usize,
    },
    Replaced {
        id: SubmissionId,
    },
    StatusChanged {
        id: SubmissionId,
        name: String,
        from: Status,
        to: Status,
    },
    CommentAppended {
        comment: Comment,
    },
    Restored {
        id: SubmissionId,
    },
}

/// Interface for the authoritative collection of submissions.
#[trait_variant::make(SubmissionStore: Send)]
pub trait LocalSubmissionStore: Clone {
    /// Get a single submission.
    async fn submission(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError>;

    /// All submissions in load order.
    async fn submissions(&self) -> Result<Vec<Submission>, StoreError>;

    /// Replace the whole collection.
    ///
    /// Either all records are loaded or, if one of them is invalid, none.
    async fn load(&self, submissions: Vec<Submission>) -> Result<usize, StoreError>;

    /// Apply a single change.
    async fn apply(&self, change: Change) -> Result<Applied, StoreError>;

    /// Subscribe to events of effective changes.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}
