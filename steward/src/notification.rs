// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short user-facing messages about changes and failures.
use std::fmt;

use steward_client::{Backend, ControllerError};
use steward_core::{CommentKind, Status, SubmissionId, WorkflowError};
use steward_store::StoreEvent;

use crate::dashboard::DashboardError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    StatusChanged {
        id: SubmissionId,
        name: String,
        from: Status,
        to: Status,
    },

    CommentAdded {
        id: SubmissionId,
        author: String,
        kind: CommentKind,
    },

    /// A change could not be saved and was undone locally.
    RolledBack { id: SubmissionId },

    /// Input was rejected before anything was sent.
    Invalid { reason: String },

    AutoApprovalFailed {
        failed_checks: Vec<String>,
        suggested_actions: Vec<String>,
    },

    Failed { reason: String },
}

impl Notification {
    /// Notification for a store event, `None` for events nobody needs to be told about.
    pub fn from_event(event: &StoreEvent) -> Option<Self> {
        let notification = match event {
            StoreEvent::StatusChanged { id, name, from, to } => Notification::StatusChanged {
                id: id.clone(),
                name: name.clone(),
                from: *from,
                to: *to,
            },
            StoreEvent::CommentAppended { comment } => Notification::CommentAdded {
                id: comment.submission_id.clone(),
                author: comment.author.name.clone(),
                kind: comment.kind,
            },
            StoreEvent::Restored { id } => Notification::RolledBack { id: id.clone() },
            StoreEvent::Loaded { .. } | StoreEvent::Replaced { .. } => return None,
        };
        Some(notification)
    }

    pub fn from_error<B>(error: &DashboardError<B>) -> Self
    where
        B: Backend,
    {
        match error {
            DashboardError::Controller(ControllerError::Workflow(err)) => match err {
                WorkflowError::AutoApproval(rejection) => Notification::AutoApprovalFailed {
                    failed_checks: rejection.failed_checks.clone(),
                    suggested_actions: rejection.suggested_actions.clone(),
                },
                WorkflowError::Validation(_) | WorkflowError::Transition(_) => {
                    Notification::Invalid {
                        reason: err.to_string(),
                    }
                }
            },
            DashboardError::Filter(err) => Notification::Invalid {
                reason: err.to_string(),
            },
            other => Notification::Failed {
                reason: other.to_string(),
            },
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Notification::StatusChanged { to, .. } => match to {
                Status::Approved | Status::AutoApproved => Level::Success,
                Status::Rejected => Level::Warning,
                Status::Pending | Status::UnderReview => Level::Info,
            },
            Notification::CommentAdded { .. } => Level::Info,
            Notification::RolledBack { .. }
            | Notification::Invalid { .. }
            | Notification::AutoApprovalFailed { .. } => Level::Warning,
            Notification::Failed { .. } => Level::Error,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::StatusChanged { name, to, .. } => {
                write!(f, "{name} is now {}", to.as_str().replace('_', " "))
            }
            Notification::CommentAdded { author, kind, .. } => match kind {
                CommentKind::Question => write!(f, "{author} asked a question"),
                CommentKind::RevisionRequest => write!(f, "{author} requested a revision"),
                CommentKind::Approval | CommentKind::Feedback => {
                    write!(f, "New comment from {author}")
                }
            },
            Notification::RolledBack { id } => {
                write!(f, "Changes to {id} could not be saved and were undone")
            }
            Notification::Invalid { reason } => write!(f, "{reason}"),
            Notification::AutoApprovalFailed {
                failed_checks,
                suggested_actions,
            } => {
                if failed_checks.is_empty() {
                    write!(f, "Auto-approval failed")?;
                } else {
                    write!(f, "Auto-approval failed: {}", failed_checks.join(", "))?;
                }
                if !suggested_actions.is_empty() {
                    write!(f, ". Next steps: {}", suggested_actions.join("; "))?;
                }
                Ok(())
            }
            Notification::Failed { reason } => write!(f, "Something went wrong: {reason}"),
        }
    }
}
