// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow status of a submission and the transitions between them.
//!
//! The state machine is permissive: decisions can be revised even after a submission reached a
//! terminal status. Only transitions which would not change anything (approving twice) or which
//! make no sense (starting a review on a decided submission) are refused.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::impl_wire_str;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
    AutoApproved,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Pending,
        Status::UnderReview,
        Status::Approved,
        Status::Rejected,
        Status::AutoApproved,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::UnderReview => "under_review",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
            Status::AutoApproved => "auto_approved",
        }
    }

    /// Returns true if a decision is still outstanding.
    pub const fn is_open(&self) -> bool {
        matches!(self, Status::Pending | Status::UnderReview)
    }

    pub const fn is_approved(&self) -> bool {
        matches!(self, Status::Approved | Status::AutoApproved)
    }

    pub const fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Applies a transition and returns the resulting status.
    pub fn apply(self, transition: Transition) -> Result<Status, TransitionError> {
        match (self, transition) {
            (Status::Approved | Status::AutoApproved, Transition::Approve)
            | (Status::Rejected, Transition::Reject) => Err(TransitionError::AlreadyInStatus {
                status: self,
                transition,
            }),
            (from, Transition::StartReview) if from != Status::Pending => {
                Err(TransitionError::NotAllowed { from, transition })
            }
            (from, Transition::AutoApprove) if !from.is_open() => {
                Err(TransitionError::NotAllowed { from, transition })
            }
            _ => Ok(transition.target()),
        }
    }
}

impl_wire_str!(Status, "status");

/// Workflow step requested on a submission.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    StartReview,
    Approve,
    Reject,
    RequestRevision,
    AutoApprove,
}

impl Transition {
    pub const fn target(&self) -> Status {
        match self {
            Transition::StartReview => Status::UnderReview,
            Transition::Approve => Status::Approved,
            Transition::Reject => Status::Rejected,
            Transition::RequestRevision => Status::Pending,
            Transition::AutoApprove => Status::AutoApproved,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Transition::StartReview => "start review",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::RequestRevision => "request revision",
            Transition::AutoApprove => "auto-approve",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("can't {transition} submission, it is already {status}")]
    AlreadyInStatus {
        status: Status,
        transition: Transition,
    },

    #[error("can't {transition} submission with status {from}")]
    NotAllowed { from: Status, transition: Transition },
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use assert_matches::assert_matches;
    use rstest::rstest;

    use super::{Status, Transition, TransitionError};

    #[rstest]
    #[case(Status::Pending, Transition::Approve, Status::Approved)]
    #[case(Status::UnderReview, Transition::Approve, Status::Approved)]
    #[case(Status::Rejected, Transition::Approve, Status::Approved)]
    #[case(Status::Pending, Transition::Reject, Status::Rejected)]
    #[case(Status::Approved, Transition::Reject, Status::Rejected)]
    #[case(Status::AutoApproved, Transition::Reject, Status::Rejected)]
    #[case(Status::Approved, Transition::RequestRevision, Status::Pending)]
    #[case(Status::Pending, Transition::RequestRevision, Status::Pending)]
    #[case(Status::Pending, Transition::StartReview, Status::UnderReview)]
    #[case(Status::UnderReview, Transition::AutoApprove, Status::AutoApproved)]
    fn permitted_transitions(
        #[case] from: Status,
        #[case] transition: Transition,
        #[case] expected: Status,
    ) {
        assert_eq!(from.apply(transition), Ok(expected));
    }

    #[rstest]
    #[case(Status::Approved, Transition::Approve)]
    #[case(Status::AutoApproved, Transition::Approve)]
    #[case(Status::Rejected, Transition::Reject)]
    fn repeated_decisions(#[case] from: Status, #[case] transition: Transition) {
        assert_matches!(
            from.apply(transition),
            Err(TransitionError::AlreadyInStatus { .. })
        );
    }

    #[rstest]
    #[case(Status::UnderReview, Transition::StartReview)]
    #[case(Status::Approved, Transition::StartReview)]
    #[case(Status::Rejected, Transition::AutoApprove)]
    #[case(Status::AutoApproved, Transition::AutoApprove)]
    fn refused_transitions(#[case] from: Status, #[case] transition: Transition) {
        assert_matches!(
            from.apply(transition),
            Err(TransitionError::NotAllowed { .. })
        );
    }

    #[test]
    fn open_statuses() {
        let open: Vec<Status> = Status::ALL.into_iter().filter(Status::is_open).collect();
        assert_eq!(open, vec![Status::Pending, Status::UnderReview]);
        assert!(Status::AutoApproved.is_approved());
    }

    #[test]
    fn wire_format() {
        assert_eq!(Status::from_str("under_review").unwrap(), Status::UnderReview);
        assert_eq!(
            serde_json::to_string(&Status::AutoApproved).unwrap(),
            "\"auto_approved\""
        );
        assert!(Status::from_str("open").is_err());
    }

    #[test]
    fn error_messages() {
        let err = Status::Approved.apply(Transition::Approve).unwrap_err();
        assert_eq!(
            err.to_string(),
            "can't approve submission, it is already approved"
        );
    }
}
