// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::comment::Comment;
use crate::identity::{ActorId, CommentId, SubmissionId};
use crate::metadata::Metadata;
use crate::status::Status;
use crate::timestamp::Timestamp;
use crate::types::{AssetType, Classification, Priority};

/// Highest valid risk score.
pub const MAX_RISK_SCORE: u8 = 100;

/// What the submitter is asking for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    /// Registration of a new data asset in the catalog.
    #[default]
    AssetRegistration,

    /// Request of a consumer to get access to an already registered asset.
    AccessRequest {
        asset: SubmissionId,
        access_level: String,
    },
}

/// Producer-submitted asset or consumer access request awaiting a decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub asset_type: AssetType,
    pub request_kind: RequestKind,
    pub sub_type: Option<String>,
    pub producer_id: ActorId,
    /// Display name of the producer or requester.
    pub producer: String,
    pub status: Status,
    pub priority: Priority,
    pub risk_score: u8,
    pub auto_approval_eligible: bool,
    pub classification: Option<Classification>,
    pub reviewer: Option<String>,
    pub phase: Option<String>,
    pub action: Option<String>,
    pub metadata: Metadata,
    pub submitted_at: Timestamp,
    pub last_updated: Timestamp,
    /// Counter incremented by every write, used to detect stale pushes.
    pub version: u64,
    /// Comments in append order.
    pub comments: Vec<Comment>,
}

impl Submission {
    pub fn new(
        id: impl Into<SubmissionId>,
        name: impl Into<String>,
        asset_type: AssetType,
        producer_id: impl Into<ActorId>,
        producer: impl Into<String>,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            description: String::new(),
            asset_type,
            request_kind: RequestKind::default(),
            sub_type: None,
            producer_id: producer_id.into(),
            producer: producer.into(),
            status: Status::default(),
            priority: Priority::default(),
            risk_score: 0,
            auto_approval_eligible: false,
            classification: None,
            reviewer: None,
            phase: None,
            action: None,
            metadata: Metadata::default(),
            submitted_at,
            last_updated: submitted_at,
            version: 0,
            comments: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn has_comment(&self, id: &CommentId) -> bool {
        self.comments.iter().any(|comment| &comment.id == id)
    }

    /// Marks the record as rewritten at `now`.
    ///
    /// `last_updated` never moves backwards and the version always increases.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_updated = self.last_updated.max(now);
        self.version += 1;
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.last_updated < self.submitted_at {
            return Err(InvariantError::UpdatedBeforeSubmitted(self.id.clone()));
        }

        if self.risk_score > MAX_RISK_SCORE {
            return Err(InvariantError::RiskScoreOutOfRange(
                self.id.clone(),
                self.risk_score,
            ));
        }

        if let Some(comment) = self
            .comments
            .iter()
            .find(|comment| comment.submission_id != self.id)
        {
            return Err(InvariantError::ForeignComment {
                submission: self.id.clone(),
                comment: comment.id.clone(),
            });
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("submission {0} was updated before it was submitted")]
    UpdatedBeforeSubmitted(SubmissionId),

    #[error("risk score {1} of submission {0} is out of range")]
    RiskScoreOutOfRange(SubmissionId, u8),

    #[error("comment {comment} does not belong to submission {submission}")]
    ForeignComment {
        submission: SubmissionId,
        comment: CommentId,
    },
}
