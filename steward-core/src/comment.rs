// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::identity::{Actor, CommentId, SubmissionId};
use crate::timestamp::Timestamp;
use crate::types::impl_wire_str;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    Feedback,
    Question,
    Approval,
    RevisionRequest,
}

impl CommentKind {
    pub const ALL: [CommentKind; 4] = [
        CommentKind::Feedback,
        CommentKind::Question,
        CommentKind::Approval,
        CommentKind::RevisionRequest,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CommentKind::Feedback => "feedback",
            CommentKind::Question => "question",
            CommentKind::Approval => "approval",
            CommentKind::RevisionRequest => "revision_request",
        }
    }
}

impl_wire_str!(CommentKind, "comment kind");

/// Authored message attached to exactly one submission.
///
/// Comments are append-only, they are never edited, reordered or moved to another submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub submission_id: SubmissionId,
    pub author: Actor,
    pub message: String,
    pub kind: CommentKind,
    /// Review phase the comment belongs to, for example "schema" or "compliance".
    pub phase: Option<String>,
    pub created_at: Timestamp,
}

impl Comment {
    pub fn new(
        submission_id: SubmissionId,
        author: Actor,
        message: impl Into<String>,
        kind: CommentKind,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: CommentId::random(),
            submission_id,
            author,
            message: message.into(),
            kind,
            phase: None,
            created_at,
        }
    }

    pub fn with_phase(mut self, phase: Option<String>) -> Self {
        self.phase = phase.filter(|phase| !phase.trim().is_empty());
        self
    }
}
