// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chronological history of a submission, derived from the record and its comments.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::comment::CommentKind;
use crate::identity::CommentId;
use crate::status::Status;
use crate::submission::Submission;
use crate::timestamp::Timestamp;

/// Offset after submission used for the review start when the record does not carry one.
const SYNTHETIC_REVIEW_OFFSET: Duration = Duration::from_secs(60 * 60);

/// Shown as actor of the review start when no reviewer is assigned.
const UNASSIGNED_REVIEWER: &str = "Data Steward";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    Submitted,
    ReviewStarted,
    Comment,
    Approved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: TimelineEventKind,
    pub actor: String,
    pub message: String,
    pub timestamp: Timestamp,
    /// Comment this event was derived from.
    pub comment: Option<CommentId>,
}

/// Builds the timeline of a submission, sorted by timestamp.
///
/// Events with equal timestamps keep their natural order: submission, review start, then comments
/// in append order. Building the timeline twice from the same record yields the same events.
pub fn build_timeline(submission: &Submission) -> Vec<TimelineEvent> {
    let mut events = Vec::with_capacity(submission.comments.len() + 2);

    events.push(TimelineEvent {
        kind: TimelineEventKind::Submitted,
        actor: submission.producer.clone(),
        message: format!("Submitted {} for approval", submission.name),
        timestamp: submission.submitted_at,
        comment: None,
    });

    if let Some(timestamp) = review_started_at(submission) {
        events.push(TimelineEvent {
            kind: TimelineEventKind::ReviewStarted,
            actor: submission
                .reviewer
                .clone()
                .unwrap_or_else(|| UNASSIGNED_REVIEWER.to_string()),
            message: "Review started".to_string(),
            timestamp,
            comment: None,
        });
    }

    events.extend(submission.comments.iter().map(|comment| TimelineEvent {
        kind: match comment.kind {
            CommentKind::Approval => TimelineEventKind::Approved,
            _ => TimelineEventKind::Comment,
        },
        actor: comment.author.name.clone(),
        message: comment.message.clone(),
        timestamp: comment.created_at,
        comment: Some(comment.id.clone()),
    }));

    events.sort_by_key(|event| event.timestamp);
    events
}

fn review_started_at(submission: &Submission) -> Option<Timestamp> {
    if let Some(timestamp) = submission.metadata.review_started_at() {
        return Some(timestamp);
    }

    if submission.status == Status::UnderReview {
        let synthetic = submission.submitted_at + SYNTHETIC_REVIEW_OFFSET;
        return Some(synthetic.min(submission.last_updated));
    }

    None
}
