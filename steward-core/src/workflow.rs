// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow mutations on a single submission.
//!
//! Every function is pure: it validates its input, checks the status transition and returns an
//! updated copy of the submission. Nothing is changed when an error is returned. The returned
//! record has a bumped version and a `last_updated` which never moves backwards.
use thiserror::Error;

use crate::comment::{Comment, CommentKind};
use crate::identity::{Actor, Role};
use crate::policy::{Policy, PolicyRejection};
use crate::status::{Transition, TransitionError};
use crate::submission::Submission;
use crate::timestamp::Timestamp;
use crate::types::EscalationTarget;
use crate::validate::{MAX_MESSAGE_LENGTH, ValidationError, validate_message, validate_text};

/// Maximum length of team and reviewer names.
const MAX_NAME_LENGTH: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    AutoApproval(#[from] PolicyRejection),
}

/// Approves the submission with a mandatory comment.
pub fn approve(
    submission: &Submission,
    actor: &Actor,
    comment: &str,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    decide(
        submission,
        actor,
        Transition::Approve,
        comment,
        CommentKind::Approval,
        now,
    )
}

/// Rejects the submission, the comment explains why.
pub fn reject(
    submission: &Submission,
    actor: &Actor,
    comment: &str,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    decide(
        submission,
        actor,
        Transition::Reject,
        comment,
        CommentKind::Feedback,
        now,
    )
}

/// Sends the submission back to the producer and notes which team it was referred to.
pub fn request_revision(
    submission: &Submission,
    actor: &Actor,
    comment: &str,
    refer_to: &str,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    let message = validate_message("comment", comment)?;
    let team = validate_text("team", refer_to, MAX_NAME_LENGTH)?;
    let status = submission.status.apply(Transition::RequestRevision)?;

    let mut next = submission.clone();
    next.status = status;
    next.metadata
        .set_current_step(format!("Revision requested, referred to {team}"));
    append(&mut next, actor.clone(), message, CommentKind::RevisionRequest, None, now);

    Ok(next)
}

/// Adds a comment without changing the status.
///
/// Stewards give feedback, everyone else asks questions.
pub fn add_comment(
    submission: &Submission,
    actor: &Actor,
    role: Role,
    message: &str,
    phase: Option<&str>,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    let message = validate_message("message", message)?;
    let kind = match role {
        Role::Steward => CommentKind::Feedback,
        Role::Producer | Role::Consumer => CommentKind::Question,
    };

    let mut next = submission.clone();
    append(
        &mut next,
        actor.clone(),
        message,
        kind,
        phase.map(str::to_string),
        now,
    );

    Ok(next)
}

/// Raises the submission to a higher authority.
///
/// The status is left untouched, the escalation is recorded as a system comment and in the
/// metadata.
pub fn escalate(
    submission: &Submission,
    actor: &Actor,
    reason: &str,
    target: Option<EscalationTarget>,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    let reason = validate_text("reason", reason, MAX_MESSAGE_LENGTH)?;
    let target = target.ok_or(ValidationError::Required {
        field: "escalation target",
    })?;

    let mut next = submission.clone();
    let at = now.max(next.last_updated);
    next.metadata.push_escalation(target, reason, actor, at);
    append(
        &mut next,
        Actor::system(),
        &format!("Escalated to {} by {}: {}", target.label(), actor.name, reason),
        CommentKind::Feedback,
        None,
        now,
    );

    Ok(next)
}

/// Moves a pending submission into review and assigns the acting steward if nobody is assigned.
pub fn start_review(
    submission: &Submission,
    actor: &Actor,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    let status = submission.status.apply(Transition::StartReview)?;

    let mut next = submission.clone();
    next.status = status;
    next.touch(now);
    next.metadata.set_review_started_at(next.last_updated);
    if next.reviewer.is_none() {
        next.reviewer = Some(actor.name.clone());
    }

    Ok(next)
}

/// Re-runs the auto-approval policy.
///
/// On success the submission is auto-approved with a system comment naming the rule. Otherwise
/// the rejection lists what needs fixing.
pub fn retry_auto_approval(
    submission: &Submission,
    policy: &Policy,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    let status = submission.status.apply(Transition::AutoApprove)?;
    let eligibility = policy.evaluate(submission)?;

    let mut next = submission.clone();
    next.status = status;
    next.auto_approval_eligible = true;
    append(
        &mut next,
        Actor::system(),
        &format!("Automatically approved by rule \"{}\"", eligibility.rule_name),
        CommentKind::Approval,
        None,
        now,
    );

    Ok(next)
}

/// Applies routing rules and recomputes the eligibility flag.
pub fn apply_routing(submission: &Submission, policy: &Policy, now: Timestamp) -> Submission {
    let mut next = submission.clone();
    policy.route(&mut next);
    policy.refresh_eligibility(&mut next);
    next.touch(now);
    next
}

fn decide(
    submission: &Submission,
    actor: &Actor,
    transition: Transition,
    comment: &str,
    kind: CommentKind,
    now: Timestamp,
) -> Result<Submission, WorkflowError> {
    let message = validate_message("comment", comment)?;
    let status = submission.status.apply(transition)?;

    let mut next = submission.clone();
    next.status = status;
    append(&mut next, actor.clone(), message, kind, None, now);

    Ok(next)
}

fn append(
    submission: &mut Submission,
    author: Actor,
    message: &str,
    kind: CommentKind,
    phase: Option<String>,
    now: Timestamp,
) {
    let created_at = now.max(submission.last_updated);
    let comment = Comment::new(submission.id.clone(), author, message, kind, created_at)
        .with_phase(phase);
    submission.comments.push(comment);
    submission.touch(created_at);
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use crate::comment::CommentKind;
    use crate::identity::{Actor, Role};
    use crate::policy::{Condition, Operator, Policy, Rule, RuleAction, RuleScope};
    use crate::status::{Status, TransitionError};
    use crate::submission::Submission;
    use crate::timestamp::Timestamp;
    use crate::types::{AssetType, EscalationTarget};
    use crate::validate::ValidationError;

    use super::{
        WorkflowError, add_comment, apply_routing, approve, escalate, reject, request_revision,
        retry_auto_approval, start_review,
    };

    fn steward() -> Actor {
        Actor::new("u1", "Sarah Mitchell")
    }

    fn submission() -> Submission {
        let mut submission = Submission::new(
            "S1",
            "Customer Analytics Dataset",
            AssetType::Dataset,
            "p1",
            "Analytics Team",
            Timestamp::from_secs(100),
        );
        submission.last_updated = Timestamp::from_secs(200);
        submission
    }

    #[test]
    fn approve_appends_approval_comment() {
        let before = submission();
        let after = approve(
            &before,
            &steward(),
            "Meets all criteria",
            Timestamp::from_secs(300),
        )
        .unwrap();

        assert_eq!(after.status, Status::Approved);
        assert_eq!(after.comments.len(), 1);
        assert_eq!(after.comments[0].kind, CommentKind::Approval);
        assert_eq!(after.comments[0].message, "Meets all criteria");
        assert_eq!(after.comments[0].submission_id, before.id);
        assert_eq!(after.last_updated, Timestamp::from_secs(300));
        assert_eq!(after.version, before.version + 1);
    }

    #[test]
    fn empty_comments_are_refused() {
        let before = submission();
        let now = Timestamp::from_secs(300);

        assert_matches!(
            approve(&before, &steward(), "", now),
            Err(WorkflowError::Validation(ValidationError::Required { .. }))
        );
        assert_matches!(
            reject(&before, &steward(), "  ", now),
            Err(WorkflowError::Validation(_))
        );
        assert_matches!(
            add_comment(&before, &steward(), Role::Steward, "", None, now),
            Err(WorkflowError::Validation(_))
        );
    }

    #[test]
    fn repeated_approval_is_refused() {
        let approved = approve(
            &submission(),
            &steward(),
            "Fine",
            Timestamp::from_secs(300),
        )
        .unwrap();

        assert_matches!(
            approve(&approved, &steward(), "Again", Timestamp::from_secs(400)),
            Err(WorkflowError::Transition(
                TransitionError::AlreadyInStatus { .. }
            ))
        );

        // Changing the decision is possible.
        let rejected = reject(
            &approved,
            &steward(),
            "Found PII after all",
            Timestamp::from_secs(400),
        )
        .unwrap();
        assert_eq!(rejected.status, Status::Rejected);
        assert_eq!(rejected.comments.len(), 2);
    }

    #[test]
    fn last_updated_never_goes_backwards() {
        let before = submission();
        // Local clock is behind the last write.
        let after = reject(&before, &steward(), "Incomplete", Timestamp::from_secs(150)).unwrap();
        assert_eq!(after.last_updated, Timestamp::from_secs(200));
        assert_eq!(after.comments[0].created_at, Timestamp::from_secs(200));
    }

    #[test]
    fn revision_goes_back_to_pending() {
        let mut before = submission();
        before.status = Status::UnderReview;

        let after = request_revision(
            &before,
            &steward(),
            "Please add a schema",
            "Data Engineering",
            Timestamp::from_secs(300),
        )
        .unwrap();
        assert_eq!(after.status, Status::Pending);
        assert_eq!(
            after.metadata.current_step(),
            Some("Revision requested, referred to Data Engineering")
        );
        assert_eq!(after.comments[0].kind, CommentKind::RevisionRequest);

        assert_matches!(
            request_revision(&before, &steward(), "Fix it", "", Timestamp::from_secs(300)),
            Err(WorkflowError::Validation(ValidationError::Required { field: "team" }))
        );
    }

    #[test]
    fn comment_kind_follows_role() {
        let before = submission();
        let now = Timestamp::from_secs(300);

        let feedback = add_comment(&before, &steward(), Role::Steward, "Ok", Some("schema"), now)
            .unwrap();
        assert_eq!(feedback.comments[0].kind, CommentKind::Feedback);
        assert_eq!(feedback.comments[0].phase.as_deref(), Some("schema"));
        assert_eq!(feedback.status, before.status);

        let question = add_comment(
            &before,
            &Actor::new("p1", "Analytics Team"),
            Role::Producer,
            " Why? ",
            None,
            now,
        )
        .unwrap();
        assert_eq!(question.comments[0].kind, CommentKind::Question);
        assert_eq!(question.comments[0].message, "Why?");
    }

    #[test]
    fn escalation_keeps_status() {
        for status in Status::ALL {
            let mut before = submission();
            before.status = status;

            let after = escalate(
                &before,
                &steward(),
                "Blocking the Q3 launch",
                Some(EscalationTarget::Manager),
                Timestamp::from_secs(300),
            )
            .unwrap();

            assert_eq!(after.status, status);
            assert_eq!(after.comments.len(), 1);
            assert!(after.comments[0].author.is_system());
            assert_eq!(
                after.comments[0].message,
                "Escalated to Approval Manager by Sarah Mitchell: Blocking the Q3 launch"
            );
            assert_eq!(after.metadata.escalations().len(), 1);
        }
    }

    #[test]
    fn escalation_needs_target() {
        assert_matches!(
            escalate(
                &submission(),
                &steward(),
                "Urgent",
                None,
                Timestamp::from_secs(300)
            ),
            Err(WorkflowError::Validation(ValidationError::Required {
                field: "escalation target"
            }))
        );
    }

    #[test]
    fn start_review_assigns_reviewer() {
        let after = start_review(&submission(), &steward(), Timestamp::from_secs(300)).unwrap();
        assert_eq!(after.status, Status::UnderReview);
        assert_eq!(after.reviewer.as_deref(), Some("Sarah Mitchell"));
        assert_eq!(
            after.metadata.review_started_at(),
            Some(Timestamp::from_secs(300))
        );

        assert_matches!(
            start_review(&after, &steward(), Timestamp::from_secs(400)),
            Err(WorkflowError::Transition(_))
        );
    }

    fn policy() -> Policy {
        Policy::new(vec![Rule {
            id: "r1".into(),
            name: "Public datasets".into(),
            enabled: true,
            scope: RuleScope::AssetType(AssetType::Dataset),
            conditions: vec![Condition::new("riskScore", Operator::LessThan, "50")],
            actions: vec![
                RuleAction::AutoApprove,
                RuleAction::AssignReviewer("Mike Chen".into()),
            ],
        }])
    }

    #[test]
    fn retry_auto_approval_is_deterministic() {
        let mut before = submission();
        before.metadata.insert(
            "governanceChecks",
            json!({
                "schema_reviewed": true,
                "classification_verified": false,
            }),
        );

        for _ in 0..3 {
            let err =
                retry_auto_approval(&before, &policy(), Timestamp::from_secs(300)).unwrap_err();
            assert_matches!(err, WorkflowError::AutoApproval(ref rejection) if rejection.failed_checks.len() == 3);
        }

        for check in [
            "classification_verified",
            "pii_identified",
            "security_compliance",
        ] {
            before.metadata.set_governance_check(check, true);
        }

        let after = retry_auto_approval(&before, &policy(), Timestamp::from_secs(300)).unwrap();
        assert_eq!(after.status, Status::AutoApproved);
        assert!(after.auto_approval_eligible);
        assert_eq!(after.comments[0].kind, CommentKind::Approval);
        assert!(after.comments[0].author.is_system());
    }

    #[test]
    fn routing_bumps_version() {
        let before = submission();
        let after = apply_routing(&before, &policy(), Timestamp::from_secs(300));
        assert_eq!(after.reviewer.as_deref(), Some("Mike Chen"));
        assert!(!after.auto_approval_eligible);
        assert_eq!(after.version, 1);
    }
}
