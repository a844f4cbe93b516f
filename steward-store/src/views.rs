// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only projections of the submission collection.
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use steward_core::{Priority, Status, Submission, Timestamp};

const SECS_PER_HOUR: u64 = 60 * 60;
const HOURS_PER_DAY: u64 = 24;

/// Reviewer name used for open submissions nobody is assigned to.
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Reviewers with submissions waiting longer than this need attention.
    pub attention_after_days: u64,

    /// Submissions waiting longer than this are overdue.
    pub overdue_after_days: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            attention_after_days: 3,
            overdue_after_days: 7,
        }
    }
}

/// Counters shown on top of the dashboard.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    pub under_review: usize,
    /// Manually and automatically approved submissions.
    pub approved: usize,
    pub rejected: usize,
    /// Pending submissions only, submissions under review are not counted.
    pub high_priority_pending: usize,
    /// Pending submissions only.
    pub auto_approval_eligible: usize,
}

impl DashboardStats {
    pub fn from_submissions(submissions: &[Submission]) -> Self {
        let mut stats = Self {
            total: submissions.len(),
            ..Default::default()
        };

        for submission in submissions {
            match submission.status {
                Status::Pending => stats.pending += 1,
                Status::UnderReview => stats.under_review += 1,
                Status::Approved | Status::AutoApproved => stats.approved += 1,
                Status::Rejected => stats.rejected += 1,
            }

            if submission.status == Status::Pending {
                if submission.priority == Priority::High {
                    stats.high_priority_pending += 1;
                }
                if submission.auto_approval_eligible {
                    stats.auto_approval_eligible += 1;
                }
            }
        }

        stats
    }

    /// Share of approved submissions in percent, rounded half up. `None` without submissions.
    pub fn approval_rate(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let rate = (self.approved * 200 + self.total) / (self.total * 2);
        u8::try_from(rate).ok()
    }
}

/// Open submissions assigned to one reviewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerWorkload {
    pub reviewer: String,
    pub count: usize,
    pub oldest_pending_days: u64,
    pub needs_attention: bool,
    pub overdue: bool,
}

/// Groups open submissions by reviewer, busiest reviewers first.
pub fn pending_by_reviewer(
    submissions: &[Submission],
    now: Timestamp,
    config: &ViewConfig,
) -> Vec<ReviewerWorkload> {
    let mut groups: HashMap<&str, (usize, u64)> = HashMap::new();

    for submission in submissions.iter().filter(|submission| submission.is_open()) {
        let reviewer = submission.reviewer.as_deref().unwrap_or(UNASSIGNED);
        let days = whole_days(now.duration_since(submission.submitted_at));
        let entry = groups.entry(reviewer).or_default();
        entry.0 += 1;
        entry.1 = entry.1.max(days);
    }

    let mut workloads: Vec<ReviewerWorkload> = groups
        .into_iter()
        .map(|(reviewer, (count, oldest_pending_days))| ReviewerWorkload {
            reviewer: reviewer.to_string(),
            count,
            oldest_pending_days,
            needs_attention: oldest_pending_days > config.attention_after_days,
            overdue: oldest_pending_days > config.overdue_after_days,
        })
        .collect();

    workloads.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| crate::query::collate(&a.reviewer, &b.reviewer))
    });
    workloads
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaUrgency {
    Normal,
    Warning,
    Urgent,
    Overdue,
}

impl SlaUrgency {
    pub const fn label(&self) -> &'static str {
        match self {
            SlaUrgency::Normal => "ON TRACK",
            SlaUrgency::Warning => "DUE SOON",
            SlaUrgency::Urgent => "URGENT",
            SlaUrgency::Overdue => "OVERDUE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaStatus {
    pub urgency: SlaUrgency,
    pub target_days: u64,
    pub elapsed: Duration,
    /// Elapsed time as "2d 5h" or "5h".
    pub elapsed_label: String,
}

/// Review deadline status, `None` for decided submissions or without a target in the metadata.
pub fn sla_status(submission: &Submission, now: Timestamp) -> Option<SlaStatus> {
    if submission.status.is_terminal() {
        return None;
    }

    let target_days = submission.metadata.sla_target_days()?;
    let elapsed = now.duration_since(submission.submitted_at);
    let days = whole_days(elapsed) as f64;
    let target = target_days as f64;

    let urgency = if days >= target {
        SlaUrgency::Overdue
    } else if days >= target * 0.75 {
        SlaUrgency::Urgent
    } else if days >= target * 0.5 {
        SlaUrgency::Warning
    } else {
        SlaUrgency::Normal
    };

    Some(SlaStatus {
        urgency,
        target_days,
        elapsed,
        elapsed_label: elapsed_label(elapsed),
    })
}

fn whole_days(duration: Duration) -> u64 {
    duration.as_secs() / (SECS_PER_HOUR * HOURS_PER_DAY)
}

fn elapsed_label(elapsed: Duration) -> String {
    let hours = elapsed.as_secs() / SECS_PER_HOUR;
    let days = hours / HOURS_PER_DAY;
    if days > 0 {
        format!("{days}d {}h", hours % HOURS_PER_DAY)
    } else {
        format!("{hours}h")
    }
}

/// Rough completion of the workflow in percent.
pub fn progress(status: Status) -> u8 {
    match status {
        Status::Pending => 25,
        Status::UnderReview => 75,
        Status::Approved | Status::AutoApproved => 100,
        Status::Rejected => 0,
    }
}

/// Number of comments per review phase, untagged comments are not counted.
pub fn phase_counts(submission: &Submission) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for phase in submission
        .comments
        .iter()
        .filter_map(|comment| comment.phase.as_ref())
    {
        *counts.entry(phase.clone()).or_default() += 1;
    }
    counts
}
