// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use steward_core::Submission;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    SubmittedAt,
    LastUpdated,
    Priority,
    Type,
    Reviewer,
    Phase,
}

impl SortKey {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::SubmittedAt => "submittedAt",
            SortKey::LastUpdated => "lastUpdated",
            SortKey::Priority => "priority",
            SortKey::Type => "type",
            SortKey::Reviewer => "reviewer",
            SortKey::Phase => "phase",
        }
    }

    /// Compares two submissions in ascending order of this key.
    pub fn compare(&self, a: &Submission, b: &Submission) -> Ordering {
        match self {
            SortKey::Name => collate(&a.name, &b.name),
            SortKey::SubmittedAt => a.submitted_at.cmp(&b.submitted_at),
            SortKey::LastUpdated => a.last_updated.cmp(&b.last_updated),
            SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortKey::Type => collate(a.asset_type.as_str(), b.asset_type.as_str()),
            SortKey::Reviewer => collate_optional(a.reviewer.as_deref(), b.reviewer.as_deref()),
            SortKey::Phase => collate_optional(a.phase.as_deref(), b.phase.as_deref()),
        }
    }
}

impl FromStr for SortKey {
    type Err = SortError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [
            SortKey::Name,
            SortKey::SubmittedAt,
            SortKey::LastUpdated,
            SortKey::Priority,
            SortKey::Type,
            SortKey::Reviewer,
            SortKey::Phase,
        ]
        .into_iter()
        .find(|key| key.as_str() == value)
        .ok_or_else(|| SortError::UnknownKey(value.to_string()))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Selected sort key and direction, newest submissions first by default.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::SubmittedAt,
            direction: SortDirection::Descending,
        }
    }
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Selecting the current key again flips the direction, a new key starts descending.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flip();
        } else {
            self.key = key;
            self.direction = SortDirection::Descending;
        }
    }

    pub fn compare(&self, a: &Submission, b: &Submission) -> Ordering {
        self.direction.apply(self.key.compare(a, b))
    }

    /// Sorts in place. The sort is stable, equal keys keep their relative order.
    pub fn sort(&self, submissions: &mut [&Submission]) {
        submissions.sort_by(|a, b| self.compare(a, b));
    }
}

/// Case-insensitive comparison, ties are broken by the raw strings to keep the order total.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Like [`collate`], missing values order before present ones.
pub fn collate_optional(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => collate(a, b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SortError {
    #[error("unknown sort key \"{0}\"")]
    UnknownKey(String),
}
