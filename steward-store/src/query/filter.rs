// SPDX-License-Identifier: MIT OR Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use steward_core::{AssetType, Classification, Status, Submission, UnknownVariant};
use thiserror::Error;

/// Value used by filter controls to lift a restriction.
pub const ALL: &str = "all";

/// Pseudo status matching every submission which still awaits a decision.
pub const OPEN: &str = "open";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Any,
    Open,
    Is(Status),
}

impl StatusFilter {
    pub fn matches(&self, status: Status) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Open => status.is_open(),
            StatusFilter::Is(expected) => status == *expected,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            ALL => Ok(StatusFilter::Any),
            OPEN => Ok(StatusFilter::Open),
            value => Status::from_str(value).map(StatusFilter::Is),
        }
    }
}

/// Filter control which can be set from its string form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterField {
    Search,
    Status,
    AssetType,
    SubType,
    Reviewer,
    Phase,
    Action,
    Classification,
}

impl FromStr for FilterField {
    type Err = FilterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let field = match value {
            "search" => FilterField::Search,
            "status" => FilterField::Status,
            "assetType" | "type" => FilterField::AssetType,
            "subType" => FilterField::SubType,
            "reviewer" => FilterField::Reviewer,
            "phase" => FilterField::Phase,
            "action" => FilterField::Action,
            "classification" => FilterField::Classification,
            other => return Err(FilterError::UnknownField(other.to_string())),
        };
        Ok(field)
    }
}

/// Active restrictions on the submission queue. Every field defaults to "no restriction".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub status: StatusFilter,
    pub asset_type: Option<AssetType>,
    pub sub_type: Option<String>,
    pub reviewer: Option<String>,
    pub phase: Option<String>,
    pub action: Option<String>,
    pub classification: Option<Classification>,
}

impl FilterState {
    /// Sets a filter from its string form, "all" (or an empty value) lifts the restriction.
    ///
    /// The filter is left unchanged when the value can't be parsed.
    pub fn set(&mut self, field: FilterField, value: &str) -> Result<(), FilterError> {
        let value = value.trim();
        let any = value.is_empty() || value == ALL;

        match field {
            FilterField::Search => self.search = value.to_string(),
            FilterField::Status => {
                self.status = if any {
                    StatusFilter::Any
                } else {
                    StatusFilter::from_str(value)?
                }
            }
            FilterField::AssetType => {
                self.asset_type = if any {
                    None
                } else {
                    Some(AssetType::from_str(value)?)
                }
            }
            FilterField::Classification => {
                self.classification = if any {
                    None
                } else {
                    Some(Classification::from_str(value)?)
                }
            }
            FilterField::SubType => self.sub_type = text(any, value),
            FilterField::Reviewer => self.reviewer = text(any, value),
            FilterField::Phase => self.phase = text(any, value),
            FilterField::Action => self.action = text(any, value),
        }

        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of active filters, not counting the text search.
    pub fn active_count(&self) -> usize {
        [
            self.status != StatusFilter::Any,
            self.asset_type.is_some(),
            self.sub_type.is_some(),
            self.reviewer.is_some(),
            self.phase.is_some(),
            self.action.is_some(),
            self.classification.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.active_count() == 0
    }

    /// Splits the filter state into independent criteria.
    pub fn criteria(&self) -> Vec<Criterion> {
        let mut criteria = Vec::new();

        if !self.search.is_empty() {
            criteria.push(Criterion::Search(self.search.to_lowercase()));
        }
        if self.status != StatusFilter::Any {
            criteria.push(Criterion::Status(self.status));
        }
        if let Some(asset_type) = self.asset_type {
            criteria.push(Criterion::AssetType(asset_type));
        }
        if let Some(sub_type) = &self.sub_type {
            criteria.push(Criterion::SubType(sub_type.clone()));
        }
        if let Some(reviewer) = &self.reviewer {
            criteria.push(Criterion::Reviewer(reviewer.clone()));
        }
        if let Some(phase) = &self.phase {
            criteria.push(Criterion::Phase(phase.clone()));
        }
        if let Some(action) = &self.action {
            criteria.push(Criterion::Action(action.clone()));
        }
        if let Some(classification) = self.classification {
            criteria.push(Criterion::Classification(classification));
        }

        criteria
    }
}

fn text(any: bool, value: &str) -> Option<String> {
    (!any).then(|| value.to_string())
}

/// Single restriction on submissions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Criterion {
    /// Lower-case needle matched against name, producer, id, type and category.
    Search(String),
    Status(StatusFilter),
    AssetType(AssetType),
    SubType(String),
    Reviewer(String),
    Phase(String),
    Action(String),
    Classification(Classification),
}

impl Criterion {
    pub fn matches(&self, submission: &Submission) -> bool {
        match self {
            Criterion::Search(needle) => [
                submission.name.as_str(),
                submission.producer.as_str(),
                submission.id.as_str(),
                submission.asset_type.as_str(),
                submission.category.as_str(),
            ]
            .iter()
            .any(|haystack| haystack.to_lowercase().contains(needle.as_str())),
            Criterion::Status(status) => status.matches(submission.status),
            Criterion::AssetType(asset_type) => submission.asset_type == *asset_type,
            Criterion::SubType(sub_type) => submission.sub_type.as_ref() == Some(sub_type),
            Criterion::Reviewer(reviewer) => submission.reviewer.as_ref() == Some(reviewer),
            Criterion::Phase(phase) => submission.phase.as_ref() == Some(phase),
            Criterion::Action(action) => submission.action.as_ref() == Some(action),
            Criterion::Classification(classification) => {
                submission.classification == Some(*classification)
            }
        }
    }
}

/// Keeps the submissions matching all criteria, in their original order.
pub fn filter<'a, I>(submissions: I, criteria: &[Criterion]) -> Vec<&'a Submission>
where
    I: IntoIterator<Item = &'a Submission>,
{
    submissions
        .into_iter()
        .filter(|submission| criteria.iter().all(|criterion| criterion.matches(submission)))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown filter \"{0}\"")]
    UnknownField(String),

    #[error(transparent)]
    InvalidValue(#[from] UnknownVariant),
}
