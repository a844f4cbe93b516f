// SPDX-License-Identifier: MIT OR Apache-2.0

//! Closed value sets describing a submission.
//!
//! All of them serialise to the same lower-case strings the backend stores, `Display` and
//! `FromStr` round-trip through that wire representation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Implements `Display` and `FromStr` for an enum exposing `ALL` and `as_str`.
macro_rules! impl_wire_str {
    ($ty:ty, $kind:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::types::UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|variant| variant.as_str() == value)
                    .ok_or_else(|| $crate::types::UnknownVariant::new($kind, value))
            }
        }
    };
}

pub(crate) use impl_wire_str;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown {kind}: \"{value}\"")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Advisory urgency of a submission. Nothing in the workflow enforces it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Sort rank, higher is more urgent.
    pub const fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl_wire_str!(Priority, "priority");

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Dataset,
    Api,
    Stream,
    Model,
}

impl AssetType {
    pub const ALL: [AssetType; 4] = [
        AssetType::Dataset,
        AssetType::Api,
        AssetType::Stream,
        AssetType::Model,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AssetType::Dataset => "dataset",
            AssetType::Api => "api",
            AssetType::Stream => "stream",
            AssetType::Model => "model",
        }
    }
}

impl_wire_str!(AssetType, "asset type");

/// Data classification declared in the governance section of a submission.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Public,
    Internal,
    Confidential,
}

impl Classification {
    pub const ALL: [Classification; 3] = [
        Classification::Public,
        Classification::Internal,
        Classification::Confidential,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Classification::Public => "public",
            Classification::Internal => "internal",
            Classification::Confidential => "confidential",
        }
    }
}

impl_wire_str!(Classification, "classification");

/// Higher authority a submission can be escalated to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationTarget {
    SeniorReviewer,
    Manager,
    Director,
    Vp,
}

impl EscalationTarget {
    pub const ALL: [EscalationTarget; 4] = [
        EscalationTarget::SeniorReviewer,
        EscalationTarget::Manager,
        EscalationTarget::Director,
        EscalationTarget::Vp,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EscalationTarget::SeniorReviewer => "senior-reviewer",
            EscalationTarget::Manager => "manager",
            EscalationTarget::Director => "director",
            EscalationTarget::Vp => "vp",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            EscalationTarget::SeniorReviewer => "Senior Data Steward",
            EscalationTarget::Manager => "Approval Manager",
            EscalationTarget::Director => "Data Governance Director",
            EscalationTarget::Vp => "VP Data Governance",
        }
    }
}

impl_wire_str!(EscalationTarget, "escalation target");

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AssetType, Classification, EscalationTarget, Priority};

    #[test]
    fn priority_rank_is_not_alphabetical() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn wire_strings() {
        assert_eq!(AssetType::from_str("api").unwrap(), AssetType::Api);
        assert_eq!(
            EscalationTarget::from_str("senior-reviewer").unwrap(),
            EscalationTarget::SeniorReviewer
        );
        assert_eq!(Classification::Confidential.to_string(), "confidential");

        let err = Priority::from_str("urgent").unwrap_err();
        assert_eq!(err.to_string(), "unknown priority: \"urgent\"");
    }

    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_string(&EscalationTarget::SeniorReviewer).unwrap();
        assert_eq!(json, "\"senior-reviewer\"");

        let priority: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(priority, Priority::High);
    }
}
