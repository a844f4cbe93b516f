// SPDX-License-Identifier: MIT OR Apache-2.0

//! Producer-side submission form.
//!
//! A `SubmissionDraft` carries everything a producer fills in when registering a new asset. It is
//! validated as a whole and turned into a pending `Submission`.
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::identity::{ActorId, SubmissionId};
use crate::metadata::Metadata;
use crate::submission::Submission;
use crate::timestamp::Timestamp;
use crate::types::{AssetType, Classification};
use crate::validate::{ValidationError, validate_email, validate_text, validate_url};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_PRODUCER_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 255;

/// Upper bound for free-text fields without their own limit.
const MAX_FIELD_LENGTH: usize = 255;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataGovernance {
    pub has_personal_data: bool,
    pub data_classification: Classification,
    pub retention_period: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSpecs {
    pub update_frequency: Option<String>,
    pub availability: Option<String>,
    pub authentication: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDraft {
    pub name: String,
    pub asset_type: AssetType,
    pub description: String,
    pub category: String,
    pub producer: String,
    pub email: String,
    pub format: Option<String>,
    pub size: Option<String>,
    pub endpoint: Option<String>,
    pub documentation: Option<String>,
    pub data_governance: DataGovernance,
    #[serde(default)]
    pub technical_specs: TechnicalSpecs,
}

impl SubmissionDraft {
    /// Validates every field, returning the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("name", &self.name, MAX_NAME_LENGTH)?;
        validate_text("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validate_text("category", &self.category, MAX_FIELD_LENGTH)?;
        validate_text("producer", &self.producer, MAX_PRODUCER_LENGTH)?;
        validate_email("email", &self.email, MAX_EMAIL_LENGTH)?;
        validate_url("endpoint", self.endpoint.as_deref().unwrap_or_default())?;
        validate_url(
            "documentation",
            self.documentation.as_deref().unwrap_or_default(),
        )?;
        validate_text(
            "retention period",
            &self.data_governance.retention_period,
            MAX_FIELD_LENGTH,
        )?;
        Ok(())
    }

    /// Validates the draft and turns it into a pending submission.
    ///
    /// Optional details which have no field of their own on `Submission` end up in its metadata.
    pub fn into_submission(
        self,
        id: SubmissionId,
        producer_id: ActorId,
        now: Timestamp,
    ) -> Result<Submission, ValidationError> {
        self.validate()?;

        let mut metadata = Metadata::new();
        metadata.insert("email", self.email.trim());
        metadata.insert("hasPersonalData", self.data_governance.has_personal_data);
        metadata.insert(
            "retentionPeriod",
            self.data_governance.retention_period.trim(),
        );

        let optional = [
            ("format", &self.format),
            ("size", &self.size),
            ("endpoint", &self.endpoint),
            ("documentation", &self.documentation),
            ("updateFrequency", &self.technical_specs.update_frequency),
            ("availability", &self.technical_specs.availability),
            ("authentication", &self.technical_specs.authentication),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                metadata.insert(key, json!(value));
            }
        }

        let mut submission = Submission::new(
            id,
            self.name.trim(),
            self.asset_type,
            producer_id,
            self.producer.trim(),
            now,
        );
        submission.description = self.description.trim().to_string();
        submission.category = self.category.trim().to_string();
        submission.classification = Some(self.data_governance.data_classification);
        submission.metadata = metadata;

        Ok(submission)
    }
}
