// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-form key-value bag attached to every submission.
//!
//! Most keys are domain specific (format, size, update frequency) and only displayed, a handful
//! of well-known keys are read by the workflow and get typed accessors here.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::identity::Actor;
use crate::timestamp::Timestamp;
use crate::types::EscalationTarget;

pub const CURRENT_STEP: &str = "currentStep";
pub const SLA_TARGET: &str = "slaTarget";
pub const APPROVERS: &str = "approvers";
pub const GOVERNANCE_CHECKS: &str = "governanceChecks";
pub const REVIEW_STARTED_AT: &str = "reviewStartedAt";
pub const ESCALATIONS: &str = "escalations";
pub const TAGS: &str = "tags";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns a value as display string, plain strings are returned without quotes.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(value) => Some(value.clone()),
            value => Some(value.to_string()),
        }
    }

    pub fn current_step(&self) -> Option<&str> {
        self.0.get(CURRENT_STEP).and_then(Value::as_str)
    }

    pub fn set_current_step(&mut self, step: impl Into<String>) {
        self.insert(CURRENT_STEP, step.into());
    }

    /// Target review duration in days.
    ///
    /// The value is stored as free text like "5 business days", only the leading integer is
    /// significant.
    pub fn sla_target_days(&self) -> Option<u64> {
        match self.0.get(SLA_TARGET)? {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => {
                let digits: String = text
                    .trim_start()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            }
            _ => None,
        }
    }

    pub fn approvers(&self) -> Vec<String> {
        self.string_list(APPROVERS)
    }

    /// Governance checklist, check name mapped to whether it passed.
    pub fn governance_checks(&self) -> BTreeMap<String, bool> {
        let Some(Value::Object(checks)) = self.0.get(GOVERNANCE_CHECKS) else {
            return BTreeMap::new();
        };

        checks
            .iter()
            .map(|(name, passed)| (name.clone(), passed.as_bool().unwrap_or(false)))
            .collect()
    }

    pub fn set_governance_check(&mut self, name: &str, passed: bool) {
        let entry = self
            .0
            .entry(GOVERNANCE_CHECKS.to_string())
            .or_insert_with(|| json!({}));
        if !entry.is_object() {
            *entry = json!({});
        }
        if let Value::Object(checks) = entry {
            checks.insert(name.to_string(), Value::Bool(passed));
        }
    }

    pub fn review_started_at(&self) -> Option<Timestamp> {
        self.0
            .get(REVIEW_STARTED_AT)
            .and_then(Value::as_u64)
            .map(Timestamp::from_micros)
    }

    pub fn set_review_started_at(&mut self, timestamp: Timestamp) {
        self.insert(REVIEW_STARTED_AT, timestamp.as_micros());
    }

    pub fn escalations(&self) -> &[Value] {
        match self.0.get(ESCALATIONS) {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => &[],
        }
    }

    pub fn push_escalation(
        &mut self,
        target: EscalationTarget,
        reason: &str,
        by: &Actor,
        at: Timestamp,
    ) {
        let entry = json!({
            "target": target.as_str(),
            "reason": reason,
            "by": by.id.as_str(),
            "at": at.as_micros(),
        });

        self.push_to_list(ESCALATIONS, entry);
    }

    pub fn tags(&self) -> Vec<String> {
        self.string_list(TAGS)
    }

    /// Adds a tag, returns false if it was already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags().iter().any(|existing| existing == tag) {
            return false;
        }
        self.push_to_list(TAGS, Value::String(tag.to_string()));
        true
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(value)) => value
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn push_to_list(&mut self, key: &str, value: Value) {
        let entry = self.0.entry(key.to_string()).or_insert_with(|| json!([]));
        if !entry.is_array() {
            *entry = json!([]);
        }
        if let Value::Array(entries) = entry {
            entries.push(value);
        }
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::identity::Actor;
    use crate::timestamp::Timestamp;
    use crate::types::EscalationTarget;

    use super::{Metadata, SLA_TARGET};

    #[test]
    fn sla_target_from_text() {
        let mut metadata = Metadata::new();
        assert_eq!(metadata.sla_target_days(), None);

        metadata.insert(SLA_TARGET, "5 business days");
        assert_eq!(metadata.sla_target_days(), Some(5));

        metadata.insert(SLA_TARGET, 3);
        assert_eq!(metadata.sla_target_days(), Some(3));

        metadata.insert(SLA_TARGET, "soon");
        assert_eq!(metadata.sla_target_days(), None);
    }

    #[test]
    fn governance_checks() {
        let mut metadata = Metadata::new();
        metadata.insert(
            "governanceChecks",
            json!({ "schema_reviewed": true, "pii_identified": "yes" }),
        );
        metadata.set_governance_check("security_compliance", true);

        let checks = metadata.governance_checks();
        assert_eq!(checks.get("schema_reviewed"), Some(&true));
        assert_eq!(checks.get("pii_identified"), Some(&false));
        assert_eq!(checks.get("security_compliance"), Some(&true));
    }

    #[test]
    fn escalations_and_tags() {
        let mut metadata = Metadata::new();
        metadata.push_escalation(
            EscalationTarget::Director,
            "Blocked for two weeks",
            &Actor::new("u1", "Sarah Mitchell"),
            Timestamp::from_secs(10),
        );
        assert_eq!(metadata.escalations().len(), 1);
        assert_eq!(metadata.escalations()[0]["target"], json!("director"));

        assert!(metadata.add_tag("pii"));
        assert!(!metadata.add_tag("pii"));
        assert_eq!(metadata.tags(), vec!["pii".to_string()]);
    }

    #[test]
    fn approvers_from_list_or_text() {
        let mut metadata = Metadata::new();
        metadata.insert("approvers", json!(["Sarah", "Mike"]));
        assert_eq!(metadata.approvers().len(), 2);

        metadata.insert("approvers", "Sarah, Mike ,");
        assert_eq!(metadata.approvers(), vec!["Sarah", "Mike"]);
    }
}
