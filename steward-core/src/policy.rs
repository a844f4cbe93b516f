// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic auto-approval and routing rules.
//!
//! A submission is eligible for automated approval when all required governance checks recorded
//! in its metadata passed and at least one enabled rule with an auto-approve action matches it.
//! The same rules are used to route submissions: assigning reviewers, tagging and adjusting
//! priority.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::submission::Submission;
use crate::types::{AssetType, Priority};

/// Governance checks which have to pass before anything is approved automatically.
pub const DEFAULT_REQUIRED_CHECKS: [&str; 4] = [
    "schema_reviewed",
    "classification_verified",
    "pii_identified",
    "security_compliance",
];

pub const MANUAL_REVIEW_ACTION: &str = "Proceed to manual review";

/// Which submissions a rule applies to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "type", rename_all = "snake_case")]
pub enum RuleScope {
    #[default]
    All,
    AssetType(AssetType),
}

impl RuleScope {
    pub fn includes(&self, submission: &Submission) -> bool {
        match self {
            RuleScope::All => true,
            RuleScope::AssetType(asset_type) => submission.asset_type == *asset_type,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    NotEquals,
    GreaterThan,
    LessThan,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Returns true if the submission satisfies this condition.
    ///
    /// Fields which are not set on the submission never match, regardless of the operator.
    pub fn matches(&self, submission: &Submission) -> bool {
        let Some(actual) = field_value(submission, &self.field) else {
            return false;
        };

        match self.operator {
            Operator::Equals => actual.eq_ignore_ascii_case(self.value.trim()),
            Operator::NotEquals => !actual.eq_ignore_ascii_case(self.value.trim()),
            Operator::Contains => actual
                .to_lowercase()
                .contains(&self.value.trim().to_lowercase()),
            Operator::GreaterThan | Operator::LessThan => {
                let (Some(actual), Some(expected)) =
                    (parse_quantity(&actual), parse_quantity(&self.value))
                else {
                    return false;
                };
                if self.operator == Operator::GreaterThan {
                    actual > expected
                } else {
                    actual < expected
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum RuleAction {
    AutoApprove,
    AssignReviewer(String),
    AddTag(String),
    SetPriority(Priority),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub scope: RuleScope,
    /// All conditions need to match. A rule without conditions matches every submission.
    pub conditions: Vec<Condition>,
    pub actions: Vec<RuleAction>,
}

impl Rule {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.enabled
            && self.scope.includes(submission)
            && self
                .conditions
                .iter()
                .all(|condition| condition.matches(submission))
    }

    pub fn auto_approves(&self) -> bool {
        self.actions.contains(&RuleAction::AutoApprove)
    }
}

/// Rule which auto-approved a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eligibility {
    pub rule_id: String,
    pub rule_name: String,
}

/// Reasons why a submission can't be approved automatically and what to do about it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("submission is not eligible for auto-approval ({} failed checks)", .failed_checks.len())]
pub struct PolicyRejection {
    pub failed_checks: Vec<String>,
    pub no_matching_rule: bool,
    pub suggested_actions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub rules: Vec<Rule>,
    pub required_checks: Vec<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            required_checks: DEFAULT_REQUIRED_CHECKS
                .iter()
                .map(|check| check.to_string())
                .collect(),
        }
    }
}

impl Policy {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    pub fn with_required_checks(mut self, checks: Vec<String>) -> Self {
        self.required_checks = checks;
        self
    }

    /// Decides if the submission qualifies for automated approval.
    pub fn evaluate(&self, submission: &Submission) -> Result<Eligibility, PolicyRejection> {
        let checks = submission.metadata.governance_checks();
        let failed_checks: Vec<String> = self
            .required_checks
            .iter()
            .filter(|check| !checks.get(check.as_str()).copied().unwrap_or(false))
            .cloned()
            .collect();

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.auto_approves() && rule.matches(submission));

        match rule {
            Some(rule) if failed_checks.is_empty() => Ok(Eligibility {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
            }),
            rule => {
                let mut suggested_actions: Vec<String> = failed_checks
                    .iter()
                    .map(|check| remediation(check))
                    .collect();
                suggested_actions.push(MANUAL_REVIEW_ACTION.to_string());

                Err(PolicyRejection {
                    failed_checks,
                    no_matching_rule: rule.is_none(),
                    suggested_actions,
                })
            }
        }
    }

    /// Recomputes the advisory eligibility flag, returns true if it changed.
    pub fn refresh_eligibility(&self, submission: &mut Submission) -> bool {
        let eligible = self.evaluate(submission).is_ok();
        let changed = submission.auto_approval_eligible != eligible;
        submission.auto_approval_eligible = eligible;
        changed
    }

    /// Applies the routing actions of all matching rules and returns their ids.
    ///
    /// Rules are matched against the submission as it was before routing. A reviewer is only
    /// assigned when none is set yet, the first matching rule wins.
    pub fn route(&self, submission: &mut Submission) -> Vec<String> {
        let matching: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(submission))
            .collect();
        let mut matched = Vec::with_capacity(matching.len());

        for rule in matching {
            for action in &rule.actions {
                match action {
                    RuleAction::AutoApprove => (),
                    RuleAction::AssignReviewer(reviewer) => {
                        if submission.reviewer.is_none() {
                            submission.reviewer = Some(reviewer.clone());
                        }
                    }
                    RuleAction::AddTag(tag) => {
                        submission.metadata.add_tag(tag);
                    }
                    RuleAction::SetPriority(priority) => submission.priority = *priority,
                }
            }
            matched.push(rule.id.clone());
        }

        matched
    }
}

fn remediation(check: &str) -> String {
    match check {
        "schema_reviewed" => "Review and document the schema".to_string(),
        "classification_verified" => "Verify the data classification".to_string(),
        "pii_identified" => "Identify and document personal data fields".to_string(),
        "security_compliance" => "Complete the security compliance review".to_string(),
        other => format!("Complete the {} check", other.replace('_', " ")),
    }
}

fn field_value(submission: &Submission, field: &str) -> Option<String> {
    match field {
        "producer" => Some(submission.producer.clone()),
        "category" => Some(submission.category.clone()),
        "name" => Some(submission.name.clone()),
        "type" => Some(submission.asset_type.to_string()),
        "dataClassification" => submission.classification.map(|c| c.to_string()),
        "priority" => Some(submission.priority.to_string()),
        "riskScore" => Some(submission.risk_score.to_string()),
        key => submission.metadata.get_str(key),
    }
}

/// Parses plain numbers and data sizes like "500 MB" into a comparable quantity.
///
/// Size units are powers of 1024, values are returned in bytes.
pub fn parse_quantity(value: &str) -> Option<f64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "%" => 1.0,
        _ => return None,
    };

    Some(number * multiplier)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rstest::rstest;
    use serde_json::json;

    use crate::submission::Submission;
    use crate::timestamp::Timestamp;
    use crate::types::{AssetType, Classification, Priority};

    use super::{
        Condition, MANUAL_REVIEW_ACTION, Operator, Policy, PolicyRejection, Rule, RuleAction,
        RuleScope, parse_quantity,
    };

    fn submission() -> Submission {
        let mut submission = Submission::new(
            "S1",
            "Weather Observations",
            AssetType::Dataset,
            "p1",
            "Climate Team",
            Timestamp::from_secs(1),
        );
        submission.category = "Environment".into();
        submission.classification = Some(Classification::Public);
        submission.risk_score = 12;
        submission.metadata.insert("size", "250 MB");
        submission
    }

    fn all_checks_passed(submission: &mut Submission) {
        submission.metadata.insert(
            "governanceChecks",
            json!({
                "schema_reviewed": true,
                "classification_verified": true,
                "pii_identified": true,
                "security_compliance": true,
            }),
        );
    }

    fn low_risk_rule() -> Rule {
        Rule {
            id: "r1".into(),
            name: "Low risk public datasets".into(),
            enabled: true,
            scope: RuleScope::AssetType(AssetType::Dataset),
            conditions: vec![
                Condition::new("dataClassification", Operator::Equals, "public"),
                Condition::new("riskScore", Operator::LessThan, "30"),
                Condition::new("size", Operator::LessThan, "1 GB"),
            ],
            actions: vec![
                RuleAction::AutoApprove,
                RuleAction::AddTag("low-risk".into()),
            ],
        }
    }

    #[rstest]
    #[case("42", Some(42.0))]
    #[case("1.5 KB", Some(1536.0))]
    #[case("2GB", Some(2.0 * 1024.0 * 1024.0 * 1024.0))]
    #[case("90%", Some(90.0))]
    #[case("lots", None)]
    #[case("5 parsecs", None)]
    fn quantities(#[case] value: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_quantity(value), expected);
    }

    #[rstest]
    #[case(Condition::new("category", Operator::Equals, "environment"), true)]
    #[case(Condition::new("name", Operator::Contains, "observ"), true)]
    #[case(Condition::new("producer", Operator::NotEquals, "Climate Team"), false)]
    #[case(Condition::new("size", Operator::GreaterThan, "100 MB"), true)]
    #[case(Condition::new("size", Operator::GreaterThan, "many"), false)]
    #[case(Condition::new("retention", Operator::NotEquals, "1 year"), false)]
    fn conditions(#[case] condition: Condition, #[case] expected: bool) {
        assert_eq!(condition.matches(&submission()), expected);
    }

    #[test]
    fn eligible() {
        let mut submission = submission();
        all_checks_passed(&mut submission);

        let policy = Policy::new(vec![low_risk_rule()]);
        let eligibility = policy.evaluate(&submission).unwrap();
        assert_eq!(eligibility.rule_id, "r1");
    }

    #[test]
    fn failed_checks_come_with_remediation() {
        let mut submission = submission();
        all_checks_passed(&mut submission);
        submission
            .metadata
            .set_governance_check("pii_identified", false);

        let policy = Policy::new(vec![low_risk_rule()]);
        let rejection = policy.evaluate(&submission).unwrap_err();
        assert_eq!(rejection.failed_checks, vec!["pii_identified".to_string()]);
        assert!(!rejection.no_matching_rule);
        assert_eq!(
            rejection.suggested_actions,
            vec![
                "Identify and document personal data fields".to_string(),
                MANUAL_REVIEW_ACTION.to_string(),
            ]
        );
    }

    #[test]
    fn disabled_or_out_of_scope_rules() {
        let mut submission = submission();
        all_checks_passed(&mut submission);

        let mut disabled = low_risk_rule();
        disabled.enabled = false;
        assert_matches!(
            Policy::new(vec![disabled]).evaluate(&submission),
            Err(PolicyRejection {
                no_matching_rule: true,
                ..
            })
        );

        submission.asset_type = AssetType::Api;
        assert!(
            Policy::new(vec![low_risk_rule()])
                .evaluate(&submission)
                .is_err()
        );
    }

    #[test]
    fn eligibility_flag() {
        let mut submission = submission();
        let policy = Policy::new(vec![low_risk_rule()]);

        assert!(!policy.refresh_eligibility(&mut submission));
        assert!(!submission.auto_approval_eligible);

        all_checks_passed(&mut submission);
        assert!(policy.refresh_eligibility(&mut submission));
        assert!(submission.auto_approval_eligible);
    }

    #[test]
    fn routing() {
        let mut submission = submission();
        let policy = Policy::new(vec![
            Rule {
                id: "r2".into(),
                name: "Environment data to Mike".into(),
                enabled: true,
                scope: RuleScope::All,
                conditions: vec![Condition::new("category", Operator::Equals, "Environment")],
                actions: vec![
                    RuleAction::AssignReviewer("Mike Chen".into()),
                    RuleAction::SetPriority(Priority::High),
                ],
            },
            Rule {
                id: "r3".into(),
                name: "Catch all".into(),
                enabled: true,
                scope: RuleScope::All,
                conditions: vec![],
                actions: vec![RuleAction::AssignReviewer("Sarah Mitchell".into())],
            },
        ]);

        let matched = policy.route(&mut submission);
        assert_eq!(matched, vec!["r2".to_string(), "r3".to_string()]);
        assert_eq!(submission.reviewer.as_deref(), Some("Mike Chen"));
        assert_eq!(submission.priority, Priority::High);
    }

    #[test]
    fn routing_matches_submission_before_changes() {
        let mut submission = submission();
        let policy = Policy::new(vec![
            Rule {
                id: "r2".into(),
                name: "Environment data is urgent".into(),
                enabled: true,
                scope: RuleScope::All,
                conditions: vec![Condition::new("category", Operator::Equals, "Environment")],
                actions: vec![RuleAction::SetPriority(Priority::High)],
            },
            Rule {
                id: "r4".into(),
                name: "Urgent data to the lead".into(),
                enabled: true,
                scope: RuleScope::All,
                conditions: vec![Condition::new("priority", Operator::Equals, "high")],
                actions: vec![RuleAction::AssignReviewer("Sarah Mitchell".into())],
            },
        ]);

        let matched = policy.route(&mut submission);
        assert_eq!(matched, vec!["r2".to_string()]);
        assert_eq!(submission.priority, Priority::High);
        assert_eq!(submission.reviewer, None);
    }
}
