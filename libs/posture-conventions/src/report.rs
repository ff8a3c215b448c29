//! Findings and the per-rule report.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Subject;

/// Convention rules with their stable codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "SC10")]
    ExplicitControllerPosture,
    #[serde(rename = "SC11")]
    ActionPostureConflict,
    #[serde(rename = "SC20")]
    AnonymousControllersAcknowledged,
    #[serde(rename = "SC30")]
    AnonymousActionsAcknowledged,
    #[serde(rename = "SC31")]
    AuthorizedActionsAcknowledged,
    #[serde(rename = "SC40")]
    BaseControllersAbstract,
    #[serde(rename = "SC50")]
    AbstractControllersDeclareNoPosture,
    #[serde(rename = "SC60")]
    AbstractControllersAddNoActions,
    #[serde(rename = "SC70")]
    LedgerHygiene,
}

impl Rule {
    /// Every rule, in report order.
    pub const ALL: [Rule; 9] = [
        Rule::ExplicitControllerPosture,
        Rule::ActionPostureConflict,
        Rule::AnonymousControllersAcknowledged,
        Rule::AnonymousActionsAcknowledged,
        Rule::AuthorizedActionsAcknowledged,
        Rule::BaseControllersAbstract,
        Rule::AbstractControllersDeclareNoPosture,
        Rule::AbstractControllersAddNoActions,
        Rule::LedgerHygiene,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ExplicitControllerPosture => "SC10",
            Self::ActionPostureConflict => "SC11",
            Self::AnonymousControllersAcknowledged => "SC20",
            Self::AnonymousActionsAcknowledged => "SC30",
            Self::AuthorizedActionsAcknowledged => "SC31",
            Self::BaseControllersAbstract => "SC40",
            Self::AbstractControllersDeclareNoPosture => "SC50",
            Self::AbstractControllersAddNoActions => "SC60",
            Self::LedgerHygiene => "SC70",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::ExplicitControllerPosture => "controllers declare an explicit posture",
            Self::ActionPostureConflict => "actions do not declare both postures",
            Self::AnonymousControllersAcknowledged => "anonymous controllers are acknowledged",
            Self::AnonymousActionsAcknowledged => {
                "anonymous actions in authorized controllers are acknowledged"
            }
            Self::AuthorizedActionsAcknowledged => {
                "authorized actions in anonymous controllers are acknowledged"
            }
            Self::BaseControllersAbstract => "base controllers are abstract",
            Self::AbstractControllersDeclareNoPosture => "abstract controllers declare no posture",
            Self::AbstractControllersAddNoActions => "abstract controllers add no public actions",
            Self::LedgerHygiene => "acknowledgements reference existing elements",
        }
    }

    /// Look a rule up by its code, e.g. `SC30`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rule| rule.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Required by the conventions but missing from the ledger.
    Unacknowledged,
    /// Present in the ledger but no longer required.
    StaleAcknowledgement,
    MissingPosture,
    ConflictingPosture,
    NonAbstractBase,
    AbstractDeclaresPosture,
    PublicActionOnAbstract,
    UnknownReference,
    DuplicateAcknowledgement,
}

impl FindingKind {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Unacknowledged => "missing acknowledgement",
            Self::StaleAcknowledgement => "stale acknowledgement",
            Self::MissingPosture => "no posture declared",
            Self::ConflictingPosture => "both postures declared",
            Self::NonAbstractBase => "base controller is not abstract",
            Self::AbstractDeclaresPosture => "abstract controller declares a posture",
            Self::PublicActionOnAbstract => "public action on abstract controller",
            Self::UnknownReference => "acknowledgement references an unknown element",
            Self::DuplicateAcknowledgement => "duplicate acknowledgement",
        }
    }
}

/// One violation, with a fix the developer can apply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub subject: Subject,
    pub kind: FindingKind,
    pub remediation: String,
}

impl Finding {
    #[must_use]
    pub fn new(subject: Subject, kind: FindingKind, remediation: impl Into<String>) -> Self {
        Self {
            subject,
            kind,
            remediation: remediation.into(),
        }
    }
}

/// Result of running one rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub rule: Rule,
    pub title: &'static str,
    pub passed: bool,
    pub findings: Vec<Finding>,
}

impl CheckOutcome {
    #[must_use]
    pub fn new(rule: Rule, findings: Vec<Finding>) -> Self {
        Self {
            rule,
            title: rule.title(),
            passed: findings.is_empty(),
            findings,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Subjects required by the rule but missing from the ledger.
    pub fn unacknowledged(&self) -> impl Iterator<Item = &Subject> {
        self.of_kind(FindingKind::Unacknowledged)
    }

    /// Subjects in the ledger the rule no longer requires.
    pub fn stale(&self) -> impl Iterator<Item = &Subject> {
        self.of_kind(FindingKind::StaleAcknowledgement)
    }

    fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Subject> {
        self.findings
            .iter()
            .filter(move |f| f.kind == kind)
            .map(|f| &f.subject)
    }

    /// Plain-text failure message listing every finding with its remediation.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let header = format!("{} {}", self.rule.code(), self.rule.title());
        if self.passed {
            return format!("{header}: ok");
        }
        let mut lines = vec![format!("{header}: {} finding(s)", self.findings.len())];
        for finding in &self.findings {
            lines.push(format!(
                "  - {}: {}",
                finding.subject,
                finding.kind.describe()
            ));
            lines.push(format!("    {}", finding.remediation));
        }
        lines.join("\n")
    }
}

/// Outcomes of every enabled rule for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConventionReport {
    pub controllers_scanned: usize,
    pub outcomes: Vec<CheckOutcome>,
}

impl ConventionReport {
    #[must_use]
    pub fn new(controllers_scanned: usize) -> Self {
        Self {
            controllers_scanned,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: CheckOutcome) {
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    #[must_use]
    pub fn outcome(&self, rule: Rule) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.rule == rule)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    #[must_use]
    pub fn failed_rules(&self) -> Vec<Rule> {
        self.failed().map(|o| o.rule).collect()
    }

    #[must_use]
    pub fn finding_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.findings.len()).sum()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::ControllerId;

    #[test]
    fn codes_round_trip_through_lookup() {
        for rule in Rule::ALL {
            assert_eq!(Rule::from_code(rule.code()), Some(rule));
        }
        assert_eq!(Rule::from_code("sc30"), Some(Rule::AnonymousActionsAcknowledged));
        assert_eq!(Rule::from_code("SC99"), None);
    }

    #[test]
    fn rule_serializes_as_code() {
        let json = serde_json::to_string(&Rule::LedgerHygiene).unwrap();
        assert_eq!(json, "\"SC70\"");
    }

    #[test]
    fn outcome_without_findings_passes() {
        let outcome = CheckOutcome::new(Rule::BaseControllersAbstract, Vec::new());
        assert!(outcome.passed());
        assert_eq!(outcome.diagnostic(), "SC40 base controllers are abstract: ok");
    }

    #[test]
    fn diagnostic_lists_subject_and_remediation() {
        let id = ControllerId::new("Api.Orders").unwrap();
        let outcome = CheckOutcome::new(
            Rule::ExplicitControllerPosture,
            vec![Finding::new(
                Subject::controller(id),
                FindingKind::MissingPosture,
                "add [Authorize] or [AllowAnonymous]",
            )],
        );
        assert!(!outcome.passed());

        let text = outcome.diagnostic();
        assert!(text.contains("1 finding(s)"));
        assert!(text.contains("Api.Orders: no posture declared"));
        assert!(text.contains("add [Authorize] or [AllowAnonymous]"));
    }

    #[test]
    fn report_collects_failed_rules() {
        let id = ControllerId::new("Api.Orders").unwrap();
        let mut report = ConventionReport::new(1);
        report.push(CheckOutcome::new(Rule::ExplicitControllerPosture, Vec::new()));
        report.push(CheckOutcome::new(
            Rule::AnonymousControllersAcknowledged,
            vec![Finding::new(
                Subject::controller(id),
                FindingKind::Unacknowledged,
                "",
            )],
        ));

        assert!(!report.passed());
        assert_eq!(
            report.failed_rules(),
            vec![Rule::AnonymousControllersAcknowledged]
        );
        assert_eq!(report.finding_count(), 1);
        let outcome = report.outcome(Rule::AnonymousControllersAcknowledged).unwrap();
        assert_eq!(outcome.unacknowledged().count(), 1);
        assert_eq!(outcome.stale().count(), 0);
    }
}
