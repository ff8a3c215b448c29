//! Convention checks over a resolved snapshot and the acknowledgement ledger.
//!
//! Ledger-backed rules compute a required set of subjects and compare it
//! with the acknowledged set of the matching kind. Anything required but not
//! acknowledged, or acknowledged but no longer required, fails the rule.

use std::collections::BTreeSet;

use crate::catalog::ControllerCatalog;
use crate::config::ConventionsConfig;
use crate::ledger::{AcknowledgementKind, Ledger, ledger_snippet};
use crate::model::{AnnotationKind, Posture, Subject};
use crate::report::{CheckOutcome, ConventionReport, Finding, FindingKind, Rule};
use crate::resolver::{PostureSnapshot, ResolvedController};

/// Both sides of a required/acknowledged comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AcknowledgementDiff {
    /// Required but not acknowledged.
    pub unacknowledged: BTreeSet<Subject>,
    /// Acknowledged but no longer required.
    pub stale: BTreeSet<Subject>,
}

impl AcknowledgementDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unacknowledged.is_empty() && self.stale.is_empty()
    }
}

#[must_use]
pub fn diff_acknowledgements(
    required: &BTreeSet<Subject>,
    acknowledged: &BTreeSet<Subject>,
) -> AcknowledgementDiff {
    AcknowledgementDiff {
        unacknowledged: required.difference(acknowledged).cloned().collect(),
        stale: acknowledged.difference(required).cloned().collect(),
    }
}

/// Runs the convention rules for one scanned module.
pub struct ConventionChecks<'a> {
    catalog: &'a ControllerCatalog,
    ledger: &'a Ledger,
    config: &'a ConventionsConfig,
    snapshot: PostureSnapshot,
}

impl<'a> ConventionChecks<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a ControllerCatalog,
        ledger: &'a Ledger,
        config: &'a ConventionsConfig,
    ) -> Self {
        Self {
            catalog,
            ledger,
            config,
            snapshot: PostureSnapshot::build(catalog),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &PostureSnapshot {
        &self.snapshot
    }

    /// Run every enabled rule in code order.
    #[must_use]
    pub fn run_all(&self) -> ConventionReport {
        let mut report = ConventionReport::new(self.catalog.len());
        for rule in Rule::ALL {
            if !self.config.is_enabled(rule) {
                tracing::debug!(rule = %rule, "rule disabled");
                continue;
            }
            report.push(self.run(rule));
        }

        tracing::info!(
            controllers = report.controllers_scanned,
            rules = report.outcomes.len(),
            failed = report.failed().count(),
            findings = report.finding_count(),
            "convention checks finished"
        );
        report
    }

    #[must_use]
    pub fn run(&self, rule: Rule) -> CheckOutcome {
        let outcome = match rule {
            Rule::ExplicitControllerPosture => self.explicit_controller_posture(),
            Rule::ActionPostureConflict => self.action_posture_conflicts(),
            Rule::AnonymousControllersAcknowledged => self.anonymous_controllers_acknowledged(),
            Rule::AnonymousActionsAcknowledged => self.anonymous_actions_acknowledged(),
            Rule::AuthorizedActionsAcknowledged => self.authorized_actions_acknowledged(),
            Rule::BaseControllersAbstract => self.base_controllers_abstract(),
            Rule::AbstractControllersDeclareNoPosture => {
                self.abstract_controllers_declare_no_posture()
            }
            Rule::AbstractControllersAddNoActions => self.abstract_controllers_add_no_actions(),
            Rule::LedgerHygiene => self.ledger_hygiene(),
        };
        tracing::debug!(
            rule = %rule,
            passed = outcome.passed(),
            findings = outcome.findings.len(),
            "rule evaluated"
        );
        outcome
    }

    /// Every concrete controller resolves to exactly one posture.
    #[must_use]
    pub fn explicit_controller_posture(&self) -> CheckOutcome {
        let mut findings = Vec::new();
        for controller in self.snapshot.concrete_controllers() {
            let subject = Subject::controller(controller.id().clone());
            if controller.has_conflict() {
                findings.push(Finding::new(
                    subject,
                    FindingKind::ConflictingPosture,
                    format!(
                        "keep only one of {} or {} on {}",
                        AnnotationKind::Authorize.attribute(),
                        AnnotationKind::AllowAnonymous.attribute(),
                        controller.id().short_name()
                    ),
                ));
            } else if controller.posture() == Posture::Unspecified {
                findings.push(Finding::new(
                    subject,
                    FindingKind::MissingPosture,
                    format!(
                        "declare {} or {} on {}",
                        AnnotationKind::Authorize.attribute(),
                        AnnotationKind::AllowAnonymous.attribute(),
                        controller.id().short_name()
                    ),
                ));
            }
        }
        CheckOutcome::new(Rule::ExplicitControllerPosture, findings)
    }

    #[must_use]
    pub fn action_posture_conflicts(&self) -> CheckOutcome {
        let findings = self
            .snapshot
            .controllers()
            .flat_map(|controller| {
                controller
                    .actions()
                    .iter()
                    .filter(|action| action.has_conflict())
                    .map(move |action| {
                        Finding::new(
                            Subject::action(controller.id().clone(), action.name()),
                            FindingKind::ConflictingPosture,
                            format!(
                                "keep only one of {} or {} on {}",
                                AnnotationKind::Authorize.attribute(),
                                AnnotationKind::AllowAnonymous.attribute(),
                                action.name()
                            ),
                        )
                    })
            })
            .collect();
        CheckOutcome::new(Rule::ActionPostureConflict, findings)
    }

    #[must_use]
    pub fn anonymous_controllers_acknowledged(&self) -> CheckOutcome {
        let required = self
            .snapshot
            .concrete_controllers()
            .filter(|c| c.posture() == Posture::Anonymous)
            .map(|c| Subject::controller(c.id().clone()))
            .collect();
        self.ledger_backed(
            Rule::AnonymousControllersAcknowledged,
            AcknowledgementKind::AnonymousController,
            &required,
        )
    }

    #[must_use]
    pub fn anonymous_actions_acknowledged(&self) -> CheckOutcome {
        let required = self.deviating_actions(Posture::Authorized, Posture::Anonymous);
        self.ledger_backed(
            Rule::AnonymousActionsAcknowledged,
            AcknowledgementKind::AnonymousMethod,
            &required,
        )
    }

    #[must_use]
    pub fn authorized_actions_acknowledged(&self) -> CheckOutcome {
        let required = self.deviating_actions(Posture::Anonymous, Posture::Authorized);
        self.ledger_backed(
            Rule::AuthorizedActionsAcknowledged,
            AcknowledgementKind::AuthorizedMethod,
            &required,
        )
    }

    #[must_use]
    pub fn base_controllers_abstract(&self) -> CheckOutcome {
        let findings = self
            .catalog
            .base_ids()
            .into_iter()
            .filter_map(|id| self.catalog.get(id.as_str()))
            .filter(|base| !base.is_abstract())
            .map(|base| {
                Finding::new(
                    Subject::controller(base.id().clone()),
                    FindingKind::NonAbstractBase,
                    format!("mark {} abstract", base.id().short_name()),
                )
            })
            .collect();
        CheckOutcome::new(Rule::BaseControllersAbstract, findings)
    }

    #[must_use]
    pub fn abstract_controllers_declare_no_posture(&self) -> CheckOutcome {
        let findings = self
            .abstract_controllers()
            .filter(|c| c.declares_posture())
            .map(|c| {
                Finding::new(
                    Subject::controller(c.id().clone()),
                    FindingKind::AbstractDeclaresPosture,
                    format!(
                        "move the posture from {} to its derived controllers",
                        c.id().short_name()
                    ),
                )
            })
            .collect();
        CheckOutcome::new(Rule::AbstractControllersDeclareNoPosture, findings)
    }

    #[must_use]
    pub fn abstract_controllers_add_no_actions(&self) -> CheckOutcome {
        let findings = self
            .abstract_controllers()
            .flat_map(|controller| {
                controller
                    .actions()
                    .iter()
                    .filter(|action| action.is_public() && !action.is_override())
                    .map(move |action| {
                        Finding::new(
                            Subject::action(controller.id().clone(), action.name()),
                            FindingKind::PublicActionOnAbstract,
                            format!(
                                "make {} non-public or move it to a concrete controller",
                                action.name()
                            ),
                        )
                    })
            })
            .collect();
        CheckOutcome::new(Rule::AbstractControllersAddNoActions, findings)
    }

    /// Ledger entries point at existing elements and appear once.
    #[must_use]
    pub fn ledger_hygiene(&self) -> CheckOutcome {
        let mut findings = Vec::new();

        for entry in self.ledger.entries() {
            let subject = entry.subject();
            let known = match (self.catalog.get(entry.controller().as_str()), entry.method()) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(controller), Some(method)) => controller.action(method).is_some(),
            };
            if !known {
                tracing::warn!(%subject, kind = %entry.kind(), "acknowledgement references an unknown element");
                let remediation = format!(
                    "fix or remove from ledger: {}",
                    ledger_snippet(entry.kind(), &subject)
                );
                findings.push(Finding::new(
                    subject,
                    FindingKind::UnknownReference,
                    remediation,
                ));
            }
        }

        for entry in self.ledger.duplicates() {
            let subject = entry.subject();
            tracing::warn!(%subject, kind = %entry.kind(), "duplicate acknowledgement");
            let remediation = format!(
                "remove the repeated entry: {}",
                ledger_snippet(entry.kind(), &subject)
            );
            findings.push(Finding::new(
                subject,
                FindingKind::DuplicateAcknowledgement,
                remediation,
            ));
        }

        CheckOutcome::new(Rule::LedgerHygiene, findings)
    }

    fn abstract_controllers(&self) -> impl Iterator<Item = &ResolvedController> {
        self.snapshot.controllers().filter(|c| c.is_abstract())
    }

    /// In-scope actions of concrete `controller_posture` controllers whose
    /// effective posture is `action_posture`.
    fn deviating_actions(
        &self,
        controller_posture: Posture,
        action_posture: Posture,
    ) -> BTreeSet<Subject> {
        let scope = self.config.action_scope;
        self.snapshot
            .concrete_controllers()
            .filter(|c| c.posture() == controller_posture)
            .flat_map(|controller| {
                controller
                    .actions()
                    .iter()
                    .filter(move |action| scope.includes(action))
                    .filter(move |action| action.posture() == action_posture)
                    .map(move |action| Subject::action(controller.id().clone(), action.name()))
            })
            .collect()
    }

    fn ledger_backed(
        &self,
        rule: Rule,
        kind: AcknowledgementKind,
        required: &BTreeSet<Subject>,
    ) -> CheckOutcome {
        let acknowledged = self.ledger.subjects(kind);
        let diff = diff_acknowledgements(required, &acknowledged);

        let missing = diff.unacknowledged.into_iter().map(|subject| {
            let remediation = format!("add to ledger: {}", ledger_snippet(kind, &subject));
            Finding::new(subject, FindingKind::Unacknowledged, remediation)
        });
        let stale = diff.stale.into_iter().map(|subject| {
            let remediation = format!("remove from ledger: {}", ledger_snippet(kind, &subject));
            Finding::new(subject, FindingKind::StaleAcknowledgement, remediation)
        });

        CheckOutcome::new(rule, missing.chain(stale).collect())
    }
}
