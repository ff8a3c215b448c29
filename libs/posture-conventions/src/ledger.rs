//! Acknowledgement ledger.
//!
//! Controllers marked anonymous are insecure, and so is an anonymous action
//! inside an authorized controller. Each such exception has to be listed in
//! the ledger with a reason, so that a posture flipped during local
//! development does not reach production unnoticed. The symmetric case, an
//! authorized action inside an anonymous controller, is acknowledged the
//! same way.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, ModelError};
use crate::model::{ControllerId, Subject};

/// Which deviation an acknowledgement sanctions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcknowledgementKind {
    AnonymousController,
    AnonymousMethod,
    AuthorizedMethod,
}

impl AcknowledgementKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnonymousController => "anonymous_controller",
            Self::AnonymousMethod => "anonymous_method",
            Self::AuthorizedMethod => "authorized_method",
        }
    }
}

impl fmt::Display for AcknowledgementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reviewed exception.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Acknowledgement {
    AnonymousController {
        controller: ControllerId,
        reason: String,
    },
    AnonymousMethod {
        controller: ControllerId,
        method: String,
        reason: String,
    },
    AuthorizedMethod {
        controller: ControllerId,
        method: String,
        reason: String,
    },
}

impl Acknowledgement {
    /// Acknowledge an anonymous controller.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingReason`] if `reason` is blank.
    pub fn anonymous_controller(
        controller: ControllerId,
        reason: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let entry = Self::AnonymousController {
            controller,
            reason: reason.into(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Acknowledge an anonymous action inside an authorized controller.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if `method` or `reason` is blank.
    pub fn anonymous_method(
        controller: ControllerId,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let entry = Self::AnonymousMethod {
            controller,
            method: method.into(),
            reason: reason.into(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Acknowledge an authorized action inside an anonymous controller.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if `method` or `reason` is blank.
    pub fn authorized_method(
        controller: ControllerId,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let entry = Self::AuthorizedMethod {
            controller,
            method: method.into(),
            reason: reason.into(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the identity and reason of an entry, e.g. after deserialization.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Model`] if the method name is blank
    /// - [`LedgerError::MissingReason`] if the reason is blank
    pub fn validate(&self) -> Result<(), LedgerError> {
        if let Some(method) = self.method()
            && method.trim().is_empty()
        {
            return Err(ModelError::BlankIdentity { what: "action" }.into());
        }
        if self.reason().trim().is_empty() {
            return Err(LedgerError::MissingReason {
                subject: self.subject().to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn kind(&self) -> AcknowledgementKind {
        match self {
            Self::AnonymousController { .. } => AcknowledgementKind::AnonymousController,
            Self::AnonymousMethod { .. } => AcknowledgementKind::AnonymousMethod,
            Self::AuthorizedMethod { .. } => AcknowledgementKind::AuthorizedMethod,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &ControllerId {
        match self {
            Self::AnonymousController { controller, .. }
            | Self::AnonymousMethod { controller, .. }
            | Self::AuthorizedMethod { controller, .. } => controller,
        }
    }

    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::AnonymousController { .. } => None,
            Self::AnonymousMethod { method, .. } | Self::AuthorizedMethod { method, .. } => {
                Some(method)
            }
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::AnonymousController { reason, .. }
            | Self::AnonymousMethod { reason, .. }
            | Self::AuthorizedMethod { reason, .. } => reason,
        }
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        match self.method() {
            Some(method) => Subject::action(self.controller().clone(), method),
            None => Subject::controller(self.controller().clone()),
        }
    }
}

/// Ledger entry in manifest syntax, used as remediation text.
#[must_use]
pub fn ledger_snippet(kind: AcknowledgementKind, subject: &Subject) -> String {
    match subject {
        Subject::Controller { controller } => format!(
            "- {{ kind: {kind}, controller: {controller}, reason: \"...reason...\" }}"
        ),
        Subject::Action { controller, action } => format!(
            "- {{ kind: {kind}, controller: {controller}, method: {action}, reason: \"...reason...\" }}"
        ),
    }
}

/// All acknowledgements declared for one run.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    entries: Vec<Acknowledgement>,
}

impl Ledger {
    /// # Errors
    ///
    /// Returns the first [`LedgerError`] raised by [`Acknowledgement::validate`].
    pub fn new(entries: impl IntoIterator<Item = Acknowledgement>) -> Result<Self, LedgerError> {
        let entries: Vec<_> = entries.into_iter().collect();
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self { entries })
    }

    /// Append the entries of another ledger.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn entries(&self) -> &[Acknowledgement] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subjects acknowledged with the given kind.
    #[must_use]
    pub fn subjects(&self, kind: AcknowledgementKind) -> BTreeSet<Subject> {
        self.entries
            .iter()
            .filter(|entry| entry.kind() == kind)
            .map(Acknowledgement::subject)
            .collect()
    }

    /// Entries repeating an earlier (kind, subject) pair.
    #[must_use]
    pub fn duplicates(&self) -> Vec<&Acknowledgement> {
        let mut seen: BTreeMap<(AcknowledgementKind, Subject), usize> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for entry in &self.entries {
            let count = seen.entry((entry.kind(), entry.subject())).or_default();
            *count += 1;
            if *count > 1 {
                duplicates.push(entry);
            }
        }
        duplicates
    }
}
