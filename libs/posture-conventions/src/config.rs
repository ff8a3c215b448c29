//! Run configuration: which actions are in scope and which rules are off.

use serde::{Deserialize, Serialize};

use crate::report::Rule;
use crate::resolver::ResolvedAction;

/// Which actions the per-action acknowledgement rules look at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionScope {
    /// Public actions carrying an HTTP verb, directly or through an override.
    #[default]
    HttpExposed,
    /// Every public action.
    AllPublic,
}

impl ActionScope {
    #[must_use]
    pub fn includes(self, action: &ResolvedAction) -> bool {
        match self {
            Self::HttpExposed => action.is_public() && action.is_http_exposed(),
            Self::AllPublic => action.is_public(),
        }
    }
}

/// Tuning knobs for a convention run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConventionsConfig {
    pub action_scope: ActionScope,

    /// Rules left out of the run and the report.
    pub disabled_rules: Vec<Rule>,
}

impl Default for ConventionsConfig {
    fn default() -> Self {
        Self {
            action_scope: ActionScope::HttpExposed,
            disabled_rules: Vec::new(),
        }
    }
}

impl ConventionsConfig {
    #[must_use]
    pub fn is_enabled(&self, rule: Rule) -> bool {
        !self.disabled_rules.contains(&rule)
    }
}
