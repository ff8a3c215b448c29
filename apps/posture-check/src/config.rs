//! Layered run configuration: defaults, then an optional YAML file, then
//! `POSTURE_CHECK_*` environment variables.

use std::path::Path;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use posture_conventions::ConventionsConfig;

pub const ENV_PREFIX: &str = "POSTURE_CHECK_";

const ENV_KEYS: &[&str] = &["action_scope", "disabled_rules"];

/// Build the figment for a run without extracting it.
#[must_use]
pub fn layered(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(ConventionsConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Yaml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
}

/// Load the convention configuration.
///
/// # Errors
///
/// Fails if `path` does not exist or any layer holds an invalid value.
pub fn load(path: Option<&Path>) -> Result<ConventionsConfig> {
    if let Some(path) = path
        && !path.is_file()
    {
        bail!("config file not found: {}", path.display());
    }
    let config: ConventionsConfig = layered(path)
        .extract()
        .context("invalid posture-check configuration")?;
    tracing::debug!(
        action_scope = ?config.action_scope,
        disabled = config.disabled_rules.len(),
        "configuration loaded"
    );
    Ok(config)
}
