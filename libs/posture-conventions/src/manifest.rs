//! Catalog manifests on disk.
//!
//! A manifest describes controllers and, optionally, acknowledgements.
//! Several manifests merge into one scanned module.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::catalog::ControllerCatalog;
use crate::checks::ConventionChecks;
use crate::config::ConventionsConfig;
use crate::error::{ConventionsError, ManifestError, ModelError};
use crate::ledger::{Acknowledgement, Ledger};
use crate::model::{
    ActionDescriptor, AnnotationKind, ControllerDescriptor, ControllerId, HttpVerb, Visibility,
};
use crate::report::ConventionReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Detect the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub controllers: Vec<ControllerEntry>,
    #[serde(default)]
    pub acknowledgements: Vec<Acknowledgement>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Declaration order matters.
    #[serde(default)]
    pub annotations: Vec<AnnotationKind>,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionEntry {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "override")]
    pub is_override: bool,
    #[serde(default)]
    pub http: Vec<HttpVerb>,
    #[serde(default)]
    pub annotations: Vec<AnnotationKind>,
}

impl ControllerEntry {
    /// # Errors
    ///
    /// Returns [`ModelError::BlankIdentity`] for a blank controller, base or
    /// action name.
    pub fn to_descriptor(&self) -> Result<ControllerDescriptor, ModelError> {
        let mut controller = ControllerDescriptor::named(self.name.clone())?;
        if let Some(base) = &self.base {
            controller = controller.with_base(ControllerId::new(base.clone())?);
        }
        if self.is_abstract {
            controller = controller.mark_abstract();
        }
        for kind in &self.annotations {
            controller = controller.with_annotation(*kind);
        }
        for action in &self.actions {
            controller = controller.with_action(action.to_descriptor()?);
        }
        Ok(controller)
    }
}

impl ActionEntry {
    /// # Errors
    ///
    /// Returns [`ModelError::BlankIdentity`] for a blank action name.
    pub fn to_descriptor(&self) -> Result<ActionDescriptor, ModelError> {
        let mut action = ActionDescriptor::new(self.name.clone())?.with_visibility(self.visibility);
        if self.is_override {
            action = action.overriding();
        }
        for verb in &self.http {
            action = action.with_http_verb(*verb);
        }
        for kind in &self.annotations {
            action = action.with_annotation(*kind);
        }
        Ok(action)
    }
}

impl Manifest {
    /// Decode manifest text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] if the text does not decode.
    pub fn parse(text: &str, format: ManifestFormat, path: &Path) -> Result<Self, ManifestError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed = match format {
            ManifestFormat::Yaml => serde_saphyr::from_str(text).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ManifestError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Read and decode a manifest file.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::UnsupportedFormat`] for an unknown extension
    /// - [`ManifestError::Io`] if the file cannot be read
    /// - [`ManifestError::Parse`] if the content does not decode
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let (format, text) = read_source(path)?;
        let manifest = Self::parse(&text, format, path)?;
        log_loaded(path, &manifest);
        Ok(manifest)
    }

    /// Read a file found while walking a directory.
    ///
    /// Returns `None` when the file is not a manifest, i.e. it does not
    /// decode to a mapping with a `controllers` or `acknowledgements` key.
    /// Files that do carry one of the keys are decoded strictly.
    ///
    /// # Errors
    ///
    /// Same as [`Manifest::load`].
    pub fn load_candidate(path: &Path) -> Result<Option<Self>, ManifestError> {
        let (format, text) = read_source(path)?;
        if !looks_like_manifest(&text, format) {
            tracing::debug!(path = %path.display(), "not a manifest, skipped");
            return Ok(None);
        }
        let manifest = Self::parse(&text, format, path)?;
        log_loaded(path, &manifest);
        Ok(Some(manifest))
    }
}

fn read_source(path: &Path) -> Result<(ManifestFormat, String), ManifestError> {
    let format =
        ManifestFormat::from_path(path).ok_or_else(|| ManifestError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
    let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((format, text))
}

fn log_loaded(path: &Path, manifest: &Manifest) {
    tracing::debug!(
        path = %path.display(),
        controllers = manifest.controllers.len(),
        acknowledgements = manifest.acknowledgements.len(),
        "manifest loaded"
    );
}

/// Top-level keys that mark a file as a manifest; everything else is ignored.
#[derive(Deserialize)]
struct ManifestKeys {
    controllers: Option<IgnoredAny>,
    acknowledgements: Option<IgnoredAny>,
}

/// `true` when `text` decodes to a mapping with a `controllers` or
/// `acknowledgements` key.
#[must_use]
pub fn looks_like_manifest(text: &str, format: ManifestFormat) -> bool {
    let keys: Option<ManifestKeys> = match format {
        ManifestFormat::Yaml => serde_saphyr::from_str(text).ok(),
        ManifestFormat::Json => serde_json::from_str(text).ok(),
    };
    keys.is_some_and(|keys| keys.controllers.is_some() || keys.acknowledgements.is_some())
}

/// Catalog and ledger merged from every manifest of one run.
#[derive(Clone, Debug, Default)]
pub struct ScannedModule {
    pub catalog: ControllerCatalog,
    pub ledger: Ledger,
}

impl ScannedModule {
    /// Merge decoded manifests, each paired with the path it came from.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::Descriptor`] for a blank name
    /// - [`ManifestError::Acknowledgement`] for an entry without a reason
    /// - [`ConventionsError::Catalog`] if the merged controllers do not form
    ///   a valid hierarchy
    pub fn from_manifests<I, P>(manifests: I) -> Result<Self, ConventionsError>
    where
        I: IntoIterator<Item = (P, Manifest)>,
        P: AsRef<Path>,
    {
        let mut controllers = Vec::new();
        let mut acknowledgements = Vec::new();

        for (path, manifest) in manifests {
            let path = path.as_ref();
            for entry in &manifest.controllers {
                let descriptor = entry
                    .to_descriptor()
                    .map_err(|source| ManifestError::Descriptor {
                        path: path.to_path_buf(),
                        source,
                    })?;
                controllers.push(descriptor);
            }
            for entry in manifest.acknowledgements {
                entry
                    .validate()
                    .map_err(|source| ManifestError::Acknowledgement {
                        path: path.to_path_buf(),
                        source,
                    })?;
                acknowledgements.push(entry);
            }
        }

        Ok(Self {
            catalog: ControllerCatalog::new(controllers)?,
            ledger: Ledger::new(acknowledgements)?,
        })
    }

    /// Run every enabled convention rule.
    #[must_use]
    pub fn check(&self, config: &ConventionsConfig) -> ConventionReport {
        ConventionChecks::new(&self.catalog, &self.ledger, config).run_all()
    }
}

/// Load and merge manifest files.
///
/// # Errors
///
/// Returns the first load or merge error; see [`Manifest::load`] and
/// [`ScannedModule::from_manifests`].
pub fn load_manifests<P: AsRef<Path>>(paths: &[P]) -> Result<ScannedModule, ConventionsError> {
    let manifests = paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            Manifest::load(path).map(|manifest| (PathBuf::from(path), manifest))
        })
        .collect::<Result<Vec<_>, _>>()?;
    ScannedModule::from_manifests(manifests)
}
