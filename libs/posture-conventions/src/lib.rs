#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Security posture conventions for web API controllers.
//!
//! Every routed controller and action must resolve to an explicit posture,
//! either authorized or anonymous, and every deviation from the enclosing
//! default must be acknowledged in a reviewed ledger.
//!
//! ```
//! use posture_conventions::{
//!     ActionDescriptor, AnnotationKind, ControllerCatalog, ControllerDescriptor,
//!     ConventionChecks, ConventionsConfig, HttpVerb, Ledger, Rule,
//! };
//!
//! let orders = ControllerDescriptor::named("Api.Orders")?
//!     .with_annotation(AnnotationKind::Authorize)
//!     .with_action(ActionDescriptor::new("Get")?.with_http_verb(HttpVerb::Get));
//! let catalog = ControllerCatalog::new([orders])?;
//! let ledger = Ledger::default();
//! let config = ConventionsConfig::default();
//!
//! let report = ConventionChecks::new(&catalog, &ledger, &config).run_all();
//! assert!(report.passed());
//! assert!(report.outcome(Rule::ExplicitControllerPosture).is_some());
//! # Ok::<(), posture_conventions::ConventionsError>(())
//! ```

pub mod catalog;
pub mod chain;
pub mod checks;
pub mod config;
pub mod error;
pub mod ledger;
pub mod manifest;
pub mod model;
pub mod report;
pub mod resolver;

pub use catalog::ControllerCatalog;
pub use chain::{DeclarationChain, DeclarationLevel};
pub use checks::{AcknowledgementDiff, ConventionChecks, diff_acknowledgements};
pub use config::{ActionScope, ConventionsConfig};
pub use error::{CatalogError, ConventionsError, LedgerError, ManifestError, ModelError};
pub use ledger::{Acknowledgement, AcknowledgementKind, Ledger, ledger_snippet};
pub use manifest::{Manifest, ManifestFormat, ScannedModule, load_manifests, looks_like_manifest};
pub use model::{
    ActionDescriptor, AnnotationKind, ControllerDescriptor, ControllerId, HttpVerb, Posture,
    SecurityAnnotation, Subject, Visibility,
};
pub use report::{CheckOutcome, ConventionReport, Finding, FindingKind, Rule};
pub use resolver::{
    PostureSnapshot, ResolvedAction, ResolvedController, resolve, resolve_action,
    resolve_controller,
};
