//! Error types for posture conventions.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::ControllerId;

/// Misuse of the descriptor API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("{what} identity must not be blank")]
    BlankIdentity { what: &'static str },
}

/// The controller set cannot form a valid single-inheritance catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("controller '{0}' is declared more than once")]
    DuplicateController(ControllerId),

    #[error("controller '{controller}' derives from unknown controller '{base}'")]
    UnknownBase {
        controller: ControllerId,
        base: ControllerId,
    },

    #[error("inheritance cycle through controller '{0}'")]
    InheritanceCycle(ControllerId),
}

/// An acknowledgement entry is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("acknowledgement for '{subject}' must state a reason")]
    MissingReason { subject: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Reading or decoding a manifest file failed.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported manifest format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid descriptor in {}: {source}", .path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("invalid acknowledgement in {}: {source}", .path.display())]
    Acknowledgement {
        path: PathBuf,
        #[source]
        source: LedgerError,
    },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum ConventionsError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
