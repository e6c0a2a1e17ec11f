//! Error types emitted by the strandmap CLI.
//!
//! Keep this error type reasonably small, as most CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

use strandmap_core::{SchemaError, StoreError};
use strandmap_data::{GeoImportError, SchemaImportError};

/// Errors emitted by the strandmap CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Name of the missing flag.
        field: &'static str,
        /// Environment variable that can supply it instead.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag the path came from.
        field: &'static str,
        /// The offending path.
        path: Utf8PathBuf,
    },
    /// Creating the database's parent directory failed.
    #[error("failed to create parent directory for {path:?}")]
    CreateDbDirectory {
        /// Database path whose parent could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Reading an import document failed.
    #[error("failed to read import document {path:?}")]
    ReadDocument {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Initialising or migrating the database schema failed.
    #[error("failed to prepare inventory database: {0}")]
    Schema(#[from] SchemaError),
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A structured schema import failed.
    #[error(transparent)]
    SchemaImport(#[from] SchemaImportError),
    /// A GeoJSON import failed.
    #[error(transparent)]
    GeoImport(#[from] GeoImportError),
    /// Rendering the import report as JSON failed.
    #[error("failed to render import report")]
    Render(#[source] serde_json::Error),
}
