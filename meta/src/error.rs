//! Error types for metadata loading.
//!
//! Any of these aborts the load; no partial schema is returned.

use std::path::PathBuf;

use ccpp_schema_core::SchemaError;
use thiserror::Error;

/// Errors that can occur while loading and resolving metadata.
#[derive(Debug, Error)]
pub enum MetaError {
    /// File I/O failure.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed block syntax in a metadata file.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The parsed entries do not form a consistent schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MetaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Convenience alias for results with [`MetaError`].
pub type Result<T> = std::result::Result<T, MetaError>;
