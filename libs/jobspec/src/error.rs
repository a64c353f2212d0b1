//! Error types for job document construction and mutation.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The level of the job tree a lookup was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Task,
    Service,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            NodeKind::Group => "group",
            NodeKind::Task => "task",
            NodeKind::Service => "service",
        };
        f.write_str(kind)
    }
}

/// Errors that can occur when building or mutating a job document.
#[derive(Debug, Error)]
pub enum JobSpecError {
    /// A named group, task or service does not exist in the document.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: NodeKind, name: String },

    /// A network operation ran against a task with no network block.
    #[error("task '{task}' has no network block")]
    MissingNetwork { task: String },

    /// Environment values must be strings, numbers or booleans.
    #[error("env '{key}' must be a string, number or boolean, got {value}")]
    InvalidEnv { key: String, value: serde_json::Value },

    /// A document skeleton could not be read or parsed.
    #[error("invalid template '{name}': {source}")]
    Template {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A template file could not be read from disk.
    #[error("failed to read template {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A job document could not be serialized or parsed.
    #[error("invalid job document: {0}")]
    Json(#[from] serde_json::Error),
}

impl JobSpecError {
    pub(crate) fn not_found(kind: NodeKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    /// Returns true if this error means the lookup target was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, JobSpecError::NotFound { .. })
    }
}

/// Extension for mutator results that restores the lenient "silently skip
/// when the target is missing" behaviour.
pub trait ResultExt<T> {
    /// Maps `NotFound` to `Ok(None)` while still propagating every other error.
    fn ignore_missing(self) -> Result<Option<T>, JobSpecError>;
}

impl<T> ResultExt<T> for Result<T, JobSpecError> {
    fn ignore_missing(self) -> Result<Option<T>, JobSpecError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(error = %e, "ignoring missing lookup target");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
