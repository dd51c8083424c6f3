//! Application-wide error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid state transition: cannot transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("task queue is full")]
    QueueFull,

    /// The requested content cannot be produced with the current
    /// configuration or credentials. Retrying does not help.
    #[error("{0}")]
    Unavailable(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("canceled")]
    Canceled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {op} '{}': {source}", .path.display())]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn conflict(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::Tool(_)
                | Error::Io(_)
                | Error::IoPath { .. }
                | Error::Manifest(_)
                | Error::Other(_)
        )
    }
}

impl From<manifest::ManifestError> for Error {
    fn from(err: manifest::ManifestError) -> Self {
        match err {
            manifest::ManifestError::NoAcceptableVariant { .. }
            | manifest::ManifestError::NoAcceptableVideo { .. }
            | manifest::ManifestError::NoAudioRendition => {
                Error::Unavailable(err.to_string())
            }
            other => Error::Manifest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifest::{ManifestError, QualityTier};

    #[test]
    fn test_retryable_classification() {
        assert!(Error::tool("exit 1").is_retryable());
        assert!(Error::Manifest("bad".into()).is_retryable());
        assert!(!Error::Canceled.is_retryable());
        assert!(!Error::unavailable("no token").is_retryable());
        assert!(!Error::validation("bad url").is_retryable());
    }

    #[test]
    fn test_manifest_error_mapping() {
        let err: Error = ManifestError::NoAcceptableVariant {
            tier: QualityTier::Atmos,
        }
        .into();
        assert!(matches!(err, Error::Unavailable(_)));

        let err: Error = ManifestError::NotMaster.into();
        assert!(matches!(err, Error::Manifest(_)));
    }
}
