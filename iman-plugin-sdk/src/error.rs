//! Error type returned by extension hooks.

use thiserror::Error;

/// Errors an extension reports to the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// The hook could not complete.
    #[error("{0}")]
    Failed(String),

    /// A host operation the extension depends on failed.
    #[error("host operation failed: {0}")]
    Host(String),

    /// Command arguments were missing or had the wrong shape.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl From<serde_json::Error> for ExtensionError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}
