//! Error types for the extension host.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtensionHostError {
    #[error("unsupported artifact format: {0} (expected .toml or .zip)")]
    UnsupportedArtifactFormat(String),

    #[error("extension signature missing: {0}")]
    SignatureMissing(String),

    #[error("no usable entry point in '{artifact}': {detail}")]
    MissingEntryPoint { artifact: String, detail: String },

    #[error("failed to load '{artifact}': {message}")]
    LoadFailure { artifact: String, message: String },

    #[error("extension '{extension_id}' failed in {hook}: {message}")]
    HookFailed {
        extension_id: String,
        hook: &'static str,
        message: String,
    },

    #[error("extension not found: {0}")]
    ExtensionNotFound(String),

    #[error("extension is disabled: {0}")]
    ExtensionDisabled(String),

    #[error("invalid artifact descriptor: {0}")]
    InvalidDescriptor(#[from] toml::de::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
