//! Artifact descriptors (`*.toml` files in the extension directory).
//!
//! A descriptor names the compiled-in entry point that provides the
//! extension:
//!
//! ```toml
//! PLUGIN_SIGNATURE = "IMAN_ACCOUNTING_PLUGIN_2024"
//! entry = "profit_sharing"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::signature::SIGNATURE_MARKER;

/// File extension of single-file artifacts.
pub const DESCRIPTOR_EXTENSION: &str = "toml";

/// File extension of archive artifacts.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Prefix of names reserved for the host.
pub const RESERVED_PREFIX: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    #[serde(rename = "PLUGIN_SIGNATURE", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Registration name of the entry point in the extension catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

impl ArtifactDescriptor {
    /// A signed descriptor pointing at `entry`.
    pub fn for_entry(entry: impl Into<String>) -> Self {
        Self {
            signature: Some(SIGNATURE_MARKER.to_string()),
            entry: Some(entry.into()),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Renders the descriptor with the marker on the first line.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// Kind of artifact accepted by import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Descriptor,
    Archive,
}

impl ArtifactKind {
    /// Classifies `path` by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            DESCRIPTOR_EXTENSION => Some(Self::Descriptor),
            ARCHIVE_EXTENSION => Some(Self::Archive),
            _ => None,
        }
    }
}

/// Returns true if `name` is a descriptor file name the loader should consider.
pub fn is_candidate_name(name: &str) -> bool {
    !name.starts_with(RESERVED_PREFIX)
        && ArtifactKind::from_path(Path::new(name)) == Some(ArtifactKind::Descriptor)
}
