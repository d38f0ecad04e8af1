//! Host configuration read from `iman.toml`.
//!
//! ```toml
//! [paths]
//! license_dir = "."
//! extension_dir = "plugins"
//!
//! [settings]
//! company_name = "Iman Trading"
//! ```
//!
//! A missing or broken file never prevents startup; defaults are used instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "iman.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Directory holding the license slot files.
    pub license_dir: PathBuf,
    /// Live extension directory.
    pub extension_dir: PathBuf,
    /// Values served to extensions through `Host::setting`.
    pub settings: BTreeMap<String, String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            license_dir: default_license_dir(),
            extension_dir: default_extension_dir(),
            settings: BTreeMap::new(),
        }
    }
}

fn default_license_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension_dir() -> PathBuf {
    PathBuf::from("plugins")
}

impl HostConfig {
    /// Loads configuration from `path`, falling back to defaults with a
    /// warning if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded host config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file {:?}: {}. Falling back to defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ConfigFile>(contents).map(ConfigFile::into_config)
    }

    /// Resolves relative directories against `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.license_dir.is_relative() {
            self.license_dir = base.join(&self.license_dir);
        }
        if self.extension_dir.is_relative() {
            self.extension_dir = base.join(&self.extension_dir);
        }
        self
    }
}

/// Raw TOML structure matching the iman.toml format.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    paths: PathsSection,
    #[serde(default)]
    settings: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct PathsSection {
    #[serde(default = "default_license_dir")]
    license_dir: PathBuf,
    #[serde(default = "default_extension_dir")]
    extension_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            license_dir: default_license_dir(),
            extension_dir: default_extension_dir(),
        }
    }
}

impl ConfigFile {
    fn into_config(self) -> HostConfig {
        HostConfig {
            license_dir: self.paths.license_dir,
            extension_dir: self.paths.extension_dir,
            settings: self.settings,
        }
    }
}
