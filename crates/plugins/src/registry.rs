//! Persistent registry of installed plugins.
//!
//! The registry is a JSON object mapping plugin name to its install record,
//! stored as `plugins.json` inside the plugins root. It is read once at
//! startup; a missing directory or file is created with an empty registry,
//! not treated as an error.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name of the registry inside the plugins root directory.
pub const REGISTRY_FILE: &str = "plugins.json";

/// Install record for one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    /// Package specifier the plugin was installed from.
    pub package: String,
    /// Registry source the package came from.
    pub registry: String,
    pub version: String,
}

/// The full installed-plugin mapping, iterated in name order.
pub type InstalledPlugins = BTreeMap<String, InstalledPlugin>;

/// Registry storage with atomic writes.
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The registry path inside a plugins root directory.
    #[must_use]
    pub fn in_plugins_root(plugins_root: &Path) -> Self {
        Self::new(plugins_root.join(REGISTRY_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, creating an empty one on disk when absent.
    pub fn load_or_create(&self) -> Result<InstalledPlugins> {
        if !self.path.exists() {
            let empty = InstalledPlugins::new();
            self.save(&empty)?;
            return Ok(empty);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let plugins: InstalledPlugins = serde_json::from_str(&raw)?;
        Ok(plugins)
    }

    /// Save the registry atomically via temp file + rename.
    pub fn save(&self, plugins: &InstalledPlugins) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(plugins)?;
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Default plugins root directory for the host, e.g.
/// `~/.local/share/trellis/plugins` on Linux.
#[must_use]
pub fn default_plugins_root() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "trellis")
        .map(|dirs| dirs.data_dir().join("plugins"))
}
