//! Plugin descriptor loading and reference resolution.
//!
//! The loader materializes an installed plugin's on-disk metadata into a
//! normalized [`PluginDescriptor`]. Anything wrong with the package surfaces
//! as a recorded issue for that plugin; the loader itself never fails the
//! pipeline.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{
    command::{
        CommandNode, HostDescriptor, NO_PEER_DEPENDENCY, PeerDependency, PluginDescriptor,
        PluginManifest,
    },
    error::{Error, Result},
    issues::{IssueSeverity, IssueTracker},
};

/// Package name of the trellis framework, as plugins list it under
/// `peer_dependencies`.
pub const FRAMEWORK_PKG_NAME: &str = "trellis";

/// File holding a plugin's metadata inside its install directory.
pub const PLUGIN_MANIFEST_FILE: &str = "plugin.toml";

/// Resolves a plugin-declared reference (handler, health check, override
/// implementation) to a concrete program path.
///
/// The filesystem implementation is the default; tests and embedders may
/// substitute their own resolution mechanism.
pub trait HandlerResolver {
    /// Form the runtime path for a reference: an absolute reference is used
    /// as-is, a relative one resolves against the plugin's install
    /// directory.
    fn runtime_path(&self, plugin_name: &str, reference: &str) -> PathBuf;

    /// Resolve a reference to an existing program, or report why not.
    fn resolve(&self, plugin_name: &str, reference: &str) -> Result<PathBuf>;
}

/// Resolver backed by the plugins root directory on disk.
pub struct FsHandlerResolver {
    plugins_root: PathBuf,
}

impl FsHandlerResolver {
    #[must_use]
    pub fn new(plugins_root: impl Into<PathBuf>) -> Self {
        Self {
            plugins_root: plugins_root.into(),
        }
    }
}

impl HandlerResolver for FsHandlerResolver {
    fn runtime_path(&self, plugin_name: &str, reference: &str) -> PathBuf {
        let reference = Path::new(reference);
        if reference.is_absolute() {
            reference.to_path_buf()
        } else {
            self.plugins_root.join(plugin_name).join(reference)
        }
    }

    fn resolve(&self, plugin_name: &str, reference: &str) -> Result<PathBuf> {
        let path = self.runtime_path(plugin_name, reference);
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::HandlerNotFound { path })
        }
    }
}

/// Loads installed plugins' metadata from the plugins root directory.
pub struct PluginLoader {
    plugins_root: PathBuf,
    host: HostDescriptor,
}

impl PluginLoader {
    #[must_use]
    pub fn new(plugins_root: impl Into<PathBuf>, host: HostDescriptor) -> Self {
        Self {
            plugins_root: plugins_root.into(),
            host,
        }
    }

    #[must_use]
    pub fn plugins_root(&self) -> &Path {
        &self.plugins_root
    }

    /// Load one plugin's `plugin.toml` into a descriptor.
    ///
    /// Returns `None` when the package cannot provide a usable
    /// configuration; the reason is recorded in the tracker. A package
    /// without a `[plugin]` block gets a warning only: it contributes no
    /// commands but stays registered.
    pub fn load(&self, issues: &mut IssueTracker, plugin_name: &str) -> Option<PluginDescriptor> {
        let plugin_dir = self.plugins_root.join(plugin_name);
        if !plugin_dir.exists() {
            issues.record(
                plugin_name,
                IssueSeverity::CfgError,
                format!(
                    "The path to the plugin does not exist: {}",
                    plugin_dir.display()
                ),
            );
            return None;
        }

        let manifest_path = plugin_dir.join(PLUGIN_MANIFEST_FILE);
        if !manifest_path.exists() {
            issues.record(
                plugin_name,
                IssueSeverity::CfgError,
                format!(
                    "Configuration file does not exist: '{}'",
                    manifest_path.display()
                ),
            );
            return None;
        }

        let raw = match std::fs::read_to_string(&manifest_path) {
            Ok(raw) => raw,
            Err(error) => {
                issues.record(
                    plugin_name,
                    IssueSeverity::CfgError,
                    format!(
                        "Cannot read '{}' Reason = {error}",
                        manifest_path.display()
                    ),
                );
                return None;
            },
        };

        let manifest: PluginManifest = match toml::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(error) => {
                issues.record(
                    plugin_name,
                    IssueSeverity::CfgError,
                    format!(
                        "Cannot parse '{}' Reason = {error}",
                        manifest_path.display()
                    ),
                );
                return None;
            },
        };

        let PluginManifest {
            name: package_name,
            peer_dependencies,
            plugin,
            ..
        } = manifest;

        let Some(config) = plugin else {
            issues.record(
                plugin_name,
                IssueSeverity::Warning,
                format!(
                    "The required property 'plugin' does not exist in the file \
                     '{}'. A plugin's host dependencies must be contained within a \
                     'peer_dependencies' property in that file.",
                    manifest_path.display()
                ),
            );
            warn!(plugin = plugin_name, "plugin has no configuration block, contributing nothing");
            return None;
        };

        let host_pkg = self.host.cli_pkg_name().to_string();
        let host_dependency = self.peer_dependency(
            issues,
            plugin_name,
            &manifest_path,
            &peer_dependencies,
            &host_pkg,
        );
        let framework_dependency = self.peer_dependency(
            issues,
            plugin_name,
            &manifest_path,
            &peer_dependencies,
            FRAMEWORK_PKG_NAME,
        );

        Some(PluginDescriptor {
            name: plugin_name.to_string(),
            package_name,
            config,
            host_dependency,
            framework_dependency,
        })
    }

    fn peer_dependency(
        &self,
        issues: &mut IssueTracker,
        plugin_name: &str,
        manifest_path: &Path,
        peer_dependencies: &BTreeMap<String, String>,
        package: &str,
    ) -> PeerDependency {
        match peer_dependencies.get(package) {
            Some(range) => PeerDependency {
                package: package.to_string(),
                range: range.clone(),
            },
            None => {
                issues.record(
                    plugin_name,
                    IssueSeverity::Warning,
                    format!(
                        "The property '{package}' does not exist within the \
                         'peer_dependencies' property in the file '{}'.",
                        manifest_path.display()
                    ),
                );
                PeerDependency {
                    package: package.to_string(),
                    range: NO_PEER_DEPENDENCY.to_string(),
                }
            },
        }
    }

    /// Build the plugin's top-level command group from its configuration:
    /// the inline `definitions` merged with any definitions loaded from
    /// `definition_files`, in declaration order.
    ///
    /// A file that cannot be read or parsed fails the combine step; the
    /// caller records the failure and skips the plugin.
    pub fn combine_command_defs(&self, descriptor: &PluginDescriptor) -> Result<CommandNode> {
        let config = &descriptor.config;
        let mut children = config.definitions.clone();

        for file in &config.definition_files {
            let path = self.plugins_root.join(&descriptor.name).join(file);
            let raw = std::fs::read_to_string(&path).map_err(|error| {
                Error::message(format!("cannot read '{}': {error}", path.display()))
            })?;
            let node: CommandNode = toml::from_str(&raw).map_err(|error| {
                Error::message(format!("cannot parse '{}': {error}", path.display()))
            })?;
            children.push(node);
        }

        Ok(CommandNode {
            name: descriptor.effective_name().map(ToString::to_string),
            aliases: config.aliases.clone(),
            kind: Some(crate::command::CommandKind::Group),
            summary: config.summary.clone(),
            description: config.root_command_description.clone(),
            handler: None,
            children: if children.is_empty() {
                None
            } else {
                Some(children)
            },
        })
    }
}
