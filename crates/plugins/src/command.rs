//! Data model for plugin metadata and command trees.
//!
//! Plugin metadata is stored as TOML in a `plugin.toml` file at the root of
//! each installed plugin directory:
//! ```text
//! name = "sample-plugin"
//! version = "1.0.1"
//!
//! [peer_dependencies]
//! trellis-cli = "^1.0"
//! trellis = "^1.0"
//!
//! [plugin]
//! name = "sample-plugin"
//! root_command_description = "sample plugin commands"
//!
//! [[plugin.definitions]]
//! name = "foo"
//! kind = "command"
//! description = "dummy foo command"
//! handler = "./handlers/foo"
//! ```
//!
//! Every field a plugin author controls is optional at parse time; missing
//! fields surface as recorded issues during validation rather than as
//! deserialization failures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Discriminates the two node shapes in a command tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// A container of child nodes. Must have a non-empty `children` list.
    Group,
    /// A leaf that executes. Must have a `handler` and a `description`.
    Command,
}

/// A node in a command tree, either authored by a plugin or part of the
/// host's resolved tree.
///
/// Fields are optional so a structurally broken definition can still be
/// parsed and walked; the validator reports each missing property with the
/// node's name and depth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub kind: Option<CommandKind>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<CommandNode>>,
}

impl CommandNode {
    /// A named group with children, for host trees built in code.
    pub fn group(name: &str, description: &str, children: Vec<CommandNode>) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: Some(CommandKind::Group),
            description: Some(description.to_string()),
            children: Some(children),
            ..Self::default()
        }
    }

    /// A leaf command with a handler reference.
    pub fn command(name: &str, description: &str, handler: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: Some(CommandKind::Command),
            description: Some(description.to_string()),
            handler: Some(handler.to_string()),
            ..Self::default()
        }
    }

    /// The node's name for diagnostics, `"unnamed"` when absent.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

/// A named, schema-described configuration shape registered by the host or
/// a plugin. The schema itself is carried opaquely; only the `type` key
/// participates in conflict rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileType {
    #[serde(rename = "type")]
    pub type_name: String,
    pub schema: toml::Value,
}

/// References to override implementations a plugin contributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideRefs {
    #[serde(default)]
    pub credential_manager: Option<String>,
}

/// The nested `[plugin]` configuration block of `plugin.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub root_command_description: Option<String>,
    #[serde(default)]
    pub health_check: Option<String>,
    #[serde(default)]
    pub definitions: Vec<CommandNode>,
    /// Extra definition files merged into `definitions`, relative to the
    /// plugin directory.
    #[serde(default)]
    pub definition_files: Vec<String>,
    /// `None` means the plugin registers no profiles. `Some(vec![])` is a
    /// validation error: the property exists but is empty.
    #[serde(default)]
    pub profiles: Option<Vec<ProfileType>>,
    #[serde(default)]
    pub overrides: Option<OverrideRefs>,
}

/// The full `plugin.toml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub plugin: Option<PluginConfig>,
}

/// One declared peer dependency of a plugin on a host-side package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDependency {
    pub package: String,
    /// The declared version range, or [`NO_PEER_DEPENDENCY`] when the
    /// package was not listed.
    pub range: String,
}

/// Sentinel range recorded when a peer dependency is not declared. The
/// omission is warned about at load time; the version comparison skips the
/// sentinel so the plugin is not warned twice.
pub const NO_PEER_DEPENDENCY: &str = "-1";

/// A plugin's normalized descriptor, produced by the loader and consumed by
/// the validation and composition pipeline. Immutable once produced.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Name under which the plugin is tracked in the installed registry.
    pub name: String,
    /// The `name` field of the plugin's own manifest, when present.
    pub package_name: Option<String>,
    pub config: PluginConfig,
    pub host_dependency: PeerDependency,
    pub framework_dependency: PeerDependency,
}

impl PluginDescriptor {
    /// The identity used for the plugin's top-level command group: the
    /// configured name when present, otherwise the package name. The
    /// silent package-name substitution is load-bearing for downstream
    /// consumers and is preserved as-is.
    #[must_use]
    pub fn effective_name(&self) -> Option<&str> {
        self.config
            .name
            .as_deref()
            .or(self.package_name.as_deref())
    }
}

/// Identity of the host CLI consuming plugins.
#[derive(Debug, Clone, Default)]
pub struct HostDescriptor {
    /// The host CLI's own package name.
    pub package_name: Option<String>,
    /// The binary name end users type.
    pub bin_name: Option<String>,
    /// The host CLI's version.
    pub version: Option<String>,
    /// The trellis framework version the host was built against.
    pub framework_version: String,
}

impl HostDescriptor {
    /// The command name of the host CLI, with the documented fallback when
    /// the host metadata does not carry one.
    #[must_use]
    pub fn cli_cmd_name(&self) -> &str {
        self.bin_name.as_deref().unwrap_or("YourBaseCliName")
    }

    /// The package name of the host CLI, with the documented fallback.
    #[must_use]
    pub fn cli_pkg_name(&self) -> &str {
        self.package_name.as_deref().unwrap_or("NoNameInCliPkgJson")
    }
}
