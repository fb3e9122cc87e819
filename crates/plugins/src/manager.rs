//! Pipeline orchestration across the full set of installed plugins.
//!
//! The manager owns the pipeline's shared state: the resolved command tree,
//! the issue tracker, the profile-type registry and the override binding.
//! It drives load, validate, compose and override resolution sequentially
//! in registry order; one plugin's rejection never prevents the next from
//! being processed. Multiple managers can exist independently, so tests
//! never share mutable state.

use std::{collections::BTreeMap, path::PathBuf};

use tracing::{debug, info};

use crate::{
    command::{CommandNode, HostDescriptor, PluginDescriptor, ProfileType},
    error::{Error, Result},
    issues::{IssueSeverity, IssueTracker},
    loader::{FsHandlerResolver, PluginLoader},
    overrides::{
        CredentialStore, OverridePolicy, ProgramOverrideLoader, resolve_credential_manager,
    },
    registry::RegistryStore,
    tree,
    validate::{ConfigValidator, HostRulesValidator},
};

/// The host's command group for managing plugins, composed into the
/// resolved tree at startup like any other top-level group.
#[must_use]
pub fn plugins_command_group() -> CommandNode {
    CommandNode::group("plugins", "Install and manage plug-ins", vec![
        CommandNode::command("install", "Install a plug-in", "builtin::plugins::install"),
        CommandNode::command("list", "List installed plug-ins", "builtin::plugins::list"),
        CommandNode::command("uninstall", "Uninstall a plug-in", "builtin::plugins::uninstall"),
        CommandNode::command("update", "Update a plug-in", "builtin::plugins::update"),
        CommandNode::command("validate", "Validate a plug-in", "builtin::plugins::validate"),
    ])
}

pub struct PluginManager {
    plugins_root: PathBuf,
    host: HostDescriptor,
    policy: OverridePolicy,
    loader: PluginLoader,
    issues: IssueTracker,
    resolved_tree: Option<CommandNode>,
    profiles: Vec<ProfileType>,
    descriptors: BTreeMap<String, PluginDescriptor>,
    credential_store: Option<Box<dyn CredentialStore>>,
}

impl PluginManager {
    /// Create a manager around the host's initial resolved tree and
    /// profile-type registry.
    #[must_use]
    pub fn new(
        plugins_root: impl Into<PathBuf>,
        host: HostDescriptor,
        resolved_tree: CommandNode,
        host_profiles: Vec<ProfileType>,
        policy: OverridePolicy,
    ) -> Self {
        let plugins_root = plugins_root.into();
        let loader = PluginLoader::new(&plugins_root, host.clone());
        Self {
            plugins_root,
            host,
            policy,
            loader,
            issues: IssueTracker::new(),
            resolved_tree: Some(resolved_tree),
            profiles: host_profiles,
            descriptors: BTreeMap::new(),
            credential_store: None,
        }
    }

    /// Read the installed registry and materialize every plugin's
    /// descriptor, then resolve the override bindings.
    ///
    /// Per-plugin problems are recorded as issues. A malformed registry
    /// file is fatal: without it there is no valid plugin set to compose.
    pub fn load_all_plugin_configs(&mut self) -> Result<()> {
        let store = RegistryStore::in_plugins_root(&self.plugins_root);
        let installed = store.load_or_create()?;

        for name in installed.keys() {
            // Each pass starts from a clean issue list for the plugin.
            self.issues.clear(name);
            if let Some(descriptor) = self.loader.load(&mut self.issues, name) {
                self.descriptors.insert(name.clone(), descriptor);
            }
        }
        info!(
            installed = installed.len(),
            usable = self.descriptors.len(),
            "loaded plugin configurations"
        );

        // Override bindings are resolved once; the choice is immutable for
        // the lifetime of this manager.
        let resolver = FsHandlerResolver::new(&self.plugins_root);
        let override_loader = ProgramOverrideLoader {
            resolver: &resolver,
        };
        self.credential_store = Some(resolve_credential_manager(
            &mut self.issues,
            &self.policy,
            &self.descriptors,
            &override_loader,
        ));

        Ok(())
    }

    /// Compose every loaded plugin into the resolved tree, in registry
    /// order. First-registered wins a contested name; later registrants
    /// are rejected as conflicting.
    pub fn add_all_plugins_to_host_cli(&mut self) {
        let names: Vec<String> = self.descriptors.keys().cloned().collect();
        for name in names {
            self.add_plugin_to_host_cli(&name);
        }
    }

    /// Validate one plugin and, when accepted, merge its profile types and
    /// append its command group to the resolved tree.
    pub fn add_plugin_to_host_cli(&mut self, plugin_name: &str) {
        let Some(descriptor) = self.descriptors.get(plugin_name).cloned() else {
            return;
        };

        let group = match self.loader.combine_command_defs(&descriptor) {
            Ok(group) => group,
            Err(error) => {
                self.issues.record(
                    plugin_name,
                    IssueSeverity::CmdError,
                    format!("Failed to combine command definitions. Reason = {error}"),
                );
                return;
            },
        };

        if !self.validate_plugin(&descriptor, &group) {
            debug!(plugin = plugin_name, "rejected plugin was not composed");
            return;
        }

        if let Some(profiles) = &descriptor.config.profiles {
            if !profiles.is_empty() {
                if let Err(error) = self.add_profiles(profiles) {
                    self.issues.record(
                        plugin_name,
                        IssueSeverity::CmdError,
                        format!(
                            "Failed to add profiles for the plug-in '{plugin_name}'. \
                             Reason = {error}"
                        ),
                    );
                    return;
                }
            }
        }

        tree::add_cmd_group(
            &mut self.issues,
            self.resolved_tree.as_mut(),
            plugin_name,
            group,
        );
    }

    /// Run the validator for one plugin against the current host state.
    pub fn validate_plugin(&mut self, descriptor: &PluginDescriptor, group: &CommandNode) -> bool {
        let resolver = FsHandlerResolver::new(&self.plugins_root);
        let mut validator = ConfigValidator {
            issues: &mut self.issues,
            resolver: &resolver,
            semantic: &HostRulesValidator,
            host: &self.host,
        };
        validator.validate(descriptor, group, self.resolved_tree.as_ref(), &self.profiles)
    }

    /// Append profile types to the host registry. Union semantics; a
    /// duplicate type is an error (the validator rejects those earlier, so
    /// hitting one here flags a pipeline-ordering bug).
    pub fn add_profiles(&mut self, new_profiles: &[ProfileType]) -> Result<()> {
        for profile in new_profiles {
            if self
                .profiles
                .iter()
                .any(|known| known.type_name == profile.type_name)
            {
                return Err(Error::DuplicateProfileType {
                    type_name: profile.type_name.clone(),
                });
            }
        }
        self.profiles.extend(new_profiles.iter().cloned());
        Ok(())
    }

    /// Remove a previously composed plugin group, e.g. to unload a plugin.
    pub fn remove_plugin_from_host_cli(&mut self, group: &CommandNode) {
        tree::remove_cmd_group(self.resolved_tree.as_mut(), group);
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub fn issues(&self) -> &IssueTracker {
        &self.issues
    }

    #[must_use]
    pub fn resolved_tree(&self) -> Option<&CommandNode> {
        self.resolved_tree.as_ref()
    }

    #[must_use]
    pub fn profiles(&self) -> &[ProfileType] {
        &self.profiles
    }

    #[must_use]
    pub fn descriptors(&self) -> &BTreeMap<String, PluginDescriptor> {
        &self.descriptors
    }

    /// The resolved credential-manager binding. `None` until
    /// [`load_all_plugin_configs`](Self::load_all_plugin_configs) ran.
    #[must_use]
    pub fn credential_store(&self) -> Option<&dyn CredentialStore> {
        self.credential_store.as_deref()
    }

    #[must_use]
    pub fn host(&self) -> &HostDescriptor {
        &self.host
    }
}
