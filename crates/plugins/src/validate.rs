//! Structural and semantic validation of a single plugin.
//!
//! Checks run in sequence and keep going where feasible, so one pass
//! surfaces every independent problem. Each failure appends to the issue
//! tracker; nothing here raises for a malformed plugin.

use crate::{
    command::{
        CommandKind, CommandNode, HostDescriptor, NO_PEER_DEPENDENCY, PluginConfig,
        PluginDescriptor, ProfileType,
    },
    conflict::conflicting_name_or_alias,
    issues::{BLOCKING_SEVERITIES, IssueSeverity, IssueTracker},
    loader::HandlerResolver,
    version::compare_plugin_version_to_host,
};

/// Host-wide semantic rules applied after the structural checks.
///
/// An error returned here is caught and recorded as a configuration error;
/// it never propagates past the validator.
pub trait SemanticValidator {
    fn validate(&self, config: &PluginConfig) -> anyhow::Result<()>;
}

/// The host's default semantic rules: profile schemas must be tables and
/// top-level definition names must be unique within the plugin.
pub struct HostRulesValidator;

impl SemanticValidator for HostRulesValidator {
    fn validate(&self, config: &PluginConfig) -> anyhow::Result<()> {
        if let Some(profiles) = &config.profiles {
            for profile in profiles {
                if !profile.schema.is_table() {
                    anyhow::bail!(
                        "the schema of profile type '{}' is not a table",
                        profile.type_name
                    );
                }
            }
        }

        for (index, definition) in config.definitions.iter().enumerate() {
            let Some(name) = definition.name.as_deref() else {
                continue;
            };
            let duplicated = config.definitions[..index]
                .iter()
                .any(|other| other.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)));
            if duplicated {
                anyhow::bail!("the definition name '{name}' is declared more than once");
            }
        }

        Ok(())
    }
}

/// Validates one plugin against the host's current state.
pub struct ConfigValidator<'a> {
    pub issues: &'a mut IssueTracker,
    pub resolver: &'a dyn HandlerResolver,
    pub semantic: &'a dyn SemanticValidator,
    pub host: &'a HostDescriptor,
}

impl ConfigValidator<'_> {
    /// Run the full check sequence for a plugin. Returns `true` when no
    /// blocking issue was recorded, i.e. the plugin may be composed.
    pub fn validate(
        &mut self,
        descriptor: &PluginDescriptor,
        plugin_group: &CommandNode,
        resolved_tree: Option<&CommandNode>,
        existing_profiles: &[ProfileType],
    ) -> bool {
        let plugin_name = descriptor.name.as_str();
        let config = &descriptor.config;

        // Identity: a configured name or, silently, the package name.
        if descriptor.effective_name().is_none() {
            self.issues.record(
                plugin_name,
                IssueSeverity::CfgError,
                "The plugin's configuration does not contain a 'plugin.name' property, \
                 or a package 'name' property in plugin.toml.",
            );
        } else {
            // Name/alias collision against every existing top-level sibling.
            if let Some(children) = resolved_tree.and_then(|tree| tree.children.as_ref()) {
                for sibling in children {
                    if let Some(message) = conflicting_name_or_alias(plugin_group, sibling) {
                        self.issues
                            .record(plugin_name, IssueSeverity::CmdError, message);
                        break;
                    }
                }
            }

            self.validate_peer_versions(descriptor);
        }

        if config.root_command_description.is_none() {
            self.issues.record(
                plugin_name,
                IssueSeverity::CmdError,
                "The plugin's configuration does not contain a \
                 'plugin.root_command_description' property.",
            );
        }

        let has_overrides = config
            .overrides
            .as_ref()
            .is_some_and(|refs| refs.credential_manager.is_some());
        let has_children = plugin_group
            .children
            .as_ref()
            .is_some_and(|children| !children.is_empty());

        if has_children {
            self.validate_cmd_defs(plugin_name, std::slice::from_ref(plugin_group), 1);
        } else if !has_overrides {
            self.issues.record(
                plugin_name,
                IssueSeverity::CfgError,
                "The plugin defines no commands and overrides no framework components.",
            );
        }

        match &config.health_check {
            None => {
                self.issues.record(
                    plugin_name,
                    IssueSeverity::Warning,
                    "The plugin's configuration does not contain a \
                     'plugin.health_check' property.",
                );
            },
            Some(reference) => {
                if self.resolver.resolve(plugin_name, reference).is_err() {
                    let path = self.resolver.runtime_path(plugin_name, reference);
                    self.issues.record(
                        plugin_name,
                        IssueSeverity::CfgError,
                        format!(
                            "The program for the 'plugin.health_check' property does \
                             not exist: {}",
                            path.display()
                        ),
                    );
                }
            },
        }

        if let Some(profiles) = &config.profiles {
            validate_profiles(self.issues, plugin_name, profiles, existing_profiles);
        }

        if let Err(error) = self.semantic.validate(config) {
            self.issues.record(
                plugin_name,
                IssueSeverity::CfgError,
                format!("The plugin configuration is invalid.\nReason = {error}"),
            );
        }

        !self.issues.has_severity(plugin_name, BLOCKING_SEVERITIES)
    }

    /// Depth-first structural walk over command definitions. The plugin's
    /// root group sits at depth 1. Siblings are all checked; nothing
    /// short-circuits.
    pub fn validate_cmd_defs(&mut self, plugin_name: &str, defs: &[CommandNode], depth: usize) {
        for def in defs {
            if def.name.is_none() {
                self.issues.record(
                    plugin_name,
                    IssueSeverity::CmdError,
                    format!("Command definition at depth {depth} has no 'name' property."),
                );
            }
            let display = def.display_name();

            match def.kind {
                None => {
                    self.issues.record(
                        plugin_name,
                        IssueSeverity::CmdError,
                        format!(
                            "Name = '{display} (at depth = {depth})' has no 'kind' property."
                        ),
                    );
                },
                Some(CommandKind::Group) => match &def.children {
                    Some(children) if !children.is_empty() => {
                        self.validate_cmd_defs(plugin_name, children, depth + 1);
                    },
                    Some(_) => {
                        self.issues.record(
                            plugin_name,
                            IssueSeverity::CmdError,
                            format!(
                                "Group name = '{display} (at depth = {depth})' has a \
                                 'children' property with no children."
                            ),
                        );
                    },
                    None => {
                        self.issues.record(
                            plugin_name,
                            IssueSeverity::CmdError,
                            format!(
                                "Group name = '{display} (at depth = {depth})' has no \
                                 'children' property."
                            ),
                        );
                    },
                },
                Some(CommandKind::Command) => match &def.handler {
                    None => {
                        self.issues.record(
                            plugin_name,
                            IssueSeverity::CmdError,
                            format!(
                                "Command name = '{display} (at depth = {depth})' has no \
                                 'handler' property."
                            ),
                        );
                    },
                    Some(reference) => {
                        if self.resolver.resolve(plugin_name, reference).is_err() {
                            let path = self.resolver.runtime_path(plugin_name, reference);
                            self.issues.record(
                                plugin_name,
                                IssueSeverity::CmdError,
                                format!(
                                    "The handler for command = '{display} (at depth = \
                                     {depth})' does not exist: {}",
                                    path.display()
                                ),
                            );
                        }
                    },
                },
            }

            if def.description.is_none() {
                self.issues.record(
                    plugin_name,
                    IssueSeverity::CmdError,
                    format!(
                        "Name = '{display} (at depth = {depth})' has no 'description' \
                         property."
                    ),
                );
            }
        }
    }

    fn validate_peer_versions(&mut self, descriptor: &PluginDescriptor) {
        for dependency in [&descriptor.host_dependency, &descriptor.framework_dependency] {
            // An undeclared peer was already warned about at load time.
            if dependency.range == NO_PEER_DEPENDENCY {
                continue;
            }
            let host_version = if dependency.package == self.host.cli_pkg_name() {
                self.host.version.as_deref()
            } else {
                Some(self.host.framework_version.as_str())
            };
            if let Some(host_version) = host_version {
                compare_plugin_version_to_host(
                    self.issues,
                    &descriptor.name,
                    &dependency.range,
                    &dependency.package,
                    host_version,
                );
            }
        }
    }
}

/// Profile-type conflict rules for one plugin's candidate list.
///
/// Profile types are additive with union semantics; the only constraints
/// are a non-empty list, uniqueness within the candidates (exact,
/// case-sensitive), and no collision with the host's existing registry.
pub fn validate_profiles(
    issues: &mut IssueTracker,
    plugin_name: &str,
    profiles: &[ProfileType],
    existing: &[ProfileType],
) {
    if profiles.is_empty() {
        issues.record(
            plugin_name,
            IssueSeverity::CmdError,
            "The plugin's existing 'profiles' property is empty.",
        );
        return;
    }

    for (first, profile) in profiles.iter().enumerate() {
        for (second, other) in profiles.iter().enumerate().skip(first + 1) {
            if profile.type_name == other.type_name {
                issues.record(
                    plugin_name,
                    IssueSeverity::CmdError,
                    format!(
                        "The plugin's profiles at indexes = '{first}' and '{second}' \
                         have the same 'type' property = '{}'.",
                        profile.type_name
                    ),
                );
            }
        }
    }

    for profile in profiles {
        if existing
            .iter()
            .any(|known| known.type_name == profile.type_name)
        {
            issues.record(
                plugin_name,
                IssueSeverity::CmdError,
                format!(
                    "The plugin's profile type = '{}' already exists within existing \
                     profiles.",
                    profile.type_name
                ),
            );
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        command::{OverrideRefs, PeerDependency},
        error::{Error, Result},
    };

    /// Resolver that knows a fixed set of existing references.
    struct FakeResolver {
        existing: Vec<String>,
    }

    impl FakeResolver {
        fn all() -> Self {
            Self {
                existing: vec!["*".into()],
            }
        }

        fn none() -> Self {
            Self { existing: vec![] }
        }
    }

    impl HandlerResolver for FakeResolver {
        fn runtime_path(&self, plugin_name: &str, reference: &str) -> PathBuf {
            PathBuf::from("/plugins").join(plugin_name).join(reference)
        }

        fn resolve(&self, plugin_name: &str, reference: &str) -> Result<PathBuf> {
            if self.existing.iter().any(|e| e == "*" || e == reference) {
                Ok(self.runtime_path(plugin_name, reference))
            } else {
                Err(Error::HandlerNotFound {
                    path: self.runtime_path(plugin_name, reference),
                })
            }
        }
    }

    fn host() -> HostDescriptor {
        HostDescriptor {
            package_name: Some("trellis-cli".into()),
            bin_name: Some("trellis".into()),
            version: Some("1.0.0".into()),
            framework_version: "1.0.0".into(),
        }
    }

    fn base_config() -> PluginConfig {
        PluginConfig {
            name: Some("sample-plugin".into()),
            aliases: vec!["sp".into(), "samp".into()],
            summary: Some("This is my plugin summary!".into()),
            root_command_description: Some("trellis sample plugin".into()),
            health_check: Some("./checks/health".into()),
            definitions: vec![
                CommandNode::command("foo", "dummy foo command", "./handlers/foo"),
                CommandNode::command("bar", "dummy bar command", "./handlers/bar"),
            ],
            ..PluginConfig::default()
        }
    }

    fn descriptor_for(config: PluginConfig) -> PluginDescriptor {
        PluginDescriptor {
            name: "sample-plugin".into(),
            package_name: Some("sample-plugin".into()),
            config,
            host_dependency: PeerDependency {
                package: "trellis-cli".into(),
                range: "^1.0".into(),
            },
            framework_dependency: PeerDependency {
                package: "trellis".into(),
                range: "^1.0".into(),
            },
        }
    }

    fn group_for(config: &PluginConfig, name: Option<&str>) -> CommandNode {
        CommandNode {
            name: name.map(ToString::to_string),
            aliases: config.aliases.clone(),
            kind: Some(CommandKind::Group),
            summary: config.summary.clone(),
            description: config.root_command_description.clone(),
            handler: None,
            children: if config.definitions.is_empty() {
                None
            } else {
                Some(config.definitions.clone())
            },
        }
    }

    fn resolved_tree() -> CommandNode {
        CommandNode::group("root", "root of the resolved tree", vec![CommandNode::command(
            "cmdFromCli",
            "dummy command",
            "./handlers/cmd-from-cli",
        )])
    }

    fn run_validate(
        issues: &mut IssueTracker,
        resolver: &dyn HandlerResolver,
        descriptor: &PluginDescriptor,
        group: &CommandNode,
    ) -> bool {
        let host = host();
        let tree = resolved_tree();
        let mut validator = ConfigValidator {
            issues,
            resolver,
            semantic: &HostRulesValidator,
            host: &host,
        };
        validator.validate(descriptor, group, Some(&tree), &[])
    }

    #[test]
    fn valid_plugin_records_nothing() {
        let mut issues = IssueTracker::new();
        let descriptor = descriptor_for(base_config());
        let group = group_for(&descriptor.config, Some("sample-plugin"));

        assert!(run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        assert!(issues.issues_for("sample-plugin").is_empty());
    }

    #[test]
    fn missing_both_names_is_cfg_error() {
        let mut issues = IssueTracker::new();
        let mut descriptor = descriptor_for(base_config());
        descriptor.config.name = None;
        descriptor.package_name = None;
        let group = group_for(&descriptor.config, None);

        assert!(!run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        let issue = &issues.issues_for("sample-plugin")[0];
        assert_eq!(issue.severity, IssueSeverity::CfgError);
        assert!(issue.text.contains(
            "does not contain a 'plugin.name' property, or a package 'name' property"
        ));
    }

    #[test]
    fn package_name_substitutes_for_missing_config_name() {
        let mut issues = IssueTracker::new();
        let mut descriptor = descriptor_for(base_config());
        descriptor.config.name = None;
        descriptor.package_name = Some("WeHaveAPackageName".into());
        let group = group_for(&descriptor.config, descriptor.effective_name());

        assert!(run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        assert!(issues.issues_for("sample-plugin").is_empty());
    }

    #[test]
    fn top_level_name_conflict_is_cmd_error() {
        let mut issues = IssueTracker::new();
        let mut config = base_config();
        config.name = Some("cmdFromCli".into());
        let descriptor = descriptor_for(config);
        let group = group_for(&descriptor.config, Some("cmdFromCli"));

        assert!(!run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        let issue = &issues.issues_for("sample-plugin")[0];
        assert_eq!(issue.severity, IssueSeverity::CmdError);
        assert!(issue.text.contains("already contains a command group named 'cmdFromCli'"));
    }

    #[test]
    fn missing_root_description_is_cmd_error() {
        let mut issues = IssueTracker::new();
        let mut config = base_config();
        config.root_command_description = None;
        let descriptor = descriptor_for(config);
        let group = group_for(&descriptor.config, Some("sample-plugin"));

        assert!(!run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        let issue = &issues.issues_for("sample-plugin")[0];
        assert_eq!(issue.severity, IssueSeverity::CmdError);
        assert!(issue.text.contains(
            "does not contain a 'plugin.root_command_description' property"
        ));
    }

    #[test]
    fn no_commands_and_no_overrides_is_cfg_error() {
        for children in [None, Some(vec![])] {
            let mut issues = IssueTracker::new();
            let mut config = base_config();
            config.definitions = vec![];
            let descriptor = descriptor_for(config);
            let mut group = group_for(&descriptor.config, Some("sample-plugin"));
            group.children = children;

            assert!(!run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
            let issue = &issues.issues_for("sample-plugin")[0];
            assert_eq!(issue.severity, IssueSeverity::CfgError);
            assert!(issue.text.contains(
                "The plugin defines no commands and overrides no framework components"
            ));
        }
    }

    #[test]
    fn override_only_plugin_needs_no_commands() {
        let mut issues = IssueTracker::new();
        let mut config = base_config();
        config.definitions = vec![];
        config.overrides = Some(OverrideRefs {
            credential_manager: Some("./overrides/credmgr".into()),
        });
        let descriptor = descriptor_for(config);
        let group = group_for(&descriptor.config, Some("sample-plugin"));

        assert!(run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        assert!(issues.is_usable("sample-plugin"));
    }

    #[test]
    fn missing_health_check_is_warning_only() {
        let mut issues = IssueTracker::new();
        let mut config = base_config();
        config.health_check = None;
        let descriptor = descriptor_for(config);
        let group = group_for(&descriptor.config, Some("sample-plugin"));

        assert!(run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        let issue = &issues.issues_for("sample-plugin")[0];
        assert_eq!(issue.severity, IssueSeverity::Warning);
        assert!(issue.text.contains("does not contain a 'plugin.health_check' property"));
    }

    #[test]
    fn unresolvable_health_check_is_cfg_error() {
        let mut issues = IssueTracker::new();
        let mut config = base_config();
        config.health_check = Some("./This/File/Does/Not/Exist".into());
        config.definitions = vec![CommandNode::command("foo", "dummy foo command", "known")];
        let descriptor = descriptor_for(config);
        let group = group_for(&descriptor.config, Some("sample-plugin"));

        let resolver = FakeResolver {
            existing: vec!["known".into()],
        };
        assert!(!run_validate(&mut issues, &resolver, &descriptor, &group));
        let issue = issues
            .issues_for("sample-plugin")
            .iter()
            .find(|issue| issue.severity == IssueSeverity::CfgError)
            .unwrap();
        assert!(issue.text.contains(
            "The program for the 'plugin.health_check' property does not exist: \
             /plugins/sample-plugin/./This/File/Does/Not/Exist"
        ));
    }

    #[test]
    fn semantic_validator_failure_is_caught_as_cfg_error() {
        struct FailingValidator;
        impl SemanticValidator for FailingValidator {
            fn validate(&self, _config: &PluginConfig) -> anyhow::Result<()> {
                anyhow::bail!("Mock validation error")
            }
        }

        let mut issues = IssueTracker::new();
        let descriptor = descriptor_for(base_config());
        let group = group_for(&descriptor.config, Some("sample-plugin"));
        let host = host();
        let tree = resolved_tree();
        let resolver = FakeResolver::all();
        let mut validator = ConfigValidator {
            issues: &mut issues,
            resolver: &resolver,
            semantic: &FailingValidator,
            host: &host,
        };

        assert!(!validator.validate(&descriptor, &group, Some(&tree), &[]));
        let issue = &issues.issues_for("sample-plugin")[0];
        assert_eq!(issue.severity, IssueSeverity::CfgError);
        assert!(issue.text.contains(
            "The plugin configuration is invalid.\nReason = Mock validation error"
        ));
    }

    #[test]
    fn duplicate_definition_names_fail_host_rules() {
        let mut issues = IssueTracker::new();
        let mut config = base_config();
        config.definitions = vec![
            CommandNode::command("foo", "dummy foo command", "./handlers/foo"),
            CommandNode::command("FOO", "same name again", "./handlers/foo2"),
        ];
        let descriptor = descriptor_for(config);
        let group = group_for(&descriptor.config, Some("sample-plugin"));

        assert!(!run_validate(&mut issues, &FakeResolver::all(), &descriptor, &group));
        assert!(
            issues
                .issues_for("sample-plugin")
                .iter()
                .any(|issue| issue.text.contains("declared more than once"))
        );
    }

    // ── Recursive command-tree walk ─────────────────────────────────────

    fn walk(resolver: &dyn HandlerResolver, defs: &[CommandNode]) -> IssueTracker {
        let mut issues = IssueTracker::new();
        let host = host();
        let mut validator = ConfigValidator {
            issues: &mut issues,
            resolver,
            semantic: &HostRulesValidator,
            host: &host,
        };
        validator.validate_cmd_defs("sample-plugin", defs, 1);
        issues
    }

    fn base_group() -> CommandNode {
        let config = base_config();
        group_for(&config, Some("sample-plugin"))
    }

    #[test]
    fn valid_tree_walks_clean() {
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&base_group()));
        assert!(issues.issues_for("sample-plugin").is_empty());
    }

    #[test]
    fn group_without_children_property() {
        let mut group = base_group();
        group.children = None;
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        let issue = &issues.issues_for("sample-plugin")[0];
        assert_eq!(issue.severity, IssueSeverity::CmdError);
        assert!(issue.text.contains("has no 'children' property"));
    }

    #[test]
    fn group_with_empty_children_list() {
        let mut group = base_group();
        group.children = Some(vec![]);
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        assert!(
            issues.issues_for("sample-plugin")[0]
                .text
                .contains("has a 'children' property with no children")
        );
    }

    #[test]
    fn child_without_name_reports_depth() {
        let mut group = base_group();
        group.children.as_mut().unwrap()[0].name = None;
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        assert!(
            issues.issues_for("sample-plugin")[0]
                .text
                .contains("Command definition at depth 2 has no 'name' property")
        );
    }

    #[test]
    fn child_without_kind_reports_name_and_depth() {
        let mut group = base_group();
        group.children.as_mut().unwrap()[0].kind = None;
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        assert!(
            issues.issues_for("sample-plugin")[0]
                .text
                .contains("Name = 'foo (at depth = 2)' has no 'kind' property")
        );
    }

    #[test]
    fn command_without_handler() {
        let mut group = base_group();
        group.children.as_mut().unwrap()[0].handler = None;
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        assert!(
            issues.issues_for("sample-plugin")[0]
                .text
                .contains("Command name = 'foo (at depth = 2)' has no 'handler' property")
        );
    }

    #[test]
    fn command_with_unresolvable_handler_names_the_path() {
        let mut group = base_group();
        group.children.as_mut().unwrap()[0].handler = Some("./This/File/Does/Not/Exist".into());
        let issues = walk(&FakeResolver::none(), std::slice::from_ref(&group));
        let texts: Vec<&str> = issues
            .issues_for("sample-plugin")
            .iter()
            .map(|issue| issue.text.as_str())
            .collect();
        assert!(texts.iter().any(|text| text.contains(
            "The handler for command = 'foo (at depth = 2)' does not exist: \
             /plugins/sample-plugin/./This/File/Does/Not/Exist"
        )));
    }

    #[test]
    fn command_without_description() {
        let mut group = base_group();
        group.children.as_mut().unwrap()[1].description = None;
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        assert!(
            issues.issues_for("sample-plugin")[0]
                .text
                .contains("Name = 'bar (at depth = 2)' has no 'description' property")
        );
    }

    #[test]
    fn nested_groups_report_deeper_depths() {
        let inner = CommandNode::group("inner", "inner group", vec![CommandNode {
            name: Some("leaf".into()),
            kind: Some(CommandKind::Command),
            description: Some("leaf command".into()),
            handler: None,
            ..CommandNode::default()
        }]);
        let group = CommandNode::group("outer", "outer group", vec![inner]);
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        assert!(
            issues.issues_for("sample-plugin")[0]
                .text
                .contains("Command name = 'leaf (at depth = 3)' has no 'handler' property")
        );
    }

    #[test]
    fn all_siblings_are_checked() {
        let group = CommandNode::group("outer", "outer group", vec![
            CommandNode {
                kind: Some(CommandKind::Command),
                description: Some("first".into()),
                handler: None,
                name: Some("one".into()),
                ..CommandNode::default()
            },
            CommandNode {
                kind: Some(CommandKind::Command),
                description: Some("second".into()),
                handler: None,
                name: Some("two".into()),
                ..CommandNode::default()
            },
        ]);
        let issues = walk(&FakeResolver::all(), std::slice::from_ref(&group));
        let texts: Vec<&str> = issues
            .issues_for("sample-plugin")
            .iter()
            .map(|issue| issue.text.as_str())
            .collect();
        assert!(texts.iter().any(|t| t.contains("'one (at depth = 2)'")));
        assert!(texts.iter().any(|t| t.contains("'two (at depth = 2)'")));
    }

    // ── Profile validation ──────────────────────────────────────────────

    fn profile(type_name: &str) -> ProfileType {
        ProfileType {
            type_name: type_name.into(),
            schema: toml::Value::Table(toml::map::Map::new()),
        }
    }

    #[test]
    fn empty_profile_list_is_cmd_error() {
        let mut issues = IssueTracker::new();
        validate_profiles(&mut issues, "p", &[], &[]);
        let issue = &issues.issues_for("p")[0];
        assert_eq!(issue.severity, IssueSeverity::CmdError);
        assert!(issue.text.contains("The plugin's existing 'profiles' property is empty"));
    }

    #[test]
    fn duplicate_types_report_both_indexes() {
        let mut issues = IssueTracker::new();
        let profiles = [
            profile("sameTypeValue"),
            profile("differentTypeValue"),
            profile("sameTypeValue"),
        ];
        validate_profiles(&mut issues, "p", &profiles, &[]);
        let issue = &issues.issues_for("p")[0];
        assert_eq!(issue.severity, IssueSeverity::CmdError);
        assert!(issue.text.contains(
            "The plugin's profiles at indexes = '0' and '2' have the same 'type' \
             property = 'sameTypeValue'."
        ));
    }

    #[test]
    fn duplicate_detection_is_order_independent() {
        let mut issues = IssueTracker::new();
        let profiles = [
            profile("differentTypeValue"),
            profile("sameTypeValue"),
            profile("sameTypeValue"),
        ];
        validate_profiles(&mut issues, "p", &profiles, &[]);
        assert!(
            issues.issues_for("p")[0]
                .text
                .contains("indexes = '1' and '2'")
        );
    }

    #[test]
    fn type_collision_with_host_registry() {
        let mut issues = IssueTracker::new();
        validate_profiles(&mut issues, "p", &[profile("strawberry")], &[profile("strawberry")]);
        let issue = &issues.issues_for("p")[0];
        assert_eq!(issue.severity, IssueSeverity::CmdError);
        assert!(issue.text.contains(
            "The plugin's profile type = 'strawberry' already exists within existing \
             profiles."
        ));
    }

    #[test]
    fn profile_type_matching_is_case_sensitive() {
        let mut issues = IssueTracker::new();
        validate_profiles(&mut issues, "p", &[profile("Strawberry")], &[profile("strawberry")]);
        assert!(issues.issues_for("p").is_empty());
    }

    #[test]
    fn unique_profiles_pass() {
        let mut issues = IssueTracker::new();
        validate_profiles(&mut issues, "p", &[profile("uniqueTypeValue")], &[profile("other")]);
        assert!(issues.issues_for("p").is_empty());
    }
}
