//! CLI commands for plugin management.
//!
//! Each subcommand drives the plugin pipeline in `trellis-plugins`; exit
//! codes are owned here, not by the core.

use std::path::{Path, PathBuf};

use {clap::Subcommand, serde::Deserialize, walkdir::WalkDir};

use trellis_plugins::{
    command::{HostDescriptor, PluginManifest},
    issues::Issue,
    loader::PLUGIN_MANIFEST_FILE,
    manager::PluginManager,
    overrides::OverridePolicy,
    registry::{InstalledPlugin, RegistryStore},
};

use crate::host_root_tree;

#[derive(Subcommand)]
pub enum PluginAction {
    /// Install a plug-in from a local directory.
    Install {
        /// Directory containing the plug-in's `plugin.toml`.
        source: PathBuf,
    },
    /// List installed plug-ins.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Uninstall a plug-in.
    Uninstall {
        /// Plug-in name as shown by `plugins list`.
        name: String,
    },
    /// Refresh a plug-in's registry record from its installed manifest.
    Update {
        /// Plug-in name as shown by `plugins list`.
        name: String,
    },
    /// Validate installed plug-ins and report issues.
    Validate {
        /// Restrict the report to one plug-in.
        name: Option<String>,
    },
}

/// Host settings consumed as override policy input. Stored as
/// `settings.json` next to the plugins directory.
#[derive(Debug, Default, Deserialize)]
struct HostSettings {
    #[serde(default)]
    overrides: OverrideSettings,
}

#[derive(Debug, Default, Deserialize)]
struct OverrideSettings {
    #[serde(default)]
    credential_manager: Option<String>,
}

fn load_override_policy(plugins_root: &Path) -> OverridePolicy {
    let settings_path = plugins_root.join("settings.json");
    let Ok(raw) = std::fs::read_to_string(&settings_path) else {
        return OverridePolicy::Default;
    };
    match serde_json::from_str::<HostSettings>(&raw) {
        Ok(settings) => settings
            .overrides
            .credential_manager
            .map_or(OverridePolicy::Default, OverridePolicy::Plugin),
        Err(error) => {
            tracing::warn!(path = %settings_path.display(), %error, "ignoring malformed settings");
            OverridePolicy::Default
        },
    }
}

/// Build a manager with every installed plugin's configuration loaded and
/// the override bindings resolved.
pub fn composed_manager(
    plugins_root: &Path,
    host: &HostDescriptor,
) -> anyhow::Result<PluginManager> {
    let policy = load_override_policy(plugins_root);
    let mut manager = PluginManager::new(
        plugins_root,
        host.clone(),
        host_root_tree(host),
        vec![],
        policy,
    );
    manager.load_all_plugin_configs()?;
    Ok(manager)
}

pub fn handle_plugins(
    plugins_root: &Path,
    host: &HostDescriptor,
    action: PluginAction,
) -> anyhow::Result<()> {
    match action {
        PluginAction::Install { source } => install(plugins_root, host, &source),
        PluginAction::List { json } => list(plugins_root, json),
        PluginAction::Uninstall { name } => uninstall(plugins_root, &name),
        PluginAction::Update { name } => update(plugins_root, &name),
        PluginAction::Validate { name } => validate(plugins_root, host, name.as_deref()),
    }
}

fn read_manifest(dir: &Path) -> anyhow::Result<PluginManifest> {
    let path = dir.join(PLUGIN_MANIFEST_FILE);
    if !path.is_file() {
        anyhow::bail!("'{}' does not contain a {PLUGIN_MANIFEST_FILE}", dir.display());
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&raw)?)
}

fn copy_dir(source: &Path, target: &Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source)?;
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dest)?;
        }
        // Symlinks are skipped; plugin packages are plain trees.
    }
    Ok(())
}

fn install(plugins_root: &Path, host: &HostDescriptor, source: &Path) -> anyhow::Result<()> {
    let manifest = read_manifest(source)?;
    let name = manifest
        .name
        .clone()
        .or_else(|| {
            source
                .file_name()
                .map(|base| base.to_string_lossy().into_owned())
        })
        .ok_or_else(|| anyhow::anyhow!("cannot determine a plugin name from '{}'", source.display()))?;

    let store = RegistryStore::in_plugins_root(plugins_root);
    let mut installed = store.load_or_create()?;
    if installed.contains_key(&name) {
        anyhow::bail!("plugin '{name}' is already installed. Uninstall it first.");
    }

    let target = plugins_root.join(&name);
    copy_dir(source, &target)?;
    installed.insert(name.clone(), InstalledPlugin {
        package: source.display().to_string(),
        registry: "local".to_string(),
        version: manifest.version.unwrap_or_else(|| "0.0.0".to_string()),
    });
    store.save(&installed)?;
    tracing::info!(plugin = name.as_str(), "installed plugin");
    println!("Installed plugin '{name}'.");

    report_issues_for(plugins_root, host, &name)
}

fn list(plugins_root: &Path, json: bool) -> anyhow::Result<()> {
    let store = RegistryStore::in_plugins_root(plugins_root);
    let installed = store.load_or_create()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&installed)?);
        return Ok(());
    }

    if installed.is_empty() {
        println!("No plugins installed.");
        println!("Install one with `trellis plugins install <dir>`.");
        return Ok(());
    }
    for (name, record) in &installed {
        println!(
            "  {name} {version} — {package} [{registry}]",
            version = record.version,
            package = record.package,
            registry = record.registry,
        );
    }
    Ok(())
}

fn uninstall(plugins_root: &Path, name: &str) -> anyhow::Result<()> {
    let store = RegistryStore::in_plugins_root(plugins_root);
    let mut installed = store.load_or_create()?;

    if installed.remove(name).is_none() {
        eprintln!("Plugin '{name}' is not installed.");
        std::process::exit(1);
    }
    store.save(&installed)?;

    let dir = plugins_root.join(name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    println!("Uninstalled plugin '{name}'.");
    Ok(())
}

fn update(plugins_root: &Path, name: &str) -> anyhow::Result<()> {
    let store = RegistryStore::in_plugins_root(plugins_root);
    let mut installed = store.load_or_create()?;

    let Some(record) = installed.get_mut(name) else {
        eprintln!("Plugin '{name}' is not installed.");
        std::process::exit(1);
    };

    let manifest = read_manifest(&plugins_root.join(name))?;
    if let Some(version) = manifest.version {
        record.version = version;
    }
    let version = record.version.clone();
    store.save(&installed)?;
    println!("Plugin '{name}' is at version {version}.");
    Ok(())
}

fn validate(plugins_root: &Path, host: &HostDescriptor, only: Option<&str>) -> anyhow::Result<()> {
    let mut manager = composed_manager(plugins_root, host)?;
    manager.add_all_plugins_to_host_cli();

    let mut names: Vec<String> = manager.descriptors().keys().cloned().collect();
    for name in manager.issues().plugins_with_issues() {
        if !names.iter().any(|known| known == name) {
            names.push(name.to_string());
        }
    }
    names.sort_unstable();

    if let Some(wanted) = only {
        if !names.iter().any(|name| name == wanted) {
            eprintln!("Plugin '{wanted}' is not installed.");
            std::process::exit(1);
        }
    }

    let mut failed = false;
    for name in &names {
        if only.is_some_and(|wanted| wanted != name) {
            continue;
        }
        let issues = manager.issues().issues_for(name);
        let usable = manager.issues().is_usable(name);
        failed = failed || !usable;

        let status = if usable { "✓" } else { "✗" };
        println!("{status} {name}");
        print_issues(issues);
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn report_issues_for(plugins_root: &Path, host: &HostDescriptor, name: &str) -> anyhow::Result<()> {
    let mut manager = composed_manager(plugins_root, host)?;
    manager.add_all_plugins_to_host_cli();

    let issues = manager.issues().issues_for(name);
    if issues.is_empty() {
        println!("Plugin '{name}' validates cleanly.");
    } else {
        println!("Plugin '{name}' reported:");
        print_issues(issues);
    }
    Ok(())
}

fn print_issues(issues: &[Issue]) {
    for issue in issues {
        println!("    [{severity}] {text}", severity = issue.severity, text = issue.text);
    }
}

/// Render the resolved tree for humans, two spaces per depth level.
pub fn print_tree(node: &trellis_plugins::command::CommandNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let name = node.display_name();
    match &node.description {
        Some(description) => println!("{indent}{name} — {description}"),
        None => println!("{indent}{name}"),
    }
    if let Some(children) = &node.children {
        for child in children {
            print_tree(child, depth + 1);
        }
    }
}
