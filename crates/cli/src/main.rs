mod plugin_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use trellis_plugins::{
    command::{CommandNode, HostDescriptor},
    manager::plugins_command_group,
    registry,
};

#[derive(Parser)]
#[command(name = "trellis", about = "Trellis — plugin-extensible host CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Custom plugins directory (overrides the default data dir).
    #[arg(long, global = true, env = "TRELLIS_PLUGINS_DIR")]
    plugins_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install and manage plug-ins.
    Plugins {
        #[command(subcommand)]
        action: plugin_commands::PluginAction,
    },
    /// Print the resolved command tree after plugin composition.
    Tree {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Identity of this host CLI, handed to the plugin pipeline.
fn host_descriptor() -> HostDescriptor {
    HostDescriptor {
        package_name: Some(env!("CARGO_PKG_NAME").to_string()),
        bin_name: Some("trellis".to_string()),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        framework_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// The host's own top-level tree before any plugin is composed.
fn host_root_tree(host: &HostDescriptor) -> CommandNode {
    CommandNode::group(host.cli_cmd_name(), "Root command of the host CLI", vec![
        plugins_command_group(),
    ])
}

fn plugins_root(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &cli.plugins_dir {
        return Ok(dir.clone());
    }
    registry::default_plugins_root()
        .ok_or_else(|| anyhow::anyhow!("cannot determine the plugins data directory"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let plugins_root = plugins_root(&cli)?;
    let host = host_descriptor();

    match cli.command {
        Commands::Plugins { action } => {
            plugin_commands::handle_plugins(&plugins_root, &host, action)
        },
        Commands::Tree { json } => {
            let mut manager = plugin_commands::composed_manager(&plugins_root, &host)?;
            manager.add_all_plugins_to_host_cli();
            let Some(tree) = manager.resolved_tree() else {
                anyhow::bail!("the resolved command tree is not initialized");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(tree)?);
            } else {
                plugin_commands::print_tree(tree, 0);
            }
            Ok(())
        },
    }
}
