//! Plugin management for the trellis host CLI.
//!
//! Installed plugins contribute command groups and profile types to the
//! host. This crate validates each plugin's metadata and command tree,
//! detects name/alias and profile-type collisions, checks declared version
//! ranges against the host, composes accepted plugins into the resolved
//! command tree, and resolves pluggable override slots (the credential
//! manager) to exactly one implementation per process.
//!
//! Findings are accumulated per plugin in an [`issues::IssueTracker`]
//! instead of raised: a malformed plugin is skipped and reportable, never a
//! crash of the host.

pub mod command;
pub mod conflict;
pub mod error;
pub mod issues;
pub mod loader;
pub mod manager;
pub mod overrides;
pub mod registry;
pub mod tree;
pub mod validate;
pub mod version;

pub use {
    command::{
        CommandKind, CommandNode, HostDescriptor, PluginConfig, PluginDescriptor, ProfileType,
    },
    error::{Error, Result},
    issues::{Issue, IssueSeverity, IssueTracker},
    manager::PluginManager,
    overrides::{CredentialStore, OverridePolicy},
};
