//! Per-plugin accumulation of validation findings.
//!
//! Every component in the pipeline writes findings here instead of raising;
//! the tracker is the single source of truth for whether a plugin is usable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Severity of a recorded issue, in increasing blocking strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Advisory. The plugin remains usable.
    Warning,
    /// Malformed plugin configuration. The plugin is rejected.
    CfgError,
    /// Malformed or conflicting command definitions. The plugin is rejected.
    CmdError,
    /// Override resolution failure. Only the affected override falls back.
    OverError,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::CfgError => write!(f, "configuration error"),
            Self::CmdError => write!(f, "command error"),
            Self::OverError => write!(f, "override error"),
        }
    }
}

/// Severities that cause a plugin to be rejected from the resolved tree.
pub const BLOCKING_SEVERITIES: &[IssueSeverity] = &[
    IssueSeverity::CfgError,
    IssueSeverity::CmdError,
    IssueSeverity::OverError,
];

/// A single validation finding attributed to a plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub text: String,
}

/// Records issues keyed by plugin name, preserving insertion order per
/// plugin. Entries are never mutated after creation; a new validation pass
/// for a plugin starts by clearing its list.
#[derive(Debug, Clone, Default)]
pub struct IssueTracker {
    issues: HashMap<String, Vec<Issue>>,
}

impl IssueTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding against a plugin.
    pub fn record(
        &mut self,
        plugin_name: &str,
        severity: IssueSeverity,
        text: impl Into<String>,
    ) {
        self.issues
            .entry(plugin_name.to_string())
            .or_default()
            .push(Issue {
                severity,
                text: text.into(),
            });
    }

    /// All issues recorded for a plugin, in insertion order.
    #[must_use]
    pub fn issues_for(&self, plugin_name: &str) -> &[Issue] {
        self.issues.get(plugin_name).map_or(&[], Vec::as_slice)
    }

    /// Whether the plugin has at least one issue with any of the given
    /// severities.
    #[must_use]
    pub fn has_severity(&self, plugin_name: &str, severities: &[IssueSeverity]) -> bool {
        self.issues_for(plugin_name)
            .iter()
            .any(|issue| severities.contains(&issue.severity))
    }

    /// Whether the plugin is free of blocking issues.
    #[must_use]
    pub fn is_usable(&self, plugin_name: &str) -> bool {
        !self.has_severity(plugin_name, BLOCKING_SEVERITIES)
    }

    /// Drop all issues for a plugin, e.g. at the start of a fresh
    /// validation pass.
    pub fn clear(&mut self, plugin_name: &str) {
        self.issues.remove(plugin_name);
    }

    /// Names of all plugins with at least one recorded issue.
    #[must_use]
    pub fn plugins_with_issues(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .issues
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}
