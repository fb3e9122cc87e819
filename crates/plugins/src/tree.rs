//! Composition of validated plugin groups into the host's resolved tree.
//!
//! The resolved tree is the live root group the host hands to its command
//! dispatcher. It is mutated only through the operations here, by a single
//! writer, in registry order.

use tracing::debug;

use crate::{
    command::CommandNode,
    issues::{IssueSeverity, IssueTracker},
};

/// Append a plugin's top-level group as the last child of the resolved
/// tree. Returns `false` and records a command error when the tree or its
/// children list is absent (a host-initialization invariant violation) or
/// when a same-named child already exists (the validator should have
/// rejected the plugin first).
pub fn add_cmd_group(
    issues: &mut IssueTracker,
    tree: Option<&mut CommandNode>,
    plugin_name: &str,
    group: CommandNode,
) -> bool {
    let Some(tree) = tree else {
        issues.record(
            plugin_name,
            IssueSeverity::CmdError,
            "The resolved command tree was null. \
             The host should have created an empty command definition array.",
        );
        return false;
    };

    let Some(children) = tree.children.as_mut() else {
        issues.record(
            plugin_name,
            IssueSeverity::CmdError,
            "The resolved command tree children was null. \
             The host should have created an empty children array.",
        );
        return false;
    };

    if children.iter().any(|child| child.name == group.name) {
        issues.record(
            plugin_name,
            IssueSeverity::CmdError,
            format!(
                "The command group = '{}' already exists. \
                 Plugin management should have already rejected this plugin.",
                group.display_name()
            ),
        );
        return false;
    }

    debug!(plugin = plugin_name, group = group.display_name(), "composed command group");
    children.push(group);
    true
}

/// Remove the first child whose name matches the given group's name.
///
/// Used when a plugin must be unloaded or re-validated. Idempotent: a
/// missing tree, missing children list, or absent target is a safe no-op.
pub fn remove_cmd_group(tree: Option<&mut CommandNode>, group: &CommandNode) {
    let Some(children) = tree.and_then(|t| t.children.as_mut()) else {
        return;
    };
    if let Some(index) = children.iter().position(|child| child.name == group.name) {
        children.remove(index);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandNode;

    fn fruit_group(name: &str) -> CommandNode {
        CommandNode::group(name, "Pick fruit", vec![CommandNode::command(
            "pineapple",
            "Pick a pineapple",
            "./handlers/pick-pineapple",
        )])
    }

    fn root() -> CommandNode {
        CommandNode::group("root", "root of the resolved tree", vec![])
    }

    #[test]
    fn add_fails_when_tree_is_absent() {
        let mut issues = IssueTracker::new();
        let added = add_cmd_group(&mut issues, None, "p", fruit_group("fruit"));
        assert!(!added);
        let issue = &issues.issues_for("p")[0];
        assert_eq!(issue.severity, IssueSeverity::CmdError);
        assert!(issue.text.contains("The resolved command tree was null"));
    }

    #[test]
    fn add_fails_when_children_are_absent() {
        let mut issues = IssueTracker::new();
        let mut tree = CommandNode {
            name: Some("no children".into()),
            ..CommandNode::default()
        };
        let added = add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("fruit"));
        assert!(!added);
        assert!(
            issues.issues_for("p")[0]
                .text
                .contains("The resolved command tree children was null")
        );
    }

    #[test]
    fn add_fails_on_duplicate_group_name() {
        let mut issues = IssueTracker::new();
        let mut tree = root();
        assert!(add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("fruit")));

        let added = add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("fruit"));
        assert!(!added);
        let issue = &issues.issues_for("p")[0];
        assert!(issue.text.contains("The command group = 'fruit' already exists"));
        assert_eq!(tree.children.unwrap().len(), 1);
    }

    #[test]
    fn add_appends_as_last_child() {
        let mut issues = IssueTracker::new();
        let mut tree = root();
        assert!(add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("apple")));
        assert!(add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("banana")));

        let children = tree.children.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].name.as_deref(), Some("banana"));
        assert!(issues.issues_for("p").is_empty());
    }

    #[test]
    fn remove_is_a_noop_without_tree_or_children() {
        remove_cmd_group(None, &fruit_group("fruit"));

        let mut no_children = CommandNode {
            name: Some("no children".into()),
            ..CommandNode::default()
        };
        remove_cmd_group(Some(&mut no_children), &fruit_group("fruit"));

        let mut empty = root();
        remove_cmd_group(Some(&mut empty), &fruit_group("fruit"));
        assert!(empty.children.unwrap().is_empty());
    }

    #[test]
    fn remove_is_a_noop_when_group_is_not_present() {
        let mut tree = root();
        let mut issues = IssueTracker::new();
        add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("keeper"));

        remove_cmd_group(Some(&mut tree), &fruit_group("absent"));
        assert_eq!(tree.children.unwrap().len(), 1);
    }

    #[test]
    fn remove_then_re_add_restores_prior_child_count() {
        let mut issues = IssueTracker::new();
        let mut tree = root();
        add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("first"));
        add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("second"));

        remove_cmd_group(Some(&mut tree), &fruit_group("first"));
        assert_eq!(tree.children.as_ref().unwrap().len(), 1);
        assert_eq!(
            tree.children.as_ref().unwrap()[0].name.as_deref(),
            Some("second")
        );

        add_cmd_group(&mut issues, Some(&mut tree), "p", fruit_group("first"));
        assert_eq!(tree.children.unwrap().len(), 2);
    }
}
