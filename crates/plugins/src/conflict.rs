//! Name and alias collision detection between command groups.
//!
//! Before a plugin's top-level group may join the resolved tree, it is
//! compared against every existing top-level sibling. Comparison is
//! case-insensitive and covers name-vs-name, name-vs-alias and
//! alias-vs-alias in both directions. The first match wins.

use crate::command::CommandNode;

/// Compare a candidate group against one existing tree node.
///
/// Returns a message naming the specific conflicting string and both
/// command groups, or `None` when the two nodes do not collide.
#[must_use]
pub fn conflicting_name_or_alias(
    candidate: &CommandNode,
    existing: &CommandNode,
) -> Option<String> {
    let existing_name = existing.display_name();

    // Candidate name against the existing node's name and aliases.
    if let Some(candidate_name) = candidate.name.as_deref() {
        if candidate_name.eq_ignore_ascii_case(existing_name) {
            return Some(format!(
                "The plug-in attempted to add a command group named '{candidate_name}'. \
                 Your base application already contains a command group named '{existing_name}'."
            ));
        }
        for alias in &existing.aliases {
            if candidate_name.eq_ignore_ascii_case(alias) {
                return Some(format!(
                    "The plug-in attempted to add a command group named '{candidate_name}'. \
                     Your base application already contains a command group with an alias \
                     '{alias}' on the group named '{existing_name}'."
                ));
            }
        }
    }

    // Candidate aliases against the existing node's name and aliases.
    for candidate_alias in &candidate.aliases {
        if candidate_alias.eq_ignore_ascii_case(existing_name) {
            return Some(format!(
                "The plug-in attempted to add a command group with an alias \
                 '{candidate_alias}'. Your base application already contains a command \
                 group named '{existing_name}'."
            ));
        }
        for alias in &existing.aliases {
            if candidate_alias.eq_ignore_ascii_case(alias) {
                return Some(format!(
                    "The plug-in attempted to add a command group with an alias \
                     '{candidate_alias}'. Your base application already contains a command \
                     group with an alias '{alias}' on the group named '{existing_name}'."
                ));
            }
        }
    }

    None
}
