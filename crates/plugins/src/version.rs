//! Semantic-version range compatibility.
//!
//! Two declared ranges are compatible when at least one concrete version
//! satisfies both. The check is advisory: range enforcement happens at
//! install time by an external collaborator, so incompatibilities and
//! unparseable ranges surface as warnings and never abort the pipeline.

use semver::{Comparator, Op, Version, VersionReq};

use crate::issues::{IssueSeverity, IssueTracker};

/// One end of an effective version interval.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: Version,
    inclusive: bool,
}

fn comparator_version(comparator: &Comparator) -> Version {
    Version::new(
        comparator.major,
        comparator.minor.unwrap_or(0),
        comparator.patch.unwrap_or(0),
    )
}

/// The exclusive upper neighbour for caret-style requirements.
fn caret_upper(comparator: &Comparator) -> Version {
    let major = comparator.major;
    let minor = comparator.minor.unwrap_or(0);
    let patch = comparator.patch.unwrap_or(0);
    if major > 0 || comparator.minor.is_none() {
        Version::new(major + 1, 0, 0)
    } else if minor > 0 || comparator.patch.is_none() {
        Version::new(0, minor + 1, 0)
    } else {
        Version::new(0, 0, patch + 1)
    }
}

/// The exclusive upper neighbour for tilde-style requirements.
fn tilde_upper(comparator: &Comparator) -> Version {
    match comparator.minor {
        Some(minor) => Version::new(comparator.major, minor + 1, 0),
        None => Version::new(comparator.major + 1, 0, 0),
    }
}

fn tighten_lower(lower: &mut Option<Bound>, candidate: Bound) {
    match lower {
        Some(bound) if candidate.version > bound.version => *bound = candidate,
        Some(bound) if candidate.version == bound.version && !candidate.inclusive => {
            bound.inclusive = false;
        },
        Some(_) => {},
        None => *lower = Some(candidate),
    }
}

fn tighten_upper(upper: &mut Option<Bound>, candidate: Bound) {
    match upper {
        Some(bound) if candidate.version < bound.version => *bound = candidate,
        Some(bound) if candidate.version == bound.version && !candidate.inclusive => {
            bound.inclusive = false;
        },
        Some(_) => {},
        None => *upper = Some(candidate),
    }
}

/// Reduce a requirement's comparator set to one effective interval.
///
/// `None` on either side means unbounded in that direction. Pre-release
/// qualifiers on comparators are ignored for interval purposes.
fn effective_bounds(req: &VersionReq) -> (Option<Bound>, Option<Bound>) {
    let mut lower: Option<Bound> = None;
    let mut upper: Option<Bound> = None;

    for comparator in &req.comparators {
        let version = comparator_version(comparator);
        match comparator.op {
            Op::Exact => {
                tighten_lower(&mut lower, Bound {
                    version: version.clone(),
                    inclusive: true,
                });
                tighten_upper(&mut upper, Bound {
                    version,
                    inclusive: true,
                });
            },
            Op::Greater | Op::GreaterEq => {
                tighten_lower(&mut lower, Bound {
                    version,
                    inclusive: comparator.op == Op::GreaterEq,
                });
            },
            Op::Less | Op::LessEq => {
                tighten_upper(&mut upper, Bound {
                    version,
                    inclusive: comparator.op == Op::LessEq,
                });
            },
            Op::Caret => {
                tighten_lower(&mut lower, Bound {
                    version,
                    inclusive: true,
                });
                tighten_upper(&mut upper, Bound {
                    version: caret_upper(comparator),
                    inclusive: false,
                });
            },
            Op::Tilde => {
                tighten_lower(&mut lower, Bound {
                    version,
                    inclusive: true,
                });
                tighten_upper(&mut upper, Bound {
                    version: tilde_upper(comparator),
                    inclusive: false,
                });
            },
            Op::Wildcard => {
                tighten_lower(&mut lower, Bound {
                    version,
                    inclusive: true,
                });
                if comparator.minor.is_some() {
                    tighten_upper(&mut upper, Bound {
                        version: tilde_upper(comparator),
                        inclusive: false,
                    });
                } else {
                    tighten_upper(&mut upper, Bound {
                        version: Version::new(comparator.major + 1, 0, 0),
                        inclusive: false,
                    });
                }
            },
            // Future comparator kinds are treated as unbounded.
            _ => {},
        }
    }

    (lower, upper)
}

fn intervals_disjoint(
    a: (Option<Bound>, Option<Bound>),
    b: (Option<Bound>, Option<Bound>),
) -> bool {
    let (lower_a, upper_a) = a;
    let (lower_b, upper_b) = b;

    // Interval A entirely below interval B.
    if let (Some(upper), Some(lower)) = (&upper_a, &lower_b) {
        if lower.version > upper.version {
            return true;
        }
        if lower.version == upper.version && !(lower.inclusive && upper.inclusive) {
            return true;
        }
    }

    // Interval B entirely below interval A.
    if let (Some(upper), Some(lower)) = (&upper_b, &lower_a) {
        if lower.version > upper.version {
            return true;
        }
        if lower.version == upper.version && !(lower.inclusive && upper.inclusive) {
            return true;
        }
    }

    false
}

/// Whether at least one concrete version satisfies both ranges.
///
/// Range-parsing failures propagate to the caller, which converts them to
/// a warning issue rather than failing the pipeline.
pub fn are_compatible(range_a: &str, range_b: &str) -> Result<bool, semver::Error> {
    let req_a = VersionReq::parse(range_a)?;
    let req_b = VersionReq::parse(range_b)?;
    Ok(!intervals_disjoint(
        effective_bounds(&req_a),
        effective_bounds(&req_b),
    ))
}

/// Compare a plugin's declared peer-dependency range against the host's
/// actual version value, recording a warning for incompatibility or for an
/// unparseable range. Never fatal.
pub fn compare_plugin_version_to_host(
    issues: &mut IssueTracker,
    plugin_name: &str,
    plugin_range: &str,
    host_property: &str,
    host_version: &str,
) {
    match are_compatible(plugin_range, host_version) {
        Ok(true) => {},
        Ok(false) => {
            issues.record(
                plugin_name,
                IssueSeverity::Warning,
                format!(
                    "The version value ({plugin_range}) of the plugin's peer dependency \
                     '{host_property}' is incompatible with the version value ({host_version}) \
                     of your base application. The plugin may not function correctly."
                ),
            );
        },
        Err(error) => {
            issues.record(
                plugin_name,
                IssueSeverity::Warning,
                format!(
                    "Failed to compare the version value ({plugin_range}) of the plugin's \
                     peer dependency '{host_property}' with the version value ({host_version}) \
                     of your base application. Reason = {error}"
                ),
            );
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_caret_ranges_are_compatible() {
        assert!(are_compatible("^1.0.0", "^1.2.0").unwrap());
        assert!(are_compatible("^1.2.0", "^1.0.0").unwrap());
    }

    #[test]
    fn disjoint_major_ranges_are_incompatible() {
        assert!(!are_compatible("^1.0.0", "^2.0.0").unwrap());
        assert!(!are_compatible("^2.0.0", "^1.0.0").unwrap());
    }

    #[test]
    fn open_comparators_intersect_caret() {
        assert!(are_compatible(">=1.5.0", "^1.0.0").unwrap());
        assert!(!are_compatible(">=2.0.0", "^1.0.0").unwrap());
        // 2.0.0 satisfies >1.0.0 but ^1.0.0 excludes it.
        assert!(are_compatible(">1.0.0", "^1.0.0").unwrap());
    }

    #[test]
    fn boundary_exclusivity_is_respected() {
        // <2.0.0 and >=2.0.0 share no version.
        assert!(!are_compatible("<2.0.0", ">=2.0.0").unwrap());
        // <=2.0.0 and >=2.0.0 share exactly 2.0.0.
        assert!(are_compatible("<=2.0.0", ">=2.0.0").unwrap());
    }

    #[test]
    fn exact_version_inside_and_outside_range() {
        assert!(are_compatible("=1.4.2", "^1.0.0").unwrap());
        assert!(!are_compatible("=1.4.2", "^2.0.0").unwrap());
    }

    #[test]
    fn tilde_ranges() {
        assert!(are_compatible("~1.2.0", ">=1.2.3").unwrap());
        assert!(!are_compatible("~1.2.0", ">=1.3.0").unwrap());
    }

    #[test]
    fn zero_major_caret_is_narrow() {
        assert!(!are_compatible("^0.1.0", "^0.2.0").unwrap());
        assert!(are_compatible("^0.1.0", ">=0.1.5, <0.2.0").unwrap());
    }

    #[test]
    fn wildcard_matches_everything() {
        assert!(are_compatible("*", "^3.1.0").unwrap());
        assert!(are_compatible("1.*", "^1.4.0").unwrap());
        assert!(!are_compatible("1.*", "^2.0.0").unwrap());
    }

    #[test]
    fn malformed_range_is_an_error_not_a_panic() {
        assert!(are_compatible("-1", "^1.0.0").is_err());
        assert!(are_compatible("^1.0.0", "not a range").is_err());
    }

    #[test]
    fn compatible_versions_record_no_issue() {
        let mut issues = IssueTracker::new();
        compare_plugin_version_to_host(&mut issues, "p", "^1.0.0", "trellis-cli", "1.2.0");
        assert!(issues.issues_for("p").is_empty());
    }

    #[test]
    fn incompatible_versions_record_warning() {
        let mut issues = IssueTracker::new();
        compare_plugin_version_to_host(&mut issues, "p", "^1.0.0", "trellis-cli", "2.0.0");

        let issue = &issues.issues_for("p")[0];
        assert_eq!(issue.severity, IssueSeverity::Warning);
        assert!(issue.text.contains("The version value"));
        assert!(issue.text.contains("is incompatible with the version value"));
    }

    #[test]
    fn parse_failure_records_warning_instead_of_propagating() {
        let mut issues = IssueTracker::new();
        compare_plugin_version_to_host(&mut issues, "p", "-1", "trellis-cli", "1.0.0");

        let issue = &issues.issues_for("p")[0];
        assert_eq!(issue.severity, IssueSeverity::Warning);
        assert!(issue.text.contains("Failed to compare the version value"));
    }
}
