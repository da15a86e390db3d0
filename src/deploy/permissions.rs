// src/deploy/permissions.rs

//! Permissions phase
//!
//! Resolves the permission rule for every added or modified path and
//! applies it to the target. Deleted paths have nothing left to set.

use crate::change::ChangeKind;
use crate::error::Result;
use crate::order::OrderedChanges;
use crate::permission::{PermissionRules, Resolution};
use crate::progress::{Phase, ProgressTracker};
use crate::source::SourceTree;
use crate::target::{Permission, Target, TargetError};
use tracing::{debug, error, info, warn};

/// What happened to one path's permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    Applied(Permission),
    /// No rule matched the path
    Unmatched,
    /// The matching rule's spec is not valid for the target
    Invalid { spec: String },
    /// Deleted, or missing from the target
    NotApplicable,
}

/// Result of the permissions phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionReport {
    pub outcomes: Vec<(String, PermissionOutcome)>,
}

impl PermissionReport {
    pub fn applied(&self) -> usize {
        self.count(|outcome| matches!(outcome, PermissionOutcome::Applied(_)))
    }

    pub fn invalid(&self) -> usize {
        self.count(|outcome| matches!(outcome, PermissionOutcome::Invalid { .. }))
    }

    pub fn outcome(&self, path: &str) -> Option<&PermissionOutcome> {
        self.outcomes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&PermissionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub(super) fn apply_permissions(
    target: &dyn Target,
    source: &SourceTree,
    rules: &PermissionRules,
    changes: &OrderedChanges,
    progress: &dyn ProgressTracker,
) -> Result<PermissionReport> {
    let mut report = PermissionReport::default();
    let model = target.visibility_model();
    progress.start(Phase::Permissions, changes.len() as u64);

    for (index, change) in changes.iter().enumerate() {
        let path = change.path();

        let outcome = if change.kind() == ChangeKind::Deleted {
            PermissionOutcome::NotApplicable
        } else {
            let is_dir = source.is_dir(path)?;
            match rules.resolve(path, is_dir, model) {
                Resolution::Unmatched => PermissionOutcome::Unmatched,
                Resolution::Invalid { pattern, spec } => {
                    error!(
                        "Invalid permission '{}' for {} (rule '{}')",
                        spec, path, pattern
                    );
                    PermissionOutcome::Invalid { spec }
                }
                Resolution::Resolved { pattern, permission } => {
                    debug!("Setting {} on {} (rule '{}')", permission, path, pattern);
                    match target.apply_permission(path, permission) {
                        Ok(()) => PermissionOutcome::Applied(permission),
                        Err(TargetError::NotFound(_)) => {
                            warn!("Cannot set permissions on {}: not on the target", path);
                            PermissionOutcome::NotApplicable
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        };
        report.outcomes.push((path.to_string(), outcome));

        progress.set_position(index as u64 + 1);
    }

    progress.finish();
    info!(
        "Set permissions on {} path(s), {} invalid rule(s)",
        report.applied(),
        report.invalid()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::RawChange;
    use crate::changeset::ChangeSetBuilder;
    use crate::progress::SilentProgress;
    use crate::target::{DryRunTarget, MemoryTarget, Visibility};
    use std::fs;
    use tempfile::TempDir;

    fn ordered(raw: &[(&str, &str)]) -> OrderedChanges {
        let builder = ChangeSetBuilder::new::<&str>(&[]).unwrap();
        let (set, _) = builder.build(raw.iter().map(|(k, p)| RawChange::new(*k, *p)));
        OrderedChanges::from_working_set(set)
    }

    fn working_tree() -> (TempDir, SourceTree) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("logs/2024")).unwrap();
        fs::write(dir.path().join("logs/app.log"), "").unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();
        fs::write(dir.path().join("index.php"), "").unwrap();
        let source = SourceTree::new(dir.path());
        (dir, source)
    }

    fn rules() -> PermissionRules {
        PermissionRules::from_pairs([("*.txt", "0644"), ("logs/*", "0700-0600")]).unwrap()
    }

    fn changes() -> OrderedChanges {
        ordered(&[
            ("A", "logs/2024"),
            ("A", "logs/app.log"),
            ("M", "readme.txt"),
            ("M", "index.php"),
            ("D", "old.txt"),
        ])
    }

    fn live_target() -> MemoryTarget {
        MemoryTarget::with_modes(0o755, 0o700)
            .with_dir("logs/2024")
            .with_file("logs/app.log", "")
            .with_file("readme.txt", "")
            .with_file("index.php", "")
    }

    #[test]
    fn test_apply_numeric_modes() {
        let (_dir, source) = working_tree();
        let target = live_target();

        let report =
            apply_permissions(&target, &source, &rules(), &changes(), &SilentProgress::new())
                .unwrap();

        assert_eq!(target.mode("logs/2024"), Some(0o700));
        assert_eq!(target.mode("logs/app.log"), Some(0o600));
        assert_eq!(target.mode("readme.txt"), Some(0o644));
        assert_eq!(target.mode("index.php"), None);
        assert_eq!(target.public_mode(), Some(0o755));

        assert_eq!(report.applied(), 3);
        assert_eq!(report.outcome("index.php"), Some(&PermissionOutcome::Unmatched));
        assert_eq!(
            report.outcome("old.txt"),
            Some(&PermissionOutcome::NotApplicable)
        );
    }

    #[test]
    fn test_octal_rules_invalid_on_binary_target() {
        let (_dir, source) = working_tree();
        let target = MemoryTarget::new().with_file("readme.txt", "");
        let rules = PermissionRules::from_pairs([("*.txt", "0644"), ("*.php", "private")])
            .unwrap();

        let report = apply_permissions(
            &target,
            &source,
            &rules,
            &ordered(&[("M", "readme.txt"), ("A", "index.php")]),
            &SilentProgress::new(),
        )
        .unwrap();

        assert_eq!(
            report.outcome("readme.txt"),
            Some(&PermissionOutcome::Invalid {
                spec: "0644".to_string()
            })
        );
        // index.php never made it to the target
        assert_eq!(
            report.outcome("index.php"),
            Some(&PermissionOutcome::NotApplicable)
        );
        assert_eq!(target.visibility("readme.txt").unwrap(), Visibility::Public);
    }

    #[test]
    fn test_plan_mode_resolves_without_changes() {
        let (_dir, source) = working_tree();
        let target = DryRunTarget::new(live_target());

        let report =
            apply_permissions(&target, &source, &rules(), &changes(), &SilentProgress::new())
                .unwrap();

        assert_eq!(report.applied(), 3);
        assert_eq!(target.inner().mode("logs/app.log"), None);
    }
}
