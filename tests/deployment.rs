// tests/deployment.rs

//! Integration tests for complete deployments against an in-memory target.
//!
//! These drive `Deployment` through every phase and check the target tree
//! afterwards:
//! - the three-change scenario (add, modify, delete) with backups
//! - plan mode leaving the target untouched
//! - revert restoring the previous tree byte-for-byte
//! - permission rules on a numeric target

mod common;

use common::{ordered, working_tree};
use stagehand::deploy::{CommitOutcome, SkipReason};
use stagehand::{
    CallbackProgress, DeployMode, DeployOptions, DeployState, Deployment, MemoryTarget, Phase,
    PermissionRules, ProgressEvent, Revision, Target,
};
use std::sync::{Arc, Mutex};

/// Every path on the target with its file content (`None` for directories)
fn snapshot(target: &MemoryTarget) -> Vec<(String, Option<Vec<u8>>)> {
    target
        .paths()
        .into_iter()
        .map(|path| {
            let content = target.file_contents(&path);
            (path, content)
        })
        .collect()
}

fn apply() -> DeployOptions {
    DeployOptions::new(DeployMode::Apply)
}

#[test]
fn test_add_modify_delete_scenario() {
    let target = Arc::new(
        MemoryTarget::new()
            .with_file("a/old", "old")
            .with_file("a/c.txt", "c v1"),
    );
    let (_dir, source) = working_tree(&[("a/b.txt", "b"), ("a/c.txt", "c v2")]);
    let changes = ordered(&[("A", "a/b.txt"), ("D", "a/old"), ("M", "a/c.txt")]);
    let revision = Revision::parse("r42").unwrap();

    let mut deployment = Deployment::new(target.clone(), source, apply());
    deployment.prepare().unwrap();

    let stage = deployment.stage(&changes).unwrap();
    assert_eq!(stage.conflicts, 0);
    assert_eq!(
        target.file_contents(".stagehand.tmp/push/a/b.txt").unwrap(),
        b"b"
    );
    assert_eq!(
        target.file_contents(".stagehand.tmp/push/a/c.txt").unwrap(),
        b"c v2"
    );
    // Nothing live has changed yet
    assert!(!target.has("a/b.txt").unwrap());
    assert_eq!(target.file_contents("a/c.txt").unwrap(), b"c v1");

    let commit = deployment.commit(&changes).unwrap();
    assert_eq!(commit.applied(), 3);
    assert_eq!(target.file_contents("a/b.txt").unwrap(), b"b");
    assert!(!target.has("a/old").unwrap());
    assert_eq!(
        target.file_contents(".stagehand.tmp/revert/a/old").unwrap(),
        b"old"
    );
    assert_eq!(target.file_contents("a/c.txt").unwrap(), b"c v2");
    assert_eq!(
        target.file_contents(".stagehand.tmp/revert/a/c.txt").unwrap(),
        b"c v1"
    );

    let applied = deployment.applied();
    assert_eq!(applied.len(), 3);
    for path in ["a/b.txt", "a/old", "a/c.txt"] {
        assert!(applied.contains(path), "{} missing from applied record", path);
    }

    deployment.write_revision(&revision).unwrap();
    assert!(deployment.finish().unwrap());

    assert_eq!(target.read(".stagehand.rev").unwrap(), "r42");
    assert_eq!(
        target.paths(),
        vec![".stagehand.rev", "a", "a/b.txt", "a/c.txt"]
    );
}

#[test]
fn test_added_entry_already_on_target_is_skipped() {
    let target = Arc::new(MemoryTarget::new().with_file("a/b.txt", "old b"));
    let (_dir, source) = working_tree(&[("a/b.txt", "new b"), ("a/d.txt", "d")]);
    let changes = ordered(&[("A", "a/b.txt"), ("A", "a/d.txt")]);

    let mut deployment = Deployment::new(target.clone(), source, apply());
    let report = deployment
        .run(&changes, &Revision::parse("v1").unwrap())
        .unwrap();

    assert_eq!(report.stage.conflicts, 1);
    assert_eq!(report.stage.conflict_paths, vec!["a/b.txt"]);
    assert_eq!(
        report.commit.outcome("a/b.txt"),
        Some(&CommitOutcome::Skipped(SkipReason::AlreadyExists(
            "a/b.txt".to_string()
        )))
    );
    assert_eq!(report.commit.outcome("a/d.txt"), Some(&CommitOutcome::Applied));

    assert!(!deployment.applied().contains("a/b.txt"));
    assert!(deployment.applied().contains("a/d.txt"));
    assert_eq!(target.file_contents("a/b.txt").unwrap(), b"old b");
    assert_eq!(deployment.state(), DeployState::Finished);
}

#[test]
fn test_plan_mode_matches_apply_conflicts_without_mutation() {
    let seed = || {
        MemoryTarget::new()
            .with_file("a/b.txt", "existing")
            .with_file("a/c.txt", "c v1")
            .with_file("a/old", "old")
    };
    let files = [("a/b.txt", "b"), ("a/c.txt", "c v2"), ("x.txt", "x")];
    let raw = [
        ("A", "a/b.txt"),
        ("M", "a/c.txt"),
        ("M", "x.txt"),
        ("D", "a/old"),
        ("D", "a/gone"),
    ];
    let revision = Revision::parse("v2").unwrap();

    let planned = Arc::new(seed());
    let before = snapshot(&planned);
    let (_plan_dir, plan_source) = working_tree(&files);
    let mut plan = Deployment::new(planned.clone(), plan_source, DeployOptions::default());
    let plan_report = plan.run(&ordered(&raw), &revision).unwrap();

    let applied = Arc::new(seed());
    let (_apply_dir, apply_source) = working_tree(&files);
    let mut real = Deployment::new(applied.clone(), apply_source, apply());
    let apply_report = real.run(&ordered(&raw), &revision).unwrap();

    assert!(plan_report.mode.is_plan());
    assert_eq!(snapshot(&planned), before);
    assert!(!planned.has(".stagehand.rev").unwrap());

    assert_eq!(plan_report.stage.conflicts, 3);
    assert_eq!(plan_report.stage.conflicts, apply_report.stage.conflicts);
    assert_eq!(
        plan_report.stage.conflict_paths,
        apply_report.stage.conflict_paths
    );
    assert_ne!(snapshot(&applied), before);
}

#[test]
fn test_revert_restores_previous_tree() {
    let target = Arc::new(
        MemoryTarget::new()
            .with_file("a/c.txt", "c v1")
            .with_file("a/old", "old")
            .with_file("a/dir/f.txt", "f")
            .with_file("a/dir/g.txt", "g"),
    );
    let before = snapshot(&target);
    let (_dir, source) = working_tree(&[("a/b.txt", "b"), ("a/c.txt", "c v2"), ("a/new/", "")]);
    let changes = ordered(&[
        ("A", "a/b.txt"),
        ("A", "a/new"),
        ("M", "a/c.txt"),
        ("D", "a/old"),
        ("D", "a/dir"),
    ]);

    let mut deployment = Deployment::new(target.clone(), source, apply());
    deployment.prepare().unwrap();
    deployment.stage(&changes).unwrap();
    deployment.commit(&changes).unwrap();
    assert_eq!(deployment.applied().len(), 5);
    assert!(target.is_dir("a/new"));
    assert!(!target.has("a/dir").unwrap());

    let report = deployment.revert();
    assert!(report.is_complete());
    assert_eq!(report.reverted, 5);
    assert_eq!(deployment.state(), DeployState::Reverted);

    assert!(deployment.cleanup());
    assert_eq!(snapshot(&target), before);
}

#[test]
fn test_revert_from_saved_record() {
    let target = Arc::new(MemoryTarget::new().with_file("index.php", "v1"));
    let before = snapshot(&target);
    let (_dir, source) = working_tree(&[("index.php", "v2")]);
    let changes = ordered(&[("M", "index.php")]);

    let json = {
        let mut deployment = Deployment::new(target.clone(), source, apply());
        deployment.prepare().unwrap();
        deployment.stage(&changes).unwrap();
        deployment.commit(&changes).unwrap();
        deployment.applied().to_json().unwrap()
    };
    assert_eq!(target.file_contents("index.php").unwrap(), b"v2");

    let (_other, source) = working_tree(&[]);
    let mut recovery = Deployment::new(target.clone(), source, apply())
        .with_applied(stagehand::AppliedRecord::from_json(&json).unwrap());
    assert!(recovery.revert().is_complete());
    recovery.cleanup();

    assert_eq!(snapshot(&target), before);
}

#[test]
fn test_permission_rules_on_numeric_target() {
    let target = Arc::new(MemoryTarget::with_modes(0o755, 0o700));
    let (_dir, source) = working_tree(&[
        ("logs/2024/", ""),
        ("logs/app.log", "started"),
        ("readme.txt", "hello"),
        ("index.php", "<?php"),
    ]);
    let changes = ordered(&[
        ("A", "logs/2024"),
        ("A", "logs/app.log"),
        ("A", "readme.txt"),
        ("A", "index.php"),
    ]);
    let rules =
        PermissionRules::from_pairs([("*.txt", "0644"), ("logs/*", "0700-0600")]).unwrap();

    let mut deployment =
        Deployment::new(target.clone(), source, apply().with_permissions(rules));
    let report = deployment
        .run(&changes, &Revision::parse("v3").unwrap())
        .unwrap();

    assert_eq!(report.permissions.applied(), 3);
    assert_eq!(target.mode("logs/2024"), Some(0o700));
    assert_eq!(target.mode("logs/app.log"), Some(0o600));
    assert_eq!(target.mode("readme.txt"), Some(0o644));
    assert_eq!(target.mode("index.php"), None);
    assert_eq!(target.public_mode(), Some(0o755));
}

#[test]
fn test_progress_reports_every_phase() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let progress = CallbackProgress::new(move |event| sink.lock().unwrap().push(event));

    let (_dir, source) = working_tree(&[("a.txt", "a"), ("b.txt", "b")]);
    let mut deployment = Deployment::new(MemoryTarget::new(), source, apply())
        .with_progress(Arc::new(progress));
    deployment
        .run(
            &ordered(&[("A", "a.txt"), ("A", "b.txt")]),
            &Revision::parse("v1").unwrap(),
        )
        .unwrap();

    let events = events.lock().unwrap();
    let phases: Vec<Phase> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Started { phase, total } => {
                assert_eq!(*total, 2);
                Some(*phase)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![Phase::Staging, Phase::Committing, Phase::Permissions]
    );
    assert!(events.contains(&ProgressEvent::Position {
        current: 2,
        total: 2
    }));
}

#[test]
fn test_leftover_temp_root_is_replaced() {
    let target = Arc::new(
        MemoryTarget::new()
            .with_file(".stagehand.tmp/push/stale.txt", "stale")
            .with_file(".stagehand.tmp/revert/stale.txt", "stale"),
    );
    let (_dir, source) = working_tree(&[]);

    let mut deployment = Deployment::new(target.clone(), source, apply());
    deployment.prepare().unwrap();

    assert!(target.is_dir(".stagehand.tmp/push"));
    assert!(!target.has(".stagehand.tmp/push/stale.txt").unwrap());
    assert!(!target.has(".stagehand.tmp/revert/stale.txt").unwrap());
}
