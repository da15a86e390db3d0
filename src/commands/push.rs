// src/commands/push.rs
//! Push a change list to a target

use super::load_profile;
use super::progress::BarProgress;
use anyhow::{bail, Context, Result};
use stagehand::deploy::{CommitOutcome, PermissionOutcome};
use stagehand::{
    parse_name_status, DeployMode, DeployOptions, DeployReport, Deployment, LogProgress,
    OrderedChanges, ProgressTracker, Revision, SourceTree,
};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Arguments of the `push` command
pub struct PushArgs<'a> {
    pub profile: &'a Path,
    pub changes: &'a Path,
    pub revision: &'a str,
    pub go: bool,
    pub record: &'a Path,
    pub revert_on_failure: bool,
    pub show_progress: bool,
}

/// Deploy a change listing, planning it unless `go` is set
pub fn cmd_push(args: PushArgs<'_>) -> Result<()> {
    let profile = load_profile(args.profile)?;
    let revision = Revision::parse(args.revision)?;

    let listing = read_listing(args.changes)?;
    let raw = parse_name_status(&listing)
        .with_context(|| format!("Invalid change listing {}", args.changes.display()))?;

    let (set, stats) = profile.change_set_builder()?.build(raw);
    if stats.dropped() > 0 {
        info!(
            "Dropped {} change(s): {} excluded, {} unsupported kind, {} invalid path, {} duplicate",
            stats.dropped(),
            stats.excluded,
            stats.unknown_kind,
            stats.invalid_path,
            stats.duplicates
        );
    }

    let changes = OrderedChanges::from_working_set(set);
    if changes.is_empty() {
        println!("Nothing to deploy for {}", revision);
        return Ok(());
    }

    let mode = if args.go {
        DeployMode::Apply
    } else {
        DeployMode::Plan
    };
    let options = DeployOptions::new(mode)
        .with_layout(profile.staging_layout())
        .with_permissions(profile.permission_rules()?);

    let target = profile
        .open_target()
        .with_context(|| format!("Failed to open target {}", profile.target.root.display()))?;
    let source = SourceTree::new(&profile.config.source);

    let progress: Arc<dyn ProgressTracker> = if args.show_progress {
        Arc::new(BarProgress::new())
    } else {
        Arc::new(LogProgress::new())
    };

    let mut deployment =
        Deployment::new(target, source, options).with_progress(Arc::clone(&progress));

    match deployment.run(&changes, &revision) {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            error!(
                "Push of {} failed at item {}/{} of the current phase: {}",
                revision,
                progress.position(),
                progress.length(),
                e
            );
            recover(&mut deployment, args.record, args.revert_on_failure)?;
            Err(e).context(format!("Failed to deploy {}", revision))
        }
    }
}

/// Read the change listing from a file, or stdin for `-`
fn read_listing(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return io::read_to_string(io::stdin()).context("Failed to read change listing from stdin");
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read change listing {}", path.display()))
}

/// Undo or preserve a failed push
///
/// Reverting is the default. With `revert` unset the applied record is
/// saved and the temporary root is kept, since the backups live there.
fn recover(deployment: &mut Deployment, record: &Path, revert: bool) -> Result<()> {
    if deployment.mode().is_plan() || deployment.applied().is_empty() {
        deployment.cleanup();
        return Ok(());
    }

    if !revert {
        deployment
            .applied()
            .save(record)
            .with_context(|| format!("Failed to save applied record to {}", record.display()))?;
        warn!(
            "Target left partially deployed; run `stagehand revert --record {}` to undo",
            record.display()
        );
        return Ok(());
    }

    info!("Reverting {} applied change(s)", deployment.applied().len());
    let report = deployment.revert();

    if report.is_complete() {
        deployment.cleanup();
        println!("Reverted {} change(s)", report.reverted);
        return Ok(());
    }

    for (path, reason) in &report.failed {
        error!("  {}: {}", path, reason);
    }
    deployment
        .applied()
        .save(record)
        .with_context(|| format!("Failed to save applied record to {}", record.display()))?;
    bail!(
        "Revert incomplete: {} change(s) could not be undone; applied record saved to {}",
        report.failed.len(),
        record.display()
    )
}

fn print_report(report: &DeployReport) {
    let heading = if report.mode.is_plan() {
        "Plan for"
    } else {
        "Deployed"
    };
    match &report.previous_revision {
        Some(previous) => println!("{} {} (was {})", heading, report.revision, previous),
        None => println!("{} {} (no previous revision)", heading, report.revision),
    }

    for (change, outcome) in &report.commit.outcomes {
        match outcome {
            CommitOutcome::Applied => println!("  {}", change),
            CommitOutcome::Skipped(reason) => println!("  {} [skipped: {}]", change, reason),
        }
    }

    for path in &report.stage.conflict_paths {
        println!("  conflict: {}", path);
    }
    for (path, outcome) in &report.permissions.outcomes {
        if let PermissionOutcome::Invalid { spec } = outcome {
            println!("  invalid permission '{}' for {}", spec, path);
        }
    }

    println!(
        "{} applied, {} skipped, {} conflict(s), permissions set on {}",
        report.commit.applied(),
        report.commit.skipped(),
        report.stage.conflicts,
        report.permissions.applied()
    );

    if report.mode.is_plan() {
        println!("Nothing was changed; run again with --go to apply");
    } else if !report.cleaned_up {
        println!("Temporary files could not be removed from the target");
    }
}
