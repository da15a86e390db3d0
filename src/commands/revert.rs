// src/commands/revert.rs
//! Revert a failed push from its saved applied record

use super::load_profile;
use anyhow::{bail, Context, Result};
use stagehand::{AppliedRecord, DeployMode, DeployOptions, Deployment, LogProgress, SourceTree};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub fn cmd_revert(profile_path: &Path, record_path: &Path) -> Result<()> {
    let profile = load_profile(profile_path)?;
    let record = AppliedRecord::load(record_path)
        .with_context(|| format!("Failed to load applied record {}", record_path.display()))?;

    if record.is_empty() {
        println!("Applied record is empty, nothing to revert");
        return Ok(());
    }

    let target = profile
        .open_target()
        .with_context(|| format!("Failed to open target {}", profile.target.root.display()))?;
    let options = DeployOptions::new(DeployMode::Apply).with_layout(profile.staging_layout());

    let mut deployment = Deployment::new(target, SourceTree::new(&profile.config.source), options)
        .with_progress(Arc::new(LogProgress::new()))
        .with_applied(record);

    info!("Reverting {} change(s)", deployment.applied().len());
    let report = deployment.revert();

    if !report.is_complete() {
        for (path, reason) in &report.failed {
            error!("  {}: {}", path, reason);
        }
        bail!(
            "Revert incomplete: {} of {} change(s) could not be undone",
            report.failed.len(),
            deployment.applied().len()
        );
    }

    deployment.cleanup();
    if let Err(e) = std::fs::remove_file(record_path) {
        warn!("Could not remove {}: {}", record_path.display(), e);
    }

    println!("Reverted {} change(s)", report.reverted);
    Ok(())
}
