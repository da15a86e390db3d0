// src/commands/status.rs
//! Show the deployed revision

use super::load_profile;
use anyhow::{Context, Result};
use stagehand::{RevisionTracker, Target};
use std::path::Path;

pub fn cmd_status(profile_path: &Path) -> Result<()> {
    let profile = load_profile(profile_path)?;
    let target = profile
        .open_target()
        .with_context(|| format!("Failed to open target {}", profile.target.root.display()))?;
    let layout = profile.staging_layout();

    println!("Profile:  {}", profile.config.name);
    println!("Target:   {}", profile.target.root.display());

    let mut tracker = RevisionTracker::new(layout.marker());
    match tracker.read(&target)? {
        Some(revision) => println!("Revision: {}", revision),
        None => println!("Revision: (none deployed)"),
    }

    if target.has(layout.tmp_root())? {
        println!(
            "Warning: {} is left over from an interrupted push",
            layout.tmp_root()
        );
    }

    Ok(())
}
