// src/commands/mod.rs
//! Command handlers for the stagehand CLI

pub mod progress;
mod push;
mod revert;
mod status;

pub use push::{cmd_push, PushArgs};
pub use revert::cmd_revert;
pub use status::cmd_status;

use anyhow::{Context, Result};
use stagehand::{parse_profile_file, Profile};
use std::path::Path;

/// Load and validate a deployment profile
fn load_profile(path: &Path) -> Result<Profile> {
    let profile = parse_profile_file(path)
        .with_context(|| format!("Failed to load profile {}", path.display()))?;
    tracing::debug!(
        "Loaded profile '{}' (source {}, target {})",
        profile.config.name,
        profile.config.source.display(),
        profile.target.root.display()
    );
    Ok(profile)
}
