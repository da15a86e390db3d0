// src/cli.rs
//! CLI definitions for stagehand
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default location of the applied record saved by an aborted push
pub const DEFAULT_RECORD: &str = ".stagehand-applied.json";

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(author = "Stagehand Contributors")]
#[command(version)]
#[command(about = "Staged, reversible deployment of source-control changes", long_about = None)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a change list to the profile's target
    ///
    /// Runs in plan mode unless --go is given.
    Push {
        /// Deployment profile (TOML)
        #[arg(short, long)]
        profile: PathBuf,

        /// Change listing in `git diff --name-status` format ("-" for stdin)
        #[arg(short, long)]
        changes: PathBuf,

        /// Revision being deployed
        #[arg(short, long)]
        revision: String,

        /// Apply the changes instead of planning them
        #[arg(long)]
        go: bool,

        /// Where to save the applied record if the push fails
        #[arg(long, default_value = DEFAULT_RECORD)]
        record: PathBuf,

        /// Keep a failed push in place instead of reverting it
        #[arg(long)]
        no_revert: bool,

        /// Log progress instead of drawing progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Undo a failed push using its saved applied record
    Revert {
        /// Deployment profile (TOML)
        #[arg(short, long)]
        profile: PathBuf,

        /// Applied record saved by the failed push
        #[arg(long, default_value = DEFAULT_RECORD)]
        record: PathBuf,
    },

    /// Show the revision currently deployed to the profile's target
    Status {
        /// Deployment profile (TOML)
        #[arg(short, long)]
        profile: PathBuf,
    },
}
