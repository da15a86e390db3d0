// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    // RUST_LOG wins over the verbosity flags
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Push {
            profile,
            changes,
            revision,
            go,
            record,
            no_revert,
            no_progress,
        } => commands::cmd_push(commands::PushArgs {
            profile: &profile,
            changes: &changes,
            revision: &revision,
            go,
            record: &record,
            revert_on_failure: !no_revert,
            show_progress: !no_progress && !cli.quiet,
        }),
        Commands::Revert { profile, record } => commands::cmd_revert(&profile, &record),
        Commands::Status { profile } => commands::cmd_status(&profile),
    }
}
