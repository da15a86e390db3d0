// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: deployment profile
fn profile_arg() -> Arg {
    Arg::new("profile")
        .short('p')
        .long("profile")
        .value_name("FILE")
        .required(true)
        .help("Deployment profile (TOML)")
}

/// Common argument: applied record
fn record_arg() -> Arg {
    Arg::new("record")
        .long("record")
        .value_name("FILE")
        .default_value(".stagehand-applied.json")
        .help("Applied record saved by a failed push")
}

fn build_cli() -> Command {
    Command::new("stagehand")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Stagehand Contributors")
        .about("Staged, reversible deployment of source-control changes")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log debug output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only log warnings and errors"),
        )
        .subcommand(
            Command::new("push")
                .about("Deploy a change list to the profile's target (plan mode unless --go)")
                .arg(profile_arg())
                .arg(
                    Arg::new("changes")
                        .short('c')
                        .long("changes")
                        .value_name("FILE")
                        .required(true)
                        .help("Change listing in name-status format (\"-\" for stdin)"),
                )
                .arg(
                    Arg::new("revision")
                        .short('r')
                        .long("revision")
                        .required(true)
                        .help("Revision being deployed"),
                )
                .arg(
                    Arg::new("go")
                        .long("go")
                        .action(ArgAction::SetTrue)
                        .help("Apply the changes instead of planning them"),
                )
                .arg(record_arg())
                .arg(
                    Arg::new("no_revert")
                        .long("no-revert")
                        .action(ArgAction::SetTrue)
                        .help("Keep a failed push in place instead of reverting it"),
                )
                .arg(
                    Arg::new("no_progress")
                        .long("no-progress")
                        .action(ArgAction::SetTrue)
                        .help("Log progress instead of drawing progress bars"),
                ),
        )
        .subcommand(
            Command::new("revert")
                .about("Undo a failed push using its saved applied record")
                .arg(profile_arg())
                .arg(record_arg()),
        )
        .subcommand(
            Command::new("status")
                .about("Show the revision currently deployed to the profile's target")
                .arg(profile_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    if let Err(e) = fs::write(man_dir.join("stagehand.1"), buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
