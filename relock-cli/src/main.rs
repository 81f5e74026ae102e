//! Relock — automated dependency updates with snapshots and rollback.
//!
//! # Usage
//!
//! ```text
//! relock update --project <path>
//! relock diff --project <path> [--package <name>]
//! relock diff --files <old> <new> [--package <name>]
//! relock snapshots --project <path>
//! ```
//!
//! `update` is the cron entry point: it compiles a fresh pinned manifest,
//! compares it against the previous snapshot, and converges the project's
//! environment when something actually changed. Logging goes through
//! `env_logger`; set `RUST_LOG=debug` for full detail.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, snapshots::SnapshotsArgs, update::UpdateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "relock",
    version,
    about = "Keep a deployed project's pinned dependencies up to date, safely",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full update pass for a project.
    Update(UpdateArgs),

    /// Show and classify the change between two manifests.
    Diff(DiffArgs),

    /// List retained manifest snapshots for a project.
    Snapshots(SnapshotsArgs),
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Update(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Snapshots(args) => args.run(),
    }
}
