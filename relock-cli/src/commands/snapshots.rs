//! `relock snapshots` — list retained manifest snapshots.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use relock_core::ProjectLayout;
use relock_store::SnapshotStore;

/// Arguments for `relock snapshots`.
#[derive(Args, Debug)]
pub struct SnapshotsArgs {
    /// Path to the project directory.
    #[arg(long)]
    pub project: PathBuf,
}

impl SnapshotsArgs {
    pub fn run(self) -> Result<()> {
        let layout = ProjectLayout::new(&self.project);
        let store = SnapshotStore::at(layout.backups_dir());
        let snapshots = store.list()?;

        if snapshots.is_empty() {
            println!(
                "No snapshots under {}. Run `relock update` first.",
                store.dir().display()
            );
            return Ok(());
        }

        println!("{} snapshot(s), newest first:", snapshots.len());
        for snapshot in snapshots {
            let marker = if snapshot.is_active().unwrap_or(false) {
                "ACTIVE".green().to_string()
            } else {
                "      ".to_string()
            };
            println!(
                "  {marker}  {}  {}  {}",
                snapshot.timestamp,
                snapshot.tier,
                snapshot.path.display()
            );
        }
        Ok(())
    }
}
