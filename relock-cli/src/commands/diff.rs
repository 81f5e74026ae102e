//! `relock diff` — compare manifests and classify the change.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use relock_core::ProjectLayout;
use relock_diff::{compare_manifests, find_version_change};
use relock_store::SnapshotStore;

/// Arguments for `relock diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Project whose two most recent snapshots are compared.
    #[arg(long, conflicts_with = "files")]
    pub project: Option<PathBuf>,

    /// Explicit pair of manifest files to compare: old then new.
    #[arg(long, num_args = 2, value_names = ["OLD", "NEW"])]
    pub files: Option<Vec<PathBuf>>,

    /// Package whose version transition is classified within the diff.
    #[arg(long, default_value = "django")]
    pub package: String,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let (old_path, new_path) = self.resolve_pair()?;

        let old_text = std::fs::read_to_string(&old_path)
            .with_context(|| format!("reading {}", old_path.display()))?;
        let new_text = std::fs::read_to_string(&new_path)
            .with_context(|| format!("reading {}", new_path.display()))?;

        let old_label = old_path.display().to_string();
        let new_label = new_path.display().to_string();
        let diff = compare_manifests(&old_text, &new_text, &old_label, &new_label);

        if !diff.changed {
            println!("{} no manifest changes", "✓".green());
            return Ok(());
        }

        print!("{}", diff.diff_text);
        let change = find_version_change(&diff.diff_text, &self.package);
        if change.changed {
            println!(
                "\n{} {} changed: {} -> {}",
                "●".yellow(),
                self.package,
                change.old.as_deref().unwrap_or("(new)"),
                change.new.as_deref().unwrap_or("(removed)"),
            );
        } else {
            println!("\n{} no {} version change", "·".dimmed(), self.package);
        }
        Ok(())
    }

    fn resolve_pair(&self) -> Result<(PathBuf, PathBuf)> {
        if let Some(files) = &self.files {
            // clap enforces exactly two values.
            return Ok((files[0].clone(), files[1].clone()));
        }
        let Some(project) = &self.project else {
            bail!("provide --project or --files OLD NEW");
        };
        let layout = ProjectLayout::new(project);
        let store = SnapshotStore::at(layout.backups_dir());
        let latest = store
            .latest()?
            .context("no snapshots found; run `relock update` first")?;
        let previous = store
            .previous()?
            .context("only one snapshot found; nothing to compare against")?;
        Ok((previous.path, latest.path))
    }
}
