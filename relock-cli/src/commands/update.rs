//! `relock update` — the full orchestration pass.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use relock_core::{ProjectLayout, Settings};
use relock_sync::orchestrator::{self, Collaborators, EnvPreflight, GroupPermissionFixer};
use relock_sync::notify::SmtpNotifier;
use relock_sync::{Uv, UpdateOutcome};

/// Arguments for `relock update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Path to the project directory.
    #[arg(long)]
    pub project: PathBuf,
}

impl UpdateArgs {
    pub fn run(self) -> Result<()> {
        let settings = Settings::from_env().context("loading RELOCK__* settings")?;
        let project = std::fs::canonicalize(&self.project)
            .with_context(|| format!("resolving project path '{}'", self.project.display()))?;
        let layout = ProjectLayout::new(project);

        let uv = Uv::new(settings.uv_path.clone(), layout.clone());
        let preflight = EnvPreflight {
            layout: layout.clone(),
            uv_path: settings.uv_path.clone(),
        };
        let notifier = SmtpNotifier {
            host: settings.email_host.clone(),
            port: settings.email_port,
            from: settings.email_from.clone(),
        };
        let perms = GroupPermissionFixer;

        let collab = Collaborators {
            preflight: &preflight,
            resolver: &uv,
            installer: &uv,
            gate: &uv,
            assets: &uv,
            notifier: &notifier,
            perms: &perms,
        };

        let outcome = orchestrator::run(&layout, &settings, &collab)
            .with_context(|| format!("update failed for '{}'", layout.project_name()))?;
        print_outcome(&layout.project_name(), &outcome);
        Ok(())
    }
}

fn print_outcome(project_name: &str, outcome: &UpdateOutcome) {
    if !outcome.changed {
        println!(
            "{} '{project_name}' — no dependency changes",
            "✓".green()
        );
        return;
    }

    if outcome.applied() {
        println!("{} '{project_name}' — dependencies updated", "✓".green());
        if let Some(update) = &outcome.django_update {
            println!("  framework: {update}");
        }
    } else {
        println!(
            "{} '{project_name}' — update failed; environment rolled back",
            "✗".red()
        );
    }

    for problem in [
        &outcome.sync_problem,
        &outcome.assets_problem,
        &outcome.followup_problem,
    ]
    .into_iter()
    .flatten()
    {
        println!("  {} {problem}", "!".yellow());
    }

    if outcome.notified {
        println!("  admins notified");
    }
}
