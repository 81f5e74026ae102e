//! Top-level update orchestration.
//!
//! One call to [`run`] performs the full pass for a project:
//!
//! 1. preflight validation (fatal),
//! 2. initial test gate (fatal),
//! 3. compile a candidate manifest into a fresh snapshot,
//! 4. prune the snapshot set,
//! 5. compare the candidate against the previous snapshot,
//! 6. if changed, drive the sync engine,
//! 7. if applied and the framework package moved, regenerate static assets,
//! 8. run the follow-up test gate,
//! 9. mark the candidate active,
//! 10. notify project admins,
//! 11. fix group/permissions — always, whatever happened after step 5.
//!
//! Failure policy: everything before the first environment mutation
//! (step 6) is fail-fast and exits the run; everything after is captured
//! into the [`UpdateOutcome`] so notification and permission fixup still
//! happen.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use relock_core::{CmdOutput, ProjectLayout, Recipient, Settings, SettingsError};
use relock_diff::{compare_manifests, find_version_change, DiffResult};
use relock_env::preflight::Preflight;
use relock_env::PreflightError;
use relock_store::{RunLock, SnapshotStore, StoreError};

use crate::engine::{Installer, SyncEngine, SyncReport, TestGate};
use crate::error::SyncError;
use crate::notify::{self, Notifier};

/// The dependency whose version change triggers the static-asset step.
pub const DJANGO_PACKAGE: &str = "django";

/// Snapshots retained after pruning.
pub const KEEP_RECENT: usize = 30;

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Validates the environment before anything runs.
pub trait PreflightCheck {
    fn run(&self) -> Result<Preflight, PreflightError>;
}

/// Compiles a requirements source into a pinned manifest.
pub trait Resolver {
    fn compile(
        &self,
        source: &Path,
        output: &Path,
        python_version: &str,
    ) -> Result<CmdOutput, SyncError>;
}

/// Regenerates framework static assets after a framework upgrade.
pub trait AssetStep {
    fn regenerate(&self) -> Result<CmdOutput, SyncError>;
}

/// Best-effort group/permission repair.
pub trait PermissionFixer {
    fn fix(&self, paths: &[PathBuf], gid: u32);
}

/// Production preflight backed by `relock-env`.
pub struct EnvPreflight {
    pub layout: ProjectLayout,
    pub uv_path: PathBuf,
}

impl PreflightCheck for EnvPreflight {
    fn run(&self) -> Result<Preflight, PreflightError> {
        relock_env::preflight::run(&self.layout, &self.uv_path)
    }
}

/// Production permission fixer backed by `relock-env`.
pub struct GroupPermissionFixer;

impl PermissionFixer for GroupPermissionFixer {
    fn fix(&self, paths: &[PathBuf], gid: u32) {
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        relock_env::fixup::fix_group_and_permissions(&refs, gid);
    }
}

/// Wiring of every external collaborator for one run.
pub struct Collaborators<'a> {
    pub preflight: &'a dyn PreflightCheck,
    pub resolver: &'a dyn Resolver,
    pub installer: &'a dyn Installer,
    pub gate: &'a dyn TestGate,
    pub assets: &'a dyn AssetStep,
    pub notifier: &'a dyn Notifier,
    pub perms: &'a dyn PermissionFixer,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What one orchestration run did, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct UpdateOutcome {
    /// Whether the manifest body actually changed this run.
    pub changed: bool,
    /// Sync engine report; `None` when the engine never ran.
    pub sync: Option<SyncReport>,
    /// Engine-level failure that prevented a sync report.
    pub sync_problem: Option<String>,
    /// Detected framework version transition, e.g. `django 4.2.20 -> 4.2.27`.
    pub django_update: Option<String>,
    pub assets_problem: Option<String>,
    pub followup_problem: Option<String>,
    /// Whether the diff notification was delivered.
    pub notified: bool,
}

impl UpdateOutcome {
    pub fn applied(&self) -> bool {
        self.sync.as_ref().map(SyncReport::is_applied).unwrap_or(false)
    }

    pub fn rolled_back(&self) -> bool {
        self.sync.as_ref().map(SyncReport::rolled_back).unwrap_or(false)
    }
}

/// Fatal failures — everything here happens before the environment is
/// touched, so the run halts with no rollback needed.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("preflight failed: {0}")]
    Preflight(#[from] PreflightError),

    #[error("configuration error: {0}")]
    Settings(#[from] SettingsError),

    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),

    #[error("initial tests failed: {detail}")]
    InitialTests { detail: String },

    #[error("manifest compile failed: {detail}")]
    Compile { detail: String },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run the whole update pass for one project.
pub fn run(
    layout: &ProjectLayout,
    settings: &Settings,
    collab: &Collaborators<'_>,
) -> Result<UpdateOutcome, UpdateError> {
    let project_name = layout.project_name();
    let subject = notify::subject_line(&relock_env::hostname(), &project_name);

    let preflight = match collab.preflight.run() {
        Ok(p) => p,
        Err(e) => {
            report_setup_problem(collab.notifier, &settings.sys_admins, &subject, &e.to_string());
            return Err(e.into());
        }
    };

    let admins = match settings.project_admins(layout) {
        Ok(a) => a,
        Err(e) => {
            report_setup_problem(collab.notifier, &settings.sys_admins, &subject, &e.to_string());
            return Err(e.into());
        }
    };

    // Held for the remainder of the run; two overlapping invocations would
    // race on the anchor and backup files.
    let _lock = match RunLock::acquire(&layout.backups_dir()) {
        Ok(lock) => lock,
        Err(e) => {
            report_setup_problem(collab.notifier, &settings.sys_admins, &subject, &e.to_string());
            return Err(e.into());
        }
    };

    match collab.gate.run() {
        Ok(output) if output.ok => tracing::info!("ok / initial tests passed"),
        Ok(output) => {
            let detail = output.describe();
            report_setup_problem(
                collab.notifier,
                &admins,
                &subject,
                &format!("initial tests failed: {detail}"),
            );
            return Err(UpdateError::InitialTests { detail });
        }
        Err(e) => {
            report_setup_problem(collab.notifier, &admins, &subject, &e.to_string());
            return Err(e.into());
        }
    }

    let store = SnapshotStore::at(layout.backups_dir());
    let candidate = store.allocate(preflight.tier)?;
    match collab.resolver.compile(
        &layout.requirements_in(preflight.tier),
        &candidate.path,
        &preflight.python_version,
    ) {
        Ok(output) if output.ok => tracing::info!("ok / compiled {}", candidate.path.display()),
        Ok(output) => {
            let detail = output.describe();
            report_setup_problem(
                collab.notifier,
                &admins,
                &subject,
                &format!("manifest compile failed: {detail}"),
            );
            return Err(UpdateError::Compile { detail });
        }
        Err(e) => {
            report_setup_problem(collab.notifier, &admins, &subject, &e.to_string());
            return Err(e.into());
        }
    }

    store.prune(KEEP_RECENT)?;

    let previous = store.previous()?;
    let diff = match &previous {
        Some(prev) => compare_manifests(
            &prev.read_to_string()?,
            &candidate.read_to_string()?,
            &prev.file_name(),
            &candidate.file_name(),
        ),
        None => {
            tracing::info!("no previous snapshot; nothing to compare against");
            DiffResult::unchanged()
        }
    };
    tracing::info!("manifest changed: {}", diff.changed);

    let mut outcome = UpdateOutcome {
        changed: diff.changed,
        ..UpdateOutcome::default()
    };

    if let (true, Some(prev)) = (diff.changed, previous.as_ref()) {
        let engine = SyncEngine::new(collab.installer, collab.gate);
        match engine.sync(&prev.path, &layout.anchor_path(), &candidate.path) {
            Ok(report) => {
                let applied = report.is_applied();
                outcome.sync = Some(report);

                if applied {
                    let change = find_version_change(&diff.diff_text, DJANGO_PACKAGE);
                    if change.changed {
                        outcome.django_update = Some(format!(
                            "{DJANGO_PACKAGE} {} -> {}",
                            change.old.as_deref().unwrap_or("(new)"),
                            change.new.as_deref().unwrap_or("(removed)"),
                        ));
                        tracing::info!("framework updated; regenerating static assets");
                        outcome.assets_problem = match collab.assets.regenerate() {
                            Ok(output) if output.ok => None,
                            Ok(output) => Some(format!(
                                "problem regenerating static assets: {}",
                                output.describe()
                            )),
                            Err(e) => Some(format!("problem regenerating static assets: {e}")),
                        };
                    }

                    outcome.followup_problem = match collab.gate.run() {
                        Ok(output) if output.ok => None,
                        Ok(output) => {
                            Some(format!("post-update tests failed: {}", output.describe()))
                        }
                        Err(e) => Some(format!("post-update tests could not run: {e}")),
                    };

                    if let Err(e) = store.mark_active(&candidate) {
                        tracing::error!("could not mark snapshot active: {e}");
                        outcome.sync_problem = Some(format!("could not mark snapshot active: {e}"));
                    }
                }
            }
            Err(e) => {
                tracing::error!("sync engine error: {e}");
                outcome.sync_problem = Some(e.to_string());
            }
        }

        let body = match problems_summary(&outcome) {
            Some(problems) => {
                notify::update_problem_body(&project_name, &diff.diff_text, &problems)
            }
            None => notify::update_ok_body(&project_name, &diff.diff_text),
        };
        match collab.notifier.notify(&admins, &subject, &body) {
            Ok(()) => outcome.notified = true,
            Err(e) => tracing::error!("problem sending notification: {e}"),
        }
    }

    collab
        .perms
        .fix(&[layout.venv_dir(), candidate.path.clone()], preflight.gid);

    tracing::debug!(
        "outcome: {}",
        serde_json::to_string(&outcome).unwrap_or_default()
    );
    Ok(outcome)
}

fn report_setup_problem(
    notifier: &dyn Notifier,
    recipients: &[Recipient],
    subject: &str,
    message: &str,
) {
    tracing::error!("{message}");
    let body = notify::setup_problem_body(message);
    if let Err(e) = notifier.notify(recipients, subject, &body) {
        tracing::error!("problem sending setup notification: {e}");
    }
}

/// Aggregate every captured problem for the notification body.
fn problems_summary(outcome: &UpdateOutcome) -> Option<String> {
    let mut problems: Vec<String> = Vec::new();
    if let Some(report) = &outcome.sync {
        if report.rolled_back() {
            problems.push(
                "the update failed to apply and the environment was rolled back".to_string(),
            );
        }
        for problem in [
            &report.apply_problem,
            &report.restore_problem,
            &report.verify_problem,
        ]
        .into_iter()
        .flatten()
        {
            problems.push(problem.clone());
        }
    }
    for problem in [
        &outcome.sync_problem,
        &outcome.assets_problem,
        &outcome.followup_problem,
    ]
    .into_iter()
    .flatten()
    {
        problems.push(problem.clone());
    }
    if problems.is_empty() {
        None
    } else {
        Some(problems.join("\n\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
