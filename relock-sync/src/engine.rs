//! Rollback-capable sync engine.
//!
//! ## Saga protocol
//!
//! 1. **Backup** — copy the currently-applied manifest to the single-slot
//!    anchor and fsync it. Written to durable storage *before* any
//!    mutation is attempted: a crash mid-apply with no anchor would be
//!    unrecoverable.
//! 2. **Apply** — converge the environment to the candidate manifest in
//!    upgrade mode. Success is terminal ([`SyncState::Applied`]).
//! 3. **Rollback** — on apply failure, restore the anchor over the
//!    candidate path, re-sync in frozen/pinned mode so the environment
//!    matches exactly what it was before the run, and verify the restored
//!    copy byte-for-byte against the anchor. A failure *here* is
//!    second-order and recorded separately from the apply failure.
//! 4. **Verify** — re-run the test gate against the rolled-back
//!    environment. A gate failure is the most severe outcome: the
//!    environment is neither updated nor confirmed healthy.
//!
//! There is no automatic retry of the apply step; after any rollback a
//! human intervenes.

use std::fs;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use relock_core::CmdOutput;

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Converges the live environment to a manifest.
pub trait Installer {
    /// Upgrade mode: install the candidate manifest.
    fn apply(&self, manifest: &Path) -> Result<CmdOutput, SyncError>;

    /// Frozen/pinned mode: install exactly what `manifest` lists, no
    /// resolution. Restoring an already-correct environment is a no-op in
    /// effect.
    fn restore(&self, manifest: &Path) -> Result<CmdOutput, SyncError>;
}

/// Runs the project's test suite in the target environment.
pub trait TestGate {
    fn run(&self) -> Result<CmdOutput, SyncError>;
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Terminal state of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Applied,
    RolledBackHealthy,
    RolledBackUnhealthy,
}

/// Everything the caller needs to report about one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub state: SyncState,
    /// Why the apply step failed, when it did.
    pub apply_problem: Option<String>,
    /// Second-order failure while restoring the anchor.
    pub restore_problem: Option<String>,
    /// Post-rollback test-gate failure.
    pub verify_problem: Option<String>,
}

impl SyncReport {
    fn applied() -> Self {
        Self {
            state: SyncState::Applied,
            apply_problem: None,
            restore_problem: None,
            verify_problem: None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.state == SyncState::Applied
    }

    pub fn rolled_back(&self) -> bool {
        !self.is_applied()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SyncEngine<'a> {
    installer: &'a dyn Installer,
    gate: &'a dyn TestGate,
}

impl<'a> SyncEngine<'a> {
    pub fn new(installer: &'a dyn Installer, gate: &'a dyn TestGate) -> Self {
        Self { installer, gate }
    }

    /// Attempt to converge the environment to `candidate`.
    ///
    /// `applied` is the manifest the environment currently satisfies; it
    /// is copied to `anchor` before anything else runs. An `Err` from this
    /// function means the anchor could not be written — nothing has been
    /// mutated at that point.
    pub fn sync(
        &self,
        applied: &Path,
        anchor: &Path,
        candidate: &Path,
    ) -> Result<SyncReport, SyncError> {
        self.write_anchor(applied, anchor)?;

        tracing::info!("applying candidate manifest {}", candidate.display());
        let apply_problem = match self.installer.apply(candidate) {
            Ok(output) if output.ok => {
                tracing::info!("ok / apply succeeded");
                return Ok(SyncReport::applied());
            }
            Ok(output) => format!("apply failed: {}", output.describe()),
            Err(e) => format!("apply failed: {e}"),
        };
        tracing::error!("{apply_problem}");

        let restore_problem = self.rollback(anchor, candidate);
        let verify_problem = self.verify_rolled_back();

        let state = if verify_problem.is_none() {
            SyncState::RolledBackHealthy
        } else {
            SyncState::RolledBackUnhealthy
        };
        Ok(SyncReport {
            state,
            apply_problem: Some(apply_problem),
            restore_problem,
            verify_problem,
        })
    }

    fn write_anchor(&self, applied: &Path, anchor: &Path) -> Result<(), SyncError> {
        fs::copy(applied, anchor).map_err(|e| io_err(anchor, e))?;
        // The anchor must hit durable storage before the apply attempt.
        let file = fs::File::open(anchor).map_err(|e| io_err(anchor, e))?;
        file.sync_all().map_err(|e| io_err(anchor, e))?;
        tracing::info!("anchored {} at {}", applied.display(), anchor.display());
        Ok(())
    }

    /// Restore the anchor over the candidate path and frozen-sync it.
    /// Returns a problem description on any second-order failure.
    fn rollback(&self, anchor: &Path, candidate: &Path) -> Option<String> {
        tracing::info!("rolling back to {}", anchor.display());
        if let Err(e) = fs::copy(anchor, candidate) {
            return Some(format!(
                "could not restore anchor over {}: {e}",
                candidate.display()
            ));
        }

        match self.installer.restore(candidate) {
            Ok(output) if output.ok => {}
            Ok(output) => {
                return Some(format!("restore sync failed: {}", output.describe()));
            }
            Err(e) => return Some(format!("restore sync failed: {e}")),
        }

        match (file_digest(anchor), file_digest(candidate)) {
            (Ok(expected), Ok(actual)) if expected == actual => {
                tracing::info!("ok / rollback restored previous manifest");
                None
            }
            (Ok(_), Ok(_)) => Some("restored manifest does not match the anchor".to_string()),
            (Err(e), _) | (_, Err(e)) => Some(format!("could not verify restored manifest: {e}")),
        }
    }

    fn verify_rolled_back(&self) -> Option<String> {
        match self.gate.run() {
            Ok(output) if output.ok => {
                tracing::info!("ok / post-rollback tests passed");
                None
            }
            Ok(output) => Some(format!(
                "post-rollback tests failed: {}",
                output.describe()
            )),
            Err(e) => Some(format!("post-rollback tests could not run: {e}")),
        }
    }
}

fn file_digest(path: &Path) -> Result<String, SyncError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    struct FakeInstaller {
        fail_apply: bool,
        fail_restore: bool,
        applies: RefCell<Vec<PathBuf>>,
        restores: RefCell<Vec<PathBuf>>,
    }

    impl FakeInstaller {
        fn new(fail_apply: bool, fail_restore: bool) -> Self {
            Self {
                fail_apply,
                fail_restore,
                applies: RefCell::new(vec![]),
                restores: RefCell::new(vec![]),
            }
        }
    }

    fn passed() -> CmdOutput {
        CmdOutput {
            ok: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn failed(stderr: &str) -> CmdOutput {
        CmdOutput {
            ok: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    impl Installer for FakeInstaller {
        fn apply(&self, manifest: &Path) -> Result<CmdOutput, SyncError> {
            self.applies.borrow_mut().push(manifest.to_path_buf());
            Ok(if self.fail_apply {
                failed("resolution failed")
            } else {
                passed()
            })
        }

        fn restore(&self, manifest: &Path) -> Result<CmdOutput, SyncError> {
            self.restores.borrow_mut().push(manifest.to_path_buf());
            Ok(if self.fail_restore {
                failed("frozen sync failed")
            } else {
                passed()
            })
        }
    }

    struct FakeGate {
        fail: bool,
        runs: Cell<usize>,
    }

    impl TestGate for FakeGate {
        fn run(&self) -> Result<CmdOutput, SyncError> {
            self.runs.set(self.runs.get() + 1);
            Ok(if self.fail { failed("2 tests failed") } else { passed() })
        }
    }

    struct Fixture {
        _root: TempDir,
        applied: PathBuf,
        anchor: PathBuf,
        candidate: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = TempDir::new().unwrap();
        let applied = root.path().join("local_2026-08-04T03-00-00.txt");
        let anchor = root.path().join("applied_manifest.bak");
        let candidate = root.path().join("local_2026-08-05T03-00-00.txt");
        fs::write(&applied, "django==4.2.20\n").unwrap();
        fs::write(&candidate, "django==4.2.27\n").unwrap();
        Fixture {
            _root: root,
            applied,
            anchor,
            candidate,
        }
    }

    #[test]
    fn successful_apply_is_terminal() {
        let f = fixture();
        let installer = FakeInstaller::new(false, false);
        let gate = FakeGate {
            fail: false,
            runs: Cell::new(0),
        };

        let report = SyncEngine::new(&installer, &gate)
            .sync(&f.applied, &f.anchor, &f.candidate)
            .unwrap();

        assert!(report.is_applied());
        assert!(!report.rolled_back());
        assert_eq!(installer.restores.borrow().len(), 0);
        assert_eq!(gate.runs.get(), 0, "no verification needed after success");
        // Candidate untouched; anchor holds the pre-run manifest.
        assert_eq!(
            fs::read_to_string(&f.candidate).unwrap(),
            "django==4.2.27\n"
        );
        assert_eq!(fs::read_to_string(&f.anchor).unwrap(), "django==4.2.20\n");
    }

    #[test]
    fn anchor_is_written_before_apply() {
        let f = fixture();
        let installer = FakeInstaller::new(true, false);
        let gate = FakeGate {
            fail: false,
            runs: Cell::new(0),
        };

        SyncEngine::new(&installer, &gate)
            .sync(&f.applied, &f.anchor, &f.candidate)
            .unwrap();
        assert!(f.anchor.exists());
    }

    #[test]
    fn failed_apply_rolls_back_the_candidate_content() {
        let f = fixture();
        let installer = FakeInstaller::new(true, false);
        let gate = FakeGate {
            fail: false,
            runs: Cell::new(0),
        };

        let report = SyncEngine::new(&installer, &gate)
            .sync(&f.applied, &f.anchor, &f.candidate)
            .unwrap();

        assert_eq!(report.state, SyncState::RolledBackHealthy);
        assert!(report.rolled_back());
        assert!(report.apply_problem.is_some());
        assert!(report.restore_problem.is_none());
        // Round-trip: the candidate path now carries the pre-run manifest.
        assert_eq!(
            fs::read_to_string(&f.candidate).unwrap(),
            "django==4.2.20\n"
        );
        // Frozen re-sync ran against the restored manifest.
        assert_eq!(*installer.restores.borrow(), vec![f.candidate.clone()]);
        assert_eq!(gate.runs.get(), 1);
    }

    #[test]
    fn failed_restore_sync_is_surfaced_separately() {
        let f = fixture();
        let installer = FakeInstaller::new(true, true);
        let gate = FakeGate {
            fail: false,
            runs: Cell::new(0),
        };

        let report = SyncEngine::new(&installer, &gate)
            .sync(&f.applied, &f.anchor, &f.candidate)
            .unwrap();

        assert!(report.apply_problem.is_some());
        let restore = report.restore_problem.expect("second-order failure");
        assert!(restore.contains("restore sync failed"));
        // The gate still decides health.
        assert_eq!(report.state, SyncState::RolledBackHealthy);
    }

    #[test]
    fn failed_verification_is_the_most_severe_state() {
        let f = fixture();
        let installer = FakeInstaller::new(true, false);
        let gate = FakeGate {
            fail: true,
            runs: Cell::new(0),
        };

        let report = SyncEngine::new(&installer, &gate)
            .sync(&f.applied, &f.anchor, &f.candidate)
            .unwrap();

        assert_eq!(report.state, SyncState::RolledBackUnhealthy);
        assert!(report.verify_problem.unwrap().contains("post-rollback"));
    }

    #[test]
    fn missing_applied_manifest_fails_before_any_mutation() {
        let f = fixture();
        fs::remove_file(&f.applied).unwrap();
        let installer = FakeInstaller::new(false, false);
        let gate = FakeGate {
            fail: false,
            runs: Cell::new(0),
        };

        let err = SyncEngine::new(&installer, &gate).sync(&f.applied, &f.anchor, &f.candidate);
        assert!(err.is_err());
        assert!(installer.applies.borrow().is_empty(), "no mutation happened");
    }
}
