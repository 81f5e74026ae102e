//! `uv` toolchain driver.
//!
//! One [`Uv`] value implements every external-tool seam the orchestration
//! needs: the resolver ([`Resolver`]), the installer ([`Installer`]), the
//! test gate ([`TestGate`]) and the static-asset step ([`AssetStep`]).
//!
//! Command construction is kept separate from execution so the argv shape
//! is testable without a `uv` binary on the host.
//!
//! Installs go to the project venv without shell activation: activating a
//! venv only adjusts `PATH` and `VIRTUAL_ENV`, so the installer sets both
//! on the child process instead.

use std::path::{Path, PathBuf};

use chrono::Local;

use relock_core::process::run_captured;
use relock_core::{CmdOutput, ProjectLayout};

use crate::engine::{Installer, TestGate};
use crate::error::SyncError;
use crate::orchestrator::{AssetStep, Resolver};

pub struct Uv {
    uv_path: PathBuf,
    layout: ProjectLayout,
}

impl Uv {
    pub fn new(uv_path: impl Into<PathBuf>, layout: ProjectLayout) -> Self {
        Self {
            uv_path: uv_path.into(),
            layout,
        }
    }

    // -- command builders ---------------------------------------------------

    /// `uv pip compile <source> --output-file <output> --universal
    ///  --python <version> --exclude-newer <today>`
    ///
    /// The exclude-newer guard pins resolution to packages published
    /// before today, keeping a re-run on the same day reproducible.
    pub fn compile_command(&self, source: &Path, output: &Path, python_version: &str) -> Vec<String> {
        vec![
            self.uv_path.display().to_string(),
            "pip".to_string(),
            "compile".to_string(),
            source.display().to_string(),
            "--output-file".to_string(),
            output.display().to_string(),
            "--universal".to_string(),
            "--python".to_string(),
            python_version.to_string(),
            "--exclude-newer".to_string(),
            Local::now().format("%Y-%m-%d").to_string(),
        ]
    }

    /// `uv pip sync <manifest>` — exact installation of what is listed.
    pub fn sync_command(&self, manifest: &Path) -> Vec<String> {
        vec![
            self.uv_path.display().to_string(),
            "pip".to_string(),
            "sync".to_string(),
            manifest.display().to_string(),
        ]
    }

    /// `uv run run_tests.py`
    pub fn run_tests_command(&self) -> Vec<String> {
        vec![
            self.uv_path.display().to_string(),
            "run".to_string(),
            self.layout.run_tests_file().display().to_string(),
        ]
    }

    /// `uv run ./manage.py collectstatic --noinput`
    pub fn collectstatic_command(&self) -> Vec<String> {
        vec![
            self.uv_path.display().to_string(),
            "run".to_string(),
            "./manage.py".to_string(),
            "collectstatic".to_string(),
            "--noinput".to_string(),
        ]
    }

    // -- execution ----------------------------------------------------------

    fn venv_env(&self) -> Vec<(String, String)> {
        let bin = self.layout.venv_bin_dir().display().to_string();
        let path = std::env::var("PATH").unwrap_or_default();
        vec![
            ("PATH".to_string(), format!("{bin}:{path}")),
            (
                "VIRTUAL_ENV".to_string(),
                self.layout.venv_dir().display().to_string(),
            ),
        ]
    }

    fn run(&self, argv: &[String], envs: &[(String, String)]) -> Result<CmdOutput, SyncError> {
        tracing::debug!("running {argv:?}");
        run_captured(&argv[0], &argv[1..], Some(self.layout.project()), envs).map_err(|e| {
            SyncError::Spawn {
                program: argv[0].clone(),
                source: e,
            }
        })
    }

    /// Touch the restart sentinel so the application server picks up the
    /// new environment. Best-effort: a failure is logged, never raised.
    fn touch_restart(&self) {
        let sentinel = self.layout.restart_file().display().to_string();
        let args = vec![sentinel.clone()];
        match run_captured("touch", &args, Some(self.layout.project()), &[]) {
            Ok(output) if output.ok => tracing::info!("ok / touched restart sentinel"),
            Ok(output) => tracing::warn!("touch failed for {sentinel}: {}", output.describe()),
            Err(e) => tracing::warn!("touch could not run for {sentinel}: {e}"),
        }
    }
}

impl Resolver for Uv {
    fn compile(
        &self,
        source: &Path,
        output: &Path,
        python_version: &str,
    ) -> Result<CmdOutput, SyncError> {
        tracing::info!("compiling {} -> {}", source.display(), output.display());
        self.run(&self.compile_command(source, output, python_version), &[])
    }
}

impl Installer for Uv {
    fn apply(&self, manifest: &Path) -> Result<CmdOutput, SyncError> {
        let output = self.run(&self.sync_command(manifest), &self.venv_env())?;
        if output.ok {
            self.touch_restart();
        }
        Ok(output)
    }

    fn restore(&self, manifest: &Path) -> Result<CmdOutput, SyncError> {
        tracing::info!("frozen re-sync of {}", manifest.display());
        self.run(&self.sync_command(manifest), &self.venv_env())
    }
}

impl TestGate for Uv {
    fn run(&self) -> Result<CmdOutput, SyncError> {
        Uv::run(self, &self.run_tests_command(), &[])
    }
}

impl AssetStep for Uv {
    fn regenerate(&self) -> Result<CmdOutput, SyncError> {
        tracing::info!("regenerating static assets");
        self.run(&self.collectstatic_command(), &self.venv_env())
    }
}
