//! Error types for relock-env.
//!
//! Every variant is a precondition failure: the run must halt before any
//! mutation, and operators are notified with the rendered message.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("project path {path} does not exist")]
    ProjectPathMissing { path: PathBuf },

    #[error("uv binary {path} does not exist")]
    UvMissing { path: PathBuf },

    #[error("project is on branch `{branch}` instead of `main`")]
    WrongBranch { branch: String },

    #[error("working tree is not clean; commit or stash before updating")]
    DirtyWorkingTree,

    #[error("requirements source {path} not found")]
    MissingRequirements { path: PathBuf },

    #[error("could not read python version from {path}")]
    PythonVersionMissing { path: PathBuf },

    #[error("could not infer project group: {message}")]
    GroupInference { message: String },

    /// Aggregated group/permission violations, rendered as a JSON map of
    /// path → issues.
    #[error("group/permission check failed:\n{report}")]
    PermissionAudit { report: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`PreflightError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PreflightError {
    PreflightError::Io {
        path: path.into(),
        source,
    }
}
