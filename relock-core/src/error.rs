//! Error types for relock-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required `RELOCK__*` environment variable is absent.
    #[error("missing required environment variable {name}")]
    MissingVar { name: &'static str },

    /// A variable is present but malformed (e.g. a non-numeric port).
    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },

    /// The project's `.env` file could not be read or parsed.
    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// The project's `.env` file lacks the named key.
    #[error("env file {path} has no {key} entry")]
    MissingKey { path: PathBuf, key: &'static str },

    /// Recipient JSON could not be parsed into `[name, address]` pairs.
    #[error("malformed recipient JSON: {0}")]
    RecipientJson(#[from] serde_json::Error),
}
