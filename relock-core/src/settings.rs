//! Environment-variable configuration.
//!
//! Global settings come from `RELOCK__*` environment variables, read once
//! at startup. Per-project admin recipients live in the project's sibling
//! `.env` file under `ADMINS_JSON`, structured like:
//!
//! ```text
//! ADMINS_JSON='[["Jane Doe", "jane@example.edu"], ["Li Wei", "li@example.edu"]]'
//! ```

use std::path::PathBuf;

use crate::error::SettingsError;
use crate::layout::ProjectLayout;
use crate::types::Recipient;

const EMAIL_FROM: &str = "RELOCK__EMAIL_FROM";
const EMAIL_HOST: &str = "RELOCK__EMAIL_HOST";
const EMAIL_HOST_PORT: &str = "RELOCK__EMAIL_HOST_PORT";
const UV_PATH: &str = "RELOCK__UV_PATH";
const SYS_ADMIN_RECIPIENTS_JSON: &str = "RELOCK__SYS_ADMIN_RECIPIENTS_JSON";

/// Process-wide configuration for one orchestration run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub email_from: String,
    pub email_host: String,
    pub email_port: u16,
    pub uv_path: PathBuf,
    /// Operators of the updater itself; notified on setup problems.
    pub sys_admins: Vec<Recipient>,
}

impl Settings {
    /// Read all settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        let email_port_raw = require(EMAIL_HOST_PORT)?;
        let email_port =
            email_port_raw
                .parse::<u16>()
                .map_err(|e| SettingsError::InvalidVar {
                    name: EMAIL_HOST_PORT,
                    reason: e.to_string(),
                })?;

        Ok(Self {
            email_from: require(EMAIL_FROM)?,
            email_host: require(EMAIL_HOST)?,
            email_port,
            uv_path: PathBuf::from(require(UV_PATH)?),
            sys_admins: parse_recipients(&require(SYS_ADMIN_RECIPIENTS_JSON)?)?,
        })
    }

    /// Load the project admin recipients from `<parent>/.env`.
    pub fn project_admins(&self, layout: &ProjectLayout) -> Result<Vec<Recipient>, SettingsError> {
        let path = layout.env_file();
        let entries = dotenvy::from_path_iter(&path).map_err(|e| SettingsError::EnvFile {
            path: path.clone(),
            source: e,
        })?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| SettingsError::EnvFile {
                path: path.clone(),
                source: e,
            })?;
            if key == "ADMINS_JSON" {
                return parse_recipients(&value);
            }
        }
        Err(SettingsError::MissingKey {
            path,
            key: "ADMINS_JSON",
        })
    }
}

fn require(name: &'static str) -> Result<String, SettingsError> {
    std::env::var(name).map_err(|_| SettingsError::MissingVar { name })
}

/// Parse a JSON array of `[name, address]` pairs.
pub fn parse_recipients(json: &str) -> Result<Vec<Recipient>, SettingsError> {
    let pairs: Vec<(String, String)> = serde_json::from_str(json)?;
    Ok(pairs
        .into_iter()
        .map(|(name, address)| Recipient { name, address })
        .collect())
}
