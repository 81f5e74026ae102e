//! Relock core library — domain types, settings, project layout, process
//! plumbing, errors.
//!
//! Public API surface:
//! - [`types`] — environment tiers, recipients
//! - [`layout`] — derived filesystem paths for a managed project
//! - [`process`] — captured subprocess results ([`CmdOutput`])
//! - [`settings`] — environment-variable configuration
//! - [`error`] — [`SettingsError`]

pub mod error;
pub mod layout;
pub mod process;
pub mod settings;
pub mod types;

pub use error::SettingsError;
pub use layout::ProjectLayout;
pub use process::CmdOutput;
pub use settings::Settings;
pub use types::{EnvTier, Recipient};
