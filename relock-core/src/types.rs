//! Domain types shared across the relock workspace.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Environment tier
// ---------------------------------------------------------------------------

/// Deployment tier of the target environment.
///
/// Selects which `requirements/<tier>.in` source is compiled and which
/// snapshot family the run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvTier {
    #[default]
    Local,
    Staging,
    Production,
}

impl EnvTier {
    /// The tier label as embedded in filenames and requirement sources.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvTier::Local => "local",
            EnvTier::Staging => "staging",
            EnvTier::Production => "production",
        }
    }

    /// All tiers, in the order their requirement sources are validated.
    pub fn all() -> [EnvTier; 3] {
        [EnvTier::Local, EnvTier::Staging, EnvTier::Production]
    }
}

impl fmt::Display for EnvTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(EnvTier::Local),
            "staging" => Ok(EnvTier::Staging),
            "production" => Ok(EnvTier::Production),
            other => Err(format!(
                "unknown environment tier '{other}'; expected: local, staging, production"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// A named notification recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub address: String,
}

impl Recipient {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for Recipient {
    /// RFC 5322 mailbox form: `"Jane Doe" <jane@example.edu>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" <{}>", self.name, self.address)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_roundtrips_through_str() {
        for tier in EnvTier::all() {
            assert_eq!(tier.as_str().parse::<EnvTier>().unwrap(), tier);
        }
    }

    #[test]
    fn tier_parse_is_case_insensitive() {
        assert_eq!("Staging".parse::<EnvTier>().unwrap(), EnvTier::Staging);
        assert!("prod".parse::<EnvTier>().is_err());
    }

    #[test]
    fn recipient_display_is_mailbox_form() {
        let r = Recipient::new("Jane Doe", "jane@example.edu");
        assert_eq!(r.to_string(), "\"Jane Doe\" <jane@example.edu>");
    }
}
