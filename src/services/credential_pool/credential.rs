//! Credential types
//!
//! A credential is an API key plus its signing secret. Credentials are
//! immutable once loaded; inside a pool they are identified by position.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Credential
// ============================================================================

/// API key and secret pair used to sign requests
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key: String,
    secret: String,
}

impl Credential {
    /// Create a new credential
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Get the API key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the signing secret
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Short, log-safe form of the key (first four characters)
    pub fn key_hint(&self) -> String {
        let prefix: String = self.key.chars().take(4).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Configuration Structures (for deserialization)
// ============================================================================

/// A single key/secret entry as written in the credential file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    pub key: String,
    pub secret: String,
}

/// A user's credentials: either one object or a list of them
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CredentialEntry {
    Single(CredentialConfig),
    Many(Vec<CredentialConfig>),
}

impl CredentialEntry {
    /// Normalize into an ordered list of credentials
    pub fn into_credentials(self) -> Vec<Credential> {
        match self {
            CredentialEntry::Single(config) => vec![config.into()],
            CredentialEntry::Many(configs) => configs.into_iter().map(Credential::from).collect(),
        }
    }

    /// Number of credentials in this entry
    pub fn len(&self) -> usize {
        match self {
            CredentialEntry::Single(_) => 1,
            CredentialEntry::Many(configs) => configs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<CredentialConfig> for Credential {
    fn from(config: CredentialConfig) -> Self {
        Credential::new(config.key, config.secret)
    }
}

// ============================================================================
// Tests
// ============================================================================
