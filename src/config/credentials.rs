//! Credential file loading
//!
//! Reads the JSON credential file (`config.json` by default) that maps
//! environments to a base URL and per-user API keys:
//!
//! ```json
//! {
//!   "environments": {
//!     "stage": {
//!       "base_url": "https://stage.bitso.com",
//!       "users": {
//!         "28": { "key": "...", "secret": "..." },
//!         "41": [{ "key": "...", "secret": "..." }, { "key": "...", "secret": "..." }]
//!       }
//!     }
//!   }
//! }
//! ```

use crate::error::ClientError;
use crate::services::{Credential, CredentialEntry};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Template users are pointed at when the credential file is missing
pub const CONFIG_TEMPLATE_NAME: &str = "config.template.json";

// ============================================================================
// File Layout
// ============================================================================

/// Parsed credential file
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsFile {
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

/// One environment: where it lives and who may call it
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub base_url: String,
    #[serde(default)]
    pub users: HashMap<String, CredentialEntry>,
}

/// Everything needed to build a client for one identity
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub base_url: String,
    pub credentials: Vec<Credential>,
}

impl CredentialsFile {
    /// Load and parse the credential file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!(
                "{} not found. Copy {} to {} and fill in your API keys",
                path.display(),
                CONFIG_TEMPLATE_NAME,
                path.display()
            );
        }

        let raw = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json))
            .build()
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let file: Self = raw
            .try_deserialize()
            .with_context(|| format!("Invalid credential file {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            environments = file.environments.len(),
            "Loaded credential file"
        );

        Ok(file)
    }

    /// Look up an environment by name, ignoring ASCII case
    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        get_ignore_case(&self.environments, name)
    }

    /// Names of all configured environments, sorted
    pub fn environment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.environments.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the base URL and credentials for `environment` / `user`
    pub fn profile(&self, environment: &str, user: &str) -> Result<ClientProfile, ClientError> {
        let env = self.environment(environment).ok_or_else(|| {
            ClientError::Configuration(format!(
                "environment '{}' not found (available: {})",
                environment,
                self.environment_names().join(", ")
            ))
        })?;

        if env.base_url.trim().is_empty() {
            return Err(ClientError::Configuration(format!(
                "environment '{environment}' has no base_url"
            )));
        }

        let entry = env.user(user).ok_or_else(|| {
            ClientError::Configuration(format!(
                "user '{user}' not found in environment '{environment}'"
            ))
        })?;

        if entry.is_empty() {
            return Err(ClientError::Configuration(format!(
                "user '{user}' in environment '{environment}' has no credentials"
            )));
        }

        Ok(ClientProfile {
            base_url: env.base_url.clone(),
            credentials: entry.clone().into_credentials(),
        })
    }
}

impl EnvironmentConfig {
    /// Look up a user's credentials, ignoring ASCII case
    pub fn user(&self, id: &str) -> Option<&CredentialEntry> {
        get_ignore_case(&self.users, id)
    }
}

/// Map keys pass through the `config` crate, which may lowercase them
fn get_ignore_case<'a, V>(map: &'a HashMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
