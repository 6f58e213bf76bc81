//! Application settings and configuration
//!
//! This module provides configuration management for the client,
//! loading settings from environment variables with sensible defaults.

use crate::config::credentials::ClientProfile;
use crate::error::ClientError;
use crate::services::{
    BitsoClient, ClientBuilder, CredentialPool, PoolConfig, DEFAULT_AUTH_SCHEME,
    DEFAULT_USER_AGENT,
};
use crate::utils::{RetryPolicy, TimeoutConfig, DEFAULT_MAX_ATTEMPTS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // Target
    /// Environment name as listed in the credential file (e.g. "stage")
    pub environment: String,
    /// Identity whose credentials sign requests
    pub user: Option<String>,
    /// Path to the credential file
    pub config_path: PathBuf,

    // Logging
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,

    // Resilience
    /// Allow switching keys when one is rate limited
    pub rotation_enabled: bool,
    /// Attempts per logical request, including the first
    pub max_attempts: u32,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,

    // Request identity
    pub user_agent: String,
    pub auth_scheme: String,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let settings = Self {
            environment: env_or_default("BITSO_ENV", "stage"),
            user: env::var("BITSO_USER").ok().filter(|u| !u.is_empty()),
            config_path: PathBuf::from(env_or_default("BITSO_CONFIG", "config.json")),

            log_level: env_or_default("LOG_LEVEL", "info"),
            json_logs: env_or_default("LOG_JSON", "false")
                .parse()
                .context("Invalid LOG_JSON value")?,

            rotation_enabled: env_or_default("BITSO_ROTATION", "false")
                .parse()
                .context("Invalid BITSO_ROTATION value")?,
            max_attempts: env_or_default("BITSO_MAX_ATTEMPTS", &DEFAULT_MAX_ATTEMPTS.to_string())
                .parse()
                .context("Invalid BITSO_MAX_ATTEMPTS value")?,
            request_timeout_seconds: env_or_default("BITSO_TIMEOUT_SECS", "30")
                .parse()
                .context("Invalid BITSO_TIMEOUT_SECS value")?,
            connect_timeout_seconds: env_or_default("BITSO_CONNECT_TIMEOUT_SECS", "10")
                .parse()
                .context("Invalid BITSO_CONNECT_TIMEOUT_SECS value")?,

            user_agent: env_or_default("BITSO_USER_AGENT", DEFAULT_USER_AGENT),
            auth_scheme: env_or_default("BITSO_AUTH_SCHEME", DEFAULT_AUTH_SCHEME),
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.environment.trim().is_empty() {
            anyhow::bail!("Environment name cannot be empty");
        }

        if self.request_timeout_seconds == 0 {
            anyhow::bail!("Request timeout must be > 0");
        }

        if self.user_agent.trim().is_empty() {
            anyhow::bail!("User agent cannot be empty");
        }

        if self.auth_scheme.trim().is_empty() || self.auth_scheme.contains(' ') {
            anyhow::bail!("Auth scheme must be a single non-empty word");
        }

        Ok(())
    }

    /// Settings that are accepted but probably not what the operator meant.
    /// Returned rather than logged so callers can report them once tracing
    /// is initialized.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_attempts == 0 {
            warnings.push("max_attempts is 0; every request still makes one attempt".to_string());
        }

        if self.connect_timeout_seconds > self.request_timeout_seconds {
            warnings.push(format!(
                "connect timeout ({}s) exceeds request timeout ({}s)",
                self.connect_timeout_seconds, self.request_timeout_seconds
            ));
        }

        warnings
    }

    /// Per-attempt and connect timeouts
    pub fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig::new()
            .with_request_timeout(Duration::from_secs(self.request_timeout_seconds))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_seconds))
    }

    /// Retry policy derived from `max_attempts`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new().with_max_attempts(self.max_attempts)
    }

    /// Build a client builder for the given profile
    pub fn client_builder(&self, profile: ClientProfile) -> Result<ClientBuilder, ClientError> {
        let pool = CredentialPool::new(
            profile.credentials,
            PoolConfig::new(self.rotation_enabled),
        )?;

        Ok(BitsoClient::builder(profile.base_url, pool)
            .with_retry_policy(self.retry_policy())
            .with_timeouts(self.timeouts())
            .with_user_agent(self.user_agent.clone())
            .with_auth_scheme(self.auth_scheme.clone()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "stage".to_string(),
            user: None,
            config_path: PathBuf::from("config.json"),
            log_level: "info".to_string(),
            json_logs: false,
            rotation_enabled: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout_seconds: 30,
            connect_timeout_seconds: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
