//! Configuration management module
//!
//! This module handles loading and validating client configuration
//! from environment variables, .env files and the JSON credential file.

pub mod credentials;
pub mod settings;

pub use credentials::{ClientProfile, CredentialsFile, EnvironmentConfig, CONFIG_TEMPLATE_NAME};
pub use settings::Settings;
