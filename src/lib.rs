//! Bitso REST client library
//!
//! Signed, resilient access to the Bitso REST API: HMAC request signing with
//! a monotonic nonce, a rotating credential pool, rate-limit detection and a
//! retrying executor, plus thin wrappers for the individual endpoints.

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod schemas;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::{ClientError, TransportError};
pub use schemas::Envelope;
pub use services::{BitsoClient, ClientBuilder, Credential, CredentialPool, HttpMethod, Signer};
