//! Error types

mod types;

pub use types::{ClientError, TransportError};

/// Result alias used throughout the client
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
