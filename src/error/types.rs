//! Client error types

use thiserror::Error;

/// Errors surfaced by the client to its callers.
///
/// Transport and rate-limit failures are retried inside the executor and only
/// reach the caller once the attempt budget is spent. API and protocol errors
/// are returned on first occurrence.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Rate limited (status {status}): {code} - {message}")]
    RateLimited {
        status: u16,
        code: String,
        message: String,
    },

    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rejected locally, before anything was signed or sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClientError {
    /// Whether the executor may spend another attempt on this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::RateLimited { .. })
    }

    /// The provider error code, if this is an API rejection
    pub fn api_code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Failures that happen before a response is delivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("too many redirects: {0}")]
    TooManyRedirects(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Classify a reqwest failure; `timeout` is the limit the client was built with
    pub fn from_reqwest(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_redirect() {
            TransportError::TooManyRedirects(message)
        } else if err.is_builder() {
            TransportError::InvalidUrl(message)
        } else {
            TransportError::Request(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::Transport(TransportError::Connect("refused".into())).is_retryable());
        assert!(ClientError::RateLimited {
            status: 429,
            code: "429".into(),
            message: "Too Many Requests".into(),
        }
        .is_retryable());

        assert!(!ClientError::Api {
            code: "105".into(),
            message: "insufficient funds".into(),
        }
        .is_retryable());
        assert!(!ClientError::Protocol("bad envelope".into()).is_retryable());
        assert!(!ClientError::Signing("empty key".into()).is_retryable());
        assert!(!ClientError::Configuration("empty pool".into()).is_retryable());
    }

    #[test]
    fn test_api_code() {
        let err = ClientError::Api {
            code: "105".into(),
            message: "insufficient funds".into(),
        };
        assert_eq!(err.api_code(), Some("105"));
        assert_eq!(ClientError::Protocol("x".into()).api_code(), None);
    }

    #[test]
    fn test_display_messages() {
        let err = ClientError::from(TransportError::Timeout(Duration::from_secs(2)));
        assert_eq!(err.to_string(), "Transport error: request timed out after 2s");

        let err = ClientError::Api {
            code: "0201".into(),
            message: "Invalid Nonce".into(),
        };
        assert_eq!(err.to_string(), "API error: 0201 - Invalid Nonce");
    }
}
