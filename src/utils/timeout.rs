//! Timeout utilities for request handling
//!
//! Every request attempt runs under a fixed timeout. Expiry is reported as a
//! transport failure by the executor.

use std::time::Duration;

/// Timeout configuration for HTTP requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Limit for one request attempt, send through body read (default: 30s)
    pub request_timeout: Duration,

    /// Connection timeout for the HTTP client (default: 10s)
    pub connect_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set per-attempt request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Apply timeout to an async operation
pub async fn with_timeout<T, E>(
    timeout: Duration,
    future: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, TimeoutError<E>> {
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TimeoutError::Inner(err)),
        Err(_) => Err(TimeoutError::Timeout(timeout)),
    }
}

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E> {
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Inner(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TimeoutConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder() {
        let config = TimeoutConfig::new()
            .with_request_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2));

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result: Result<i32, TimeoutError<String>> =
            with_timeout(Duration::from_secs(1), async { Ok::<_, String>(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_inner_error() {
        let result: Result<i32, TimeoutError<String>> = with_timeout(
            Duration::from_secs(1),
            async { Err::<i32, _>("connection refused".to_string()) },
        )
        .await;

        match result {
            Err(TimeoutError::Inner(msg)) => assert_eq!(msg, "connection refused"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_timeout_timeout() {
        let result: Result<i32, TimeoutError<String>> =
            with_timeout(Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, String>(42)
            })
            .await;

        assert!(matches!(
            result,
            Err(TimeoutError::Timeout(limit)) if limit == Duration::from_millis(10)
        ));
    }
}
