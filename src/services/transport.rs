//! HTTP transport
//!
//! The executor talks to the network only through the [`Transport`] trait so
//! the retry and rotation logic can run against scripted responses in tests.

use crate::error::{ClientError, TransportError};
use crate::services::signer::{AuthToken, HttpMethod};
use crate::utils::TimeoutConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Client identifier sent as `User-Agent`
pub const DEFAULT_USER_AGENT: &str = concat!("bitso-rest-client/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Request / Response
// ============================================================================

/// A fully signed request, built fresh for every attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    /// Path plus query string, starting with `/`
    pub path: String,
    /// Exact bytes that were signed; empty when there is no body
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl SignedRequest {
    pub fn new(
        method: HttpMethod,
        path: impl Into<String>,
        body: Vec<u8>,
        token: &AuthToken,
        user_agent: &str,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            headers: vec![
                ("Authorization".to_string(), token.header_value()),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), user_agent.to_string()),
            ],
        }
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a delivered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body as text, lossy, for diagnostics
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends signed requests to the API
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &SignedRequest) -> Result<RawResponse, TransportError>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

/// Transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` (scheme and host, no trailing path)
    pub fn new(base_url: impl Into<String>, timeouts: &TimeoutConfig) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeouts.request_timeout)
            .connect_timeout(timeouts.connect_timeout)
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout: timeouts.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &SignedRequest) -> Result<RawResponse, TransportError> {
        let url = self.url(&request.path);

        let mut builder = self.client.request(request.method.into(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, self.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(e, self.timeout))?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}
