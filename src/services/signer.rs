//! HMAC-SHA256 request signing
//!
//! Every request carries an `Authorization` header of the form
//! `<scheme> <key>:<nonce>:<signature>`, where the signature is the
//! lowercase hex HMAC-SHA256 of `nonce ++ method ++ path ++ body` keyed by
//! the credential secret.

use crate::error::ClientError;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

type HmacSha256 = Hmac<Sha256>;

/// Default authorization scheme name
pub const DEFAULT_AUTH_SCHEME: &str = "Bitso";

// ============================================================================
// HTTP Method
// ============================================================================

/// Methods the API accepts for signed requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

// ============================================================================
// Nonce Source
// ============================================================================

/// Strictly increasing millisecond nonces.
///
/// Uses the wall clock when it has moved past the last issued nonce, and
/// `last + 1` otherwise (same millisecond, or the clock stepped backwards).
#[derive(Debug, Default)]
pub struct NonceSource {
    last: AtomicU64,
}

impl NonceSource {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Issue the next nonce
    pub fn next(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    /// Last nonce handed out, 0 if none yet
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Auth Token
// ============================================================================

/// The value of the `Authorization` header for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub scheme: String,
    pub key: String,
    pub nonce: u64,
    pub signature: String,
}

impl AuthToken {
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}:{}", self.scheme, self.key, self.nonce, self.signature)
    }
}

// ============================================================================
// Signer
// ============================================================================

/// Builds authorization tokens.
///
/// One signer is shared by all requests of a client so that nonces stay
/// monotonic across credentials and concurrent calls.
#[derive(Debug)]
pub struct Signer {
    scheme: String,
    nonces: NonceSource,
}

impl Default for Signer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_SCHEME)
    }
}

impl Signer {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            nonces: NonceSource::new(),
        }
    }

    /// Sign a request with a freshly issued nonce
    pub fn sign(
        &self,
        key: &str,
        secret: &str,
        method: HttpMethod,
        path: &str,
        body: &[u8],
    ) -> Result<AuthToken, ClientError> {
        validate_inputs(key, secret, path)?;
        let nonce = self.nonces.next();
        self.sign_with_nonce(key, secret, method, path, body, nonce)
    }

    /// Sign a request with an explicit nonce
    pub fn sign_with_nonce(
        &self,
        key: &str,
        secret: &str,
        method: HttpMethod,
        path: &str,
        body: &[u8],
        nonce: u64,
    ) -> Result<AuthToken, ClientError> {
        validate_inputs(key, secret, path)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ClientError::Signing(format!("invalid secret: {e}")))?;
        mac.update(nonce.to_string().as_bytes());
        mac.update(method.as_str().as_bytes());
        mac.update(path.as_bytes());
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(AuthToken {
            scheme: self.scheme.clone(),
            key: key.to_string(),
            nonce,
            signature,
        })
    }
}

fn validate_inputs(key: &str, secret: &str, path: &str) -> Result<(), ClientError> {
    if key.is_empty() {
        return Err(ClientError::Signing("API key is empty".to_string()));
    }
    if secret.is_empty() {
        return Err(ClientError::Signing("API secret is empty".to_string()));
    }
    if !path.starts_with('/') {
        return Err(ClientError::Signing(format!(
            "request path must start with '/': {path}"
        )));
    }
    if let Some(c) = path.chars().find(|c| !is_wire_safe(*c)) {
        return Err(ClientError::Signing(format!(
            "request path contains {c:?}, which would be re-encoded in transit: {path}"
        )));
    }
    let route = path.split('?').next().unwrap_or(path);
    if route.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(ClientError::Signing(format!(
            "request path contains dot segments: {path}"
        )));
    }
    Ok(())
}

/// Characters the URL parser leaves untouched in both path and query.
/// Anything else would be percent-encoded on the wire and no longer match
/// the signed message.
fn is_wire_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '/' | '-' | '.' | '_' | '~' | '?' | '&' | '=' | '%' | ':' | ',' | '@' | '!' | '$'
                | '(' | ')' | '*' | '+' | ';'
        )
}
