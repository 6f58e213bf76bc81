//! Resilient request executor
//!
//! [`BitsoClient`] runs one logical request as a bounded sequence of
//! attempts. Each attempt signs with the pool's current credential, sends,
//! and then either finishes (payload, API error, protocol error) or records
//! a retryable failure (transport error, rate limit), rotating credentials
//! when the pool allows it.

use crate::error::{ClientError, TransportError};
use crate::schemas::Envelope;
use crate::services::credential_pool::{CredentialPool, PoolStats};
use crate::services::rate_limit::{RateLimitClassifier, RateLimitRules};
use crate::services::signer::{HttpMethod, Signer, DEFAULT_AUTH_SCHEME};
use crate::services::transport::{
    RawResponse, ReqwestTransport, SignedRequest, Transport, DEFAULT_USER_AGENT,
};
use crate::utils::{with_timeout, RetryPolicy, TimeoutConfig, TimeoutError};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Cap on how much of a malformed response body is logged
const MAX_LOGGED_BODY_CHARS: usize = 512;

// ============================================================================
// Attempt Records
// ============================================================================

/// How a single attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    ApiError,
    ProtocolError,
    TransportFailure,
    RateLimited,
}

/// One attempt inside an `execute` call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    /// Pool position of the credential that signed this attempt
    pub credential_index: usize,
    pub outcome: AttemptOutcome,
    /// Whether the pool was rotated after this attempt
    pub rotated: bool,
}

/// Result of an `execute` call together with its attempt history
#[derive(Debug)]
pub struct ExecutionReport {
    pub result: Result<Value, ClientError>,
    pub attempts: Vec<RetryAttempt>,
    /// Total time spent sleeping between attempts
    pub total_delay: Duration,
}

impl ExecutionReport {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn rotations(&self) -> usize {
        self.attempts.iter().filter(|a| a.rotated).count()
    }
}

// ============================================================================
// Client Builder
// ============================================================================

/// Builder for [`BitsoClient`]
pub struct ClientBuilder {
    base_url: String,
    pool: CredentialPool,
    transport: Option<Arc<dyn Transport>>,
    retry: RetryPolicy,
    timeouts: TimeoutConfig,
    rules: RateLimitRules,
    user_agent: String,
    auth_scheme: String,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>, pool: CredentialPool) -> Self {
        Self {
            base_url: base_url.into(),
            pool,
            transport: None,
            retry: RetryPolicy::default(),
            timeouts: TimeoutConfig::default(),
            rules: RateLimitRules::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
        }
    }

    /// Use a custom transport instead of the reqwest-backed default
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_rate_limit_rules(mut self, rules: RateLimitRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = scheme.into();
        self
    }

    pub fn build(self) -> Result<BitsoClient, ClientError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.base_url, &self.timeouts)?),
        };

        tracing::info!(
            base_url = %self.base_url,
            credentials = self.pool.len(),
            rotation = self.pool.rotation_enabled(),
            max_attempts = self.retry.effective_attempts(),
            "Initialized Bitso client"
        );

        Ok(BitsoClient {
            inner: Arc::new(ClientInner {
                base_url: self.base_url,
                transport,
                pool: self.pool,
                signer: Signer::new(self.auth_scheme),
                classifier: RateLimitClassifier::new(self.rules),
                retry: self.retry,
                request_timeout: self.timeouts.request_timeout,
                user_agent: self.user_agent,
            }),
        })
    }
}

// ============================================================================
// Client
// ============================================================================

struct ClientInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    pool: CredentialPool,
    signer: Signer,
    classifier: RateLimitClassifier,
    retry: RetryPolicy,
    request_timeout: Duration,
    user_agent: String,
}

/// Authenticated, retrying client for the Bitso REST API.
///
/// Cheap to clone; clones share the credential pool and nonce source, so one
/// client can serve many concurrent tasks.
#[derive(Clone)]
pub struct BitsoClient {
    inner: Arc<ClientInner>,
}

impl BitsoClient {
    pub fn builder(base_url: impl Into<String>, pool: CredentialPool) -> ClientBuilder {
        ClientBuilder::new(base_url, pool)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Attempt budget used by `get`, `post` and `put`
    pub fn max_attempts(&self) -> u32 {
        self.inner.retry.effective_attempts()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.inner.pool.stats()
    }

    /// Signed GET with the configured attempt budget
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.execute(HttpMethod::Get, path, None, self.max_attempts())
            .await
    }

    /// Signed POST with a JSON body
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ClientError> {
        let body = to_json(body)?;
        self.execute(HttpMethod::Post, path, Some(&body), self.max_attempts())
            .await
    }

    /// Signed PUT, optionally with a JSON body
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ClientError> {
        let body = body.map(to_json).transpose()?;
        self.execute(HttpMethod::Put, path, body.as_ref(), self.max_attempts())
            .await
    }

    /// Run one logical request with an explicit attempt budget.
    ///
    /// `max_attempts == 0` still makes one attempt.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        max_attempts: u32,
    ) -> Result<Value, ClientError> {
        self.execute_traced(method, path, body, max_attempts)
            .await
            .result
    }

    /// Like [`BitsoClient::execute`], also returning the attempt history
    pub async fn execute_traced(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        max_attempts: u32,
    ) -> ExecutionReport {
        let mut report = ExecutionReport {
            result: Err(ClientError::Configuration("no attempt was made".to_string())),
            attempts: Vec::new(),
            total_delay: Duration::ZERO,
        };

        let body = match body.map(serde_json::to_vec).transpose() {
            Ok(bytes) => bytes.unwrap_or_default(),
            Err(e) => {
                report.result = Err(ClientError::Signing(format!(
                    "failed to serialize request body: {e}"
                )));
                return report;
            }
        };

        let inner = &self.inner;
        let attempts = max_attempts.max(1);
        let mut last_error: Option<ClientError> = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = inner.retry.calculate_delay(attempt - 2);
                if !delay.is_zero() {
                    report.total_delay += delay;
                    sleep(delay).await;
                }
            }

            let has_more = attempt < attempts;
            let (credential_index, credential) = inner.pool.current_with_index();

            let token = match inner.signer.sign(
                credential.key(),
                credential.secret(),
                method,
                path,
                &body,
            ) {
                Ok(token) => token,
                Err(e) => {
                    report.result = Err(e);
                    return report;
                }
            };
            let request =
                SignedRequest::new(method, path, body.clone(), &token, &inner.user_agent);

            tracing::debug!(
                attempt,
                max_attempts = attempts,
                credential_index,
                key = %credential.key_hint(),
                method = %method,
                path = %path,
                "Sending request"
            );

            let sent = with_timeout(inner.request_timeout, inner.transport.send(&request)).await;

            let (outcome, error) = match sent {
                Err(err) => {
                    let err = match err {
                        TimeoutError::Timeout(limit) => TransportError::Timeout(limit),
                        TimeoutError::Inner(err) => err,
                    };
                    tracing::warn!(
                        attempt,
                        credential_index,
                        path = %path,
                        error = %err,
                        "Transport failure"
                    );
                    (AttemptOutcome::TransportFailure, ClientError::Transport(err))
                }
                Ok(response) => match inner
                    .classifier
                    .detect(response.status, Some(response.body.as_slice()))
                {
                    Some(signal) => {
                        tracing::warn!(
                            attempt,
                            credential_index,
                            status = signal.status,
                            code = %signal.code,
                            path = %path,
                            "Rate limited"
                        );
                        (
                            AttemptOutcome::RateLimited,
                            ClientError::RateLimited {
                                status: signal.status,
                                code: signal.code,
                                message: signal.message,
                            },
                        )
                    }
                    None => {
                        let (outcome, result) = finish(&response);
                        tracing::debug!(
                            attempt,
                            credential_index,
                            status = response.status,
                            outcome = ?outcome,
                            "Request completed"
                        );
                        report.attempts.push(RetryAttempt {
                            attempt,
                            credential_index,
                            outcome,
                            rotated: false,
                        });
                        report.result = result;
                        return report;
                    }
                },
            };

            let rotated = has_more && self.rotate_credential(credential_index);
            report.attempts.push(RetryAttempt {
                attempt,
                credential_index,
                outcome,
                rotated,
            });
            last_error = Some(error);
        }

        if let Some(err) = last_error {
            tracing::warn!(attempts, path = %path, error = %err, "Attempt budget exhausted");
            report.result = Err(err);
        }
        report
    }

    /// Advance the pool after a retryable failure; true if it moved
    fn rotate_credential(&self, from_index: usize) -> bool {
        match self.inner.pool.rotate() {
            Some(to_index) => {
                tracing::warn!(
                    from = from_index,
                    to = to_index,
                    pool_size = self.inner.pool.len(),
                    "Rotated API credential"
                );
                true
            }
            None => false,
        }
    }
}

/// Interpret a delivered, non-throttled response
fn finish(response: &RawResponse) -> (AttemptOutcome, Result<Value, ClientError>) {
    match Envelope::parse(&response.body) {
        Ok(envelope) => {
            let outcome = if envelope.is_success() {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::ApiError
            };
            (outcome, envelope.into_result())
        }
        Err(e) => {
            let body: String = response.text().chars().take(MAX_LOGGED_BODY_CHARS).collect();
            tracing::debug!(
                status = response.status,
                body = %body,
                "Response is not a valid envelope"
            );
            (
                AttemptOutcome::ProtocolError,
                Err(ClientError::Protocol(format!("HTTP {}: {}", response.status, e))),
            )
        }
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body)
        .map_err(|e| ClientError::Signing(format!("failed to serialize request body: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
