//! Services module
//!
//! The transport/auth/resilience core: signing, the credential pool,
//! rate-limit detection, the HTTP transport and the retrying executor.

pub mod credential_pool;
pub mod executor;
pub mod rate_limit;
pub mod signer;
pub mod transport;

pub use credential_pool::{
    Credential, CredentialConfig, CredentialEntry, CredentialPool, PoolConfig, PoolStats,
};
pub use executor::{AttemptOutcome, BitsoClient, ClientBuilder, ExecutionReport, RetryAttempt};
pub use rate_limit::{RateLimitClassifier, RateLimitRules, RateLimitSignal};
pub use signer::{AuthToken, HttpMethod, NonceSource, Signer, DEFAULT_AUTH_SCHEME};
pub use transport::{RawResponse, ReqwestTransport, SignedRequest, Transport, DEFAULT_USER_AGENT};
