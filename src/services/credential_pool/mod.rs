//! Credential Pool Module
//!
//! Holds one or more key/secret pairs and the cursor that selects which one
//! signs the next request. The cursor is shared by every concurrent request
//! against a client and is advanced when a key gets rate limited.
//!
//! # Example
//! ```ignore
//! use credential_pool::{Credential, CredentialPool, PoolConfig};
//!
//! let creds = vec![
//!     Credential::new("key1", "secret1"),
//!     Credential::new("key2", "secret2"),
//! ];
//!
//! let pool = CredentialPool::new(creds, PoolConfig::new(true))?;
//! let current = pool.current();
//! pool.rotate();
//! ```

mod credential;
mod pool;

pub use credential::{Credential, CredentialConfig, CredentialEntry};
pub use pool::{CredentialPool, PoolConfig, PoolStats};
