//! Credential Pool Implementation
//!
//! This module provides the `CredentialPool` that holds the configured
//! credentials and the rotation cursor shared by every request attempt.

use super::credential::Credential;
use crate::error::ClientError;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

// ============================================================================
// Pool Configuration
// ============================================================================

/// Configuration for credential pool behavior
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Whether the cursor may advance to the next credential
    pub rotation_enabled: bool,
    /// Shuffle multiple credentials once at construction
    pub shuffle: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rotation_enabled: false,
            shuffle: true,
        }
    }
}

impl PoolConfig {
    pub fn new(rotation_enabled: bool) -> Self {
        Self {
            rotation_enabled,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, enabled: bool) -> Self {
        self.rotation_enabled = enabled;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }
}

// ============================================================================
// Credential Pool
// ============================================================================

/// An ordered, non-empty set of credentials with a rotation cursor.
///
/// The cursor always satisfies `0 <= index < len`. It is only moved by
/// [`CredentialPool::rotate`], which uses a compare-and-swap loop so that
/// concurrent rotations never cancel each other out.
#[derive(Debug)]
pub struct CredentialPool {
    /// The credentials in the pool
    credentials: Vec<Credential>,
    /// Whether rotation is allowed
    rotation_enabled: bool,
    /// Index of the current credential
    cursor: AtomicUsize,
    /// Number of successful rotations since construction
    rotations: AtomicU64,
}

impl CredentialPool {
    /// Create a new credential pool
    ///
    /// Fails when the pool is empty, or when several credentials are supplied
    /// without rotation being enabled.
    pub fn new(mut credentials: Vec<Credential>, config: PoolConfig) -> Result<Self, ClientError> {
        if credentials.is_empty() {
            return Err(ClientError::Configuration(
                "credential pool requires at least one credential".to_string(),
            ));
        }

        if credentials.len() > 1 && !config.rotation_enabled {
            return Err(ClientError::Configuration(format!(
                "{} credentials configured but rotation is disabled",
                credentials.len()
            )));
        }

        if let Some(empty) = credentials
            .iter()
            .position(|c| c.key().is_empty() || c.secret().is_empty())
        {
            return Err(ClientError::Configuration(format!(
                "credential #{} has an empty key or secret",
                empty + 1
            )));
        }

        if config.shuffle && credentials.len() > 1 {
            credentials.shuffle(&mut rand::thread_rng());
        }

        Ok(Self {
            credentials,
            rotation_enabled: config.rotation_enabled,
            cursor: AtomicUsize::new(0),
            rotations: AtomicU64::new(0),
        })
    }

    /// Create a pool with a single credential and rotation disabled
    pub fn single(credential: Credential) -> Result<Self, ClientError> {
        Self::new(vec![credential], PoolConfig::default())
    }

    /// Create a rotating pool that keeps the given ordering
    pub fn ordered(credentials: Vec<Credential>) -> Result<Self, ClientError> {
        Self::new(credentials, PoolConfig::new(true).with_shuffle(false))
    }

    /// Get the current credential
    pub fn current(&self) -> &Credential {
        self.current_with_index().1
    }

    /// Get the current credential together with its position
    pub fn current_with_index(&self) -> (usize, &Credential) {
        let idx = self.cursor.load(Ordering::SeqCst);
        (idx, &self.credentials[idx])
    }

    /// Position of the current credential
    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Advance to the next credential.
    ///
    /// Returns the new index, or `None` if the pool cannot rotate.
    pub fn rotate(&self) -> Option<usize> {
        if !self.can_rotate() {
            return None;
        }

        let len = self.credentials.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |idx| Some((idx + 1) % len))
            .unwrap_or_else(|idx| idx);
        self.rotations.fetch_add(1, Ordering::SeqCst);

        Some((previous + 1) % len)
    }

    /// Whether `rotate` would move the cursor
    pub fn can_rotate(&self) -> bool {
        self.rotation_enabled && self.credentials.len() > 1
    }

    pub fn rotation_enabled(&self) -> bool {
        self.rotation_enabled
    }

    /// Get the number of credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; a pool is non-empty by construction
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total: self.credentials.len(),
            current_index: self.current_index(),
            rotations: self.rotations.load(Ordering::SeqCst),
            rotation_enabled: self.rotation_enabled,
        }
    }
}

// ============================================================================
// Pool Statistics
// ============================================================================

/// Statistics about a credential pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Total number of credentials
    pub total: usize,
    /// Index of the credential currently in use
    pub current_index: usize,
    /// Rotations performed since construction
    pub rotations: u64,
    /// Whether rotation is enabled
    pub rotation_enabled: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_test_credentials() -> Vec<Credential> {
        vec![
            Credential::new("key1", "secret1"),
            Credential::new("key2", "secret2"),
            Credential::new("key3", "secret3"),
        ]
    }

    #[test]
    fn test_single_credential_pool() {
        let pool = CredentialPool::single(Credential::new("only", "secret")).unwrap();

        assert_eq!(pool.len(), 1);
        assert!(!pool.is_empty());
        assert_eq!(pool.current().key(), "only");
        assert!(!pool.can_rotate());
        assert_eq!(pool.rotate(), None);
        assert_eq!(pool.current_index(), 0);
    }

    #[test]
    fn test_empty_pool_rejected() {
        let result = CredentialPool::new(vec![], PoolConfig::new(true));
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_multiple_credentials_require_rotation() {
        let result = CredentialPool::new(create_test_credentials(), PoolConfig::new(false));
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        let pool = CredentialPool::new(create_test_credentials(), PoolConfig::new(true)).unwrap();
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_key_or_secret_rejected() {
        let result = CredentialPool::single(Credential::new("", "secret"));
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        let result = CredentialPool::single(Credential::new("key", ""));
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_rotation_enabled_single_credential_is_noop() {
        let pool =
            CredentialPool::new(vec![Credential::new("k", "s")], PoolConfig::new(true)).unwrap();
        assert!(pool.rotation_enabled());
        assert_eq!(pool.rotate(), None);
        assert_eq!(pool.current_index(), 0);
        assert_eq!(pool.stats().rotations, 0);
    }

    #[test]
    fn test_round_robin_rotation() {
        let pool = CredentialPool::ordered(create_test_credentials()).unwrap();

        assert_eq!(pool.current().key(), "key1");
        assert_eq!(pool.rotate(), Some(1));
        assert_eq!(pool.current().key(), "key2");
        assert_eq!(pool.rotate(), Some(2));
        assert_eq!(pool.current().key(), "key3");
        assert_eq!(pool.rotate(), Some(0));
        assert_eq!(pool.current().key(), "key1");
    }

    #[test]
    fn test_shuffle_keeps_all_credentials() {
        let pool = CredentialPool::new(create_test_credentials(), PoolConfig::new(true)).unwrap();

        let keys: HashSet<String> = (0..pool.len())
            .map(|_| {
                let key = pool.current().key().to_string();
                pool.rotate();
                key
            })
            .collect();

        assert_eq!(keys.len(), 3);
        assert!(keys.contains("key1"));
        assert!(keys.contains("key2"));
        assert!(keys.contains("key3"));
    }

    #[test]
    fn test_concurrent_rotations_compose() {
        let pool = CredentialPool::ordered(create_test_credentials()).unwrap();
        let start = pool.current_index();

        let threads = 8;
        let per_thread = 125;
        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    for _ in 0..per_thread {
                        pool.rotate();
                        assert!(pool.current_index() < pool.len());
                    }
                });
            }
        });

        let total = threads * per_thread;
        assert_eq!(pool.current_index(), (start + total) % pool.len());
        assert_eq!(pool.stats().rotations, total as u64);
    }

    #[test]
    fn test_pool_stats() {
        let pool = CredentialPool::ordered(create_test_credentials()).unwrap();
        pool.rotate();

        let stats = pool.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.current_index, 1);
        assert_eq!(stats.rotations, 1);
        assert!(stats.rotation_enabled);
    }
}
