//! Utility modules
//!
//! Contains the retry policy and timeout handling.

pub mod retry;
pub mod timeout;

pub use retry::{presets, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use timeout::{with_timeout, TimeoutConfig, TimeoutError};
