//! Durable key-value backends shared by the conversation store and the rate
//! limiter.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub mod file;
pub mod memory;

pub use file::{FileBackend, FileBackendConfig};
pub use memory::MemoryBackend;

/// Writes between opportunistic sweeps of expired keys.
///
/// Rate-limit windows create a fresh key each window and never read the old
/// one again, so lazy expiry alone would let dead keys accumulate.
pub const SWEEP_INTERVAL_WRITES: usize = 256;

/// Minimal Redis-like key-value surface.
///
/// Counters created by [`increment`](KeyValueBackend::increment) start at 1
/// with no expiry; callers attach one with [`expire`](KeyValueBackend::expire).
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Value stored at `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Atomically increment the integer at `key` and return the new value.
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Set the expiry of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
}

pub(crate) fn parse_counter(key: &str, raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            crate::error::CadenceError::Backend(format!("value at '{key}' is not an integer"))
        })
}
