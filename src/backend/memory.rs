//! In-process backend for tests and single-node deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{parse_counter, KeyValueBackend, SWEEP_INTERVAL_WRITES};
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// `HashMap`-backed store with lazy expiry.
///
/// Expired keys are dropped when read, and every
/// [`SWEEP_INTERVAL_WRITES`] writes the whole map is swept.
/// Deadlines use [`tokio::time::Instant`], so paused test time controls
/// expiry.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired key. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        sweep(&mut entries, Instant::now())
    }

    fn sweep_due(&self) -> bool {
        (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL_WRITES == 0
    }
}

fn sweep(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(now));
    before - entries.len()
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Some(now + ttl),
        };
        let mut entries = self.entries.lock().await;
        if self.sweep_due() {
            sweep(&mut entries, now);
        }
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if self.sweep_due() {
            sweep(&mut entries, now);
        }
        let next = match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                let next = parse_counter(key, &entry.value)? + 1;
                entry.value = next.to_string().into_bytes();
                next
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: b"1".to_vec(),
                        expires_at: None,
                    },
                );
                1
            }
        };
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
