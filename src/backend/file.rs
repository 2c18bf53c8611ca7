//! File-backed store: one JSON envelope per key.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use super::{parse_counter, KeyValueBackend, SWEEP_INTERVAL_WRITES};
use crate::error::{CadenceError, Result};

/// Configuration for [`FileBackend`].
#[derive(Debug, Clone)]
pub struct FileBackendConfig {
    pub base_dir: PathBuf,
}

impl FileBackendConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// `~/.cadence/kv`
    pub fn default_dir() -> PathBuf {
        default_cadence_dir().join("kv")
    }
}

/// Key-value store persisted under a directory.
///
/// File names are the SHA-256 of the key, so arbitrary keys are safe. Expiry
/// is wall-clock and checked on read; every [`SWEEP_INTERVAL_WRITES`] writes
/// the directory is swept for expired entries. Operations are serialized
/// within one process only; two processes sharing a directory may lose
/// increments.
#[derive(Debug)]
pub struct FileBackend {
    base_dir: PathBuf,
    lock: Mutex<()>,
    writes: AtomicUsize,
}

impl FileBackend {
    pub fn new(config: FileBackendConfig) -> Self {
        Self {
            base_dir: config.base_dir,
            lock: Mutex::new(()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn new_default() -> Self {
        Self::new(FileBackendConfig::new(FileBackendConfig::default_dir()))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.base_dir.join(format!("{digest:x}.json"))
    }

    async fn read_live(&self, key: &str) -> Result<Option<Envelope>> {
        let path = self.entry_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let envelope: Envelope = serde_json::from_slice(&raw)?;
        if envelope.is_live(Utc::now()) {
            return Ok(Some(envelope));
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(None)
    }

    async fn write(&self, envelope: &Envelope) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let path = self.entry_path(&envelope.key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(envelope)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL_WRITES == 0 {
            self.sweep().await?;
        }
        Ok(())
    }

    /// Delete every expired entry file. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        self.sweep().await
    }

    async fn sweep(&self) -> Result<usize> {
        let mut dir = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        let now = Utc::now();
        let mut removed = 0;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            // Unreadable or foreign files are left alone.
            let Ok(raw) = tokio::fs::read(&path).await else {
                continue;
            };
            let Ok(envelope) = serde_json::from_slice::<Envelope>(&raw) else {
                continue;
            };
            if envelope.is_live(now) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        if removed > 0 {
            debug!(removed, dir = %self.base_dir.display(), "swept expired entries");
        }
        Ok(removed)
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.lock().await;
        match self.read_live(key).await? {
            Some(envelope) => Ok(Some(envelope.decode()?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let _guard = self.lock.lock().await;
        let envelope = Envelope {
            key: key.to_string(),
            value: Envelope::encode(value),
            expires_at: Some(deadline(ttl)?),
        };
        self.write(&envelope).await
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let _guard = self.lock.lock().await;
        let envelope = match self.read_live(key).await? {
            Some(mut envelope) => {
                let next = parse_counter(key, &envelope.decode()?)? + 1;
                envelope.value = Envelope::encode(next.to_string().as_bytes());
                envelope
            }
            None => Envelope {
                key: key.to_string(),
                value: Envelope::encode(b"1"),
                expires_at: None,
            },
        };
        let count = parse_counter(key, &envelope.decode()?)?;
        self.write(&envelope).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let Some(mut envelope) = self.read_live(key).await? else {
            return Ok(false);
        };
        envelope.expires_at = Some(deadline(ttl)?);
        self.write(&envelope).await?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    key: String,
    /// Base64 (standard alphabet).
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Envelope {
    fn encode(value: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(value)
    }

    fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.value)
            .map_err(|e| CadenceError::Backend(format!("corrupt value for '{}': {e}", self.key)))
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

fn deadline(ttl: Duration) -> Result<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| CadenceError::Backend(format!("ttl out of range: {e}")))?;
    Ok(Utc::now() + ttl)
}

pub(crate) fn default_cadence_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".cadence"))
        .unwrap_or_else(|| PathBuf::from(".cadence"))
}
