//! TTL-backed persistence of conversation transcripts.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::backend::KeyValueBackend;
use crate::error::Result;
use crate::types::Transcript;

/// One day.
pub const DEFAULT_CONVERSATION_TTL: Duration = Duration::from_secs(86_400);

/// Loads and saves full, uncompacted transcripts keyed by conversation id.
#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn KeyValueBackend>,
    ttl: Duration,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn with_default_ttl(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::new(backend, DEFAULT_CONVERSATION_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Transcript for `conversation_id`; empty when absent or expired.
    pub async fn load(&self, conversation_id: &str) -> Result<Transcript> {
        match self.backend.get(&conversation_key(conversation_id)).await? {
            Some(raw) => {
                let transcript: Transcript = serde_json::from_slice(&raw)?;
                debug!(conversation_id, messages = transcript.len(), "loaded conversation");
                Ok(transcript)
            }
            None => Ok(Transcript::new()),
        }
    }

    /// Persist `transcript`, refreshing its expiry.
    pub async fn save(&self, conversation_id: &str, transcript: &Transcript) -> Result<()> {
        let payload = serde_json::to_vec(transcript)?;
        self.backend
            .set(&conversation_key(conversation_id), &payload, self.ttl)
            .await?;
        debug!(conversation_id, messages = transcript.len(), "saved conversation");
        Ok(())
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

pub fn conversation_key(conversation_id: &str) -> String {
    format!("conversation:{conversation_id}")
}
