//! Session handling: load history, admit, run one turn, persist.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conversation::ConversationStore;
use crate::dialogue::{DialogueLoop, TurnOutcome};
use crate::error::{CadenceError, Result};
use crate::rate_limit::RateLimiter;
use crate::types::Message;
use crate::util::with_timeout;

/// One inbound user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Existing conversation; a new id is generated when absent.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Rate-limit subject (client id, IP, user).
    pub subject: String,
    pub message: String,
}

impl SessionRequest {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReply {
    pub conversation_id: String,
    pub reply: String,
}

/// Ties the store, limiter and dialogue loop together for one request.
///
/// Concurrent requests on the same conversation are not serialized; the
/// last save wins.
#[derive(Debug, Clone)]
pub struct SessionHandler {
    dialogue: Arc<DialogueLoop>,
    store: ConversationStore,
    limiter: RateLimiter,
    turn_timeout: Option<Duration>,
}

impl SessionHandler {
    pub fn new(dialogue: Arc<DialogueLoop>, store: ConversationStore, limiter: RateLimiter) -> Self {
        Self {
            dialogue,
            store,
            limiter,
            turn_timeout: None,
        }
    }

    /// Bound the whole turn (all reasoner and capability calls).
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub async fn handle(&self, request: SessionRequest) -> Result<SessionReply> {
        let conversation_id = request
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if !self.limiter.allow(&request.subject).await? {
            warn!(subject = %request.subject, %conversation_id, "request rejected by rate limiter");
            return Err(CadenceError::RateLimited {
                subject: request.subject,
            });
        }

        let mut transcript = self.store.load(&conversation_id).await?;
        let turn = self.dialogue.run_turn(&request.message, &transcript);
        let reply = match self.turn_timeout {
            Some(limit) => with_timeout(limit, turn).await?,
            None => turn.await?,
        };

        transcript.push(Message::user(request.message));
        transcript.push(Message::assistant(reply.text.clone()));
        self.store.save(&conversation_id, &transcript).await?;

        info!(
            %conversation_id,
            iterations = reply.iterations,
            outcome = outcome_label(&reply.outcome),
            "session turn complete"
        );
        Ok(SessionReply {
            conversation_id,
            reply: reply.text,
        })
    }
}

fn outcome_label(outcome: &TurnOutcome) -> &'static str {
    match outcome {
        TurnOutcome::Answered => "answered",
        TurnOutcome::Unsupported { .. } => "unsupported",
        TurnOutcome::CapabilityFailed { .. } => "capability_failed",
        TurnOutcome::EmptyReply => "empty_reply",
    }
}
