//! Shared test helpers: scripted reasoner and canned capabilities.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cadence::capability::{FnCapability, HandlerError, InputSchema};
use cadence::error::{CadenceError, Result};
use cadence::reasoner::{Reasoner, ReasonerRequest};
use cadence::types::{AssistantReply, CapabilityInvocation};

/// A reasoner that replays queued replies and records every request.
pub struct ScriptedReasoner {
    replies: Mutex<VecDeque<Result<AssistantReply>>>,
    repeat: Option<AssistantReply>,
    requests: Mutex<Vec<ReasonerRequest>>,
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `reply` once the queue is empty.
    pub fn repeating(reply: AssistantReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new()
        }
    }

    /// Queue a terminal text reply.
    pub fn queue_text(&self, text: &str) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(AssistantReply::text(text)));
        self
    }

    /// Queue a reply requesting `(id, name, arguments)` invocations.
    pub fn queue_invocations(&self, calls: &[(&str, &str, serde_json::Value)]) -> &Self {
        let invocations = calls
            .iter()
            .map(|(id, name, args)| CapabilityInvocation::new(*id, *name, args.clone()))
            .collect();
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(AssistantReply::invoking(invocations)));
        self
    }

    pub fn queue_error(&self, err: CadenceError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<ReasonerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn respond(&self, request: &ReasonerRequest) -> Result<AssistantReply> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            return next;
        }
        self.repeat
            .clone()
            .ok_or_else(|| CadenceError::InvalidResponse("script exhausted".into()))
    }
}

/// A capability that counts invocations and returns `outcome`.
pub fn counting_capability(
    name: &str,
    calls: Arc<AtomicUsize>,
    outcome: std::result::Result<serde_json::Value, HandlerError>,
) -> FnCapability {
    FnCapability::new(
        name,
        format!("Test capability {name}"),
        InputSchema::empty(),
        move |_args| {
            calls.fetch_add(1, Ordering::SeqCst);
            let outcome = outcome.clone();
            async move { outcome }
        },
    )
}

/// A capability that sleeps before answering.
pub fn slow_capability(name: &str, delay: Duration, text: &str) -> FnCapability {
    let text = text.to_string();
    FnCapability::new(
        name,
        format!("Slow capability {name}"),
        InputSchema::empty(),
        move |_args| {
            let text = text.clone();
            async move {
                tokio::time::sleep(delay).await;
                Ok(serde_json::Value::String(text))
            }
        },
    )
}

pub fn remote_error(status: u16, message: &str) -> HandlerError {
    HandlerError::Remote {
        status,
        message: message.to_string(),
    }
}
