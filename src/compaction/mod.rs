//! Token-budgeted history compaction.
//!
//! Applied to the copy of the transcript sent to the reasoner before every
//! call. The stored conversation is never compacted.

use crate::types::Message;

/// Capability results longer than this (in characters) are replaced by
/// [`TRUNCATED_PLACEHOLDER`] unless they are the newest message.
pub const TRUNCATION_THRESHOLD_CHARS: usize = 200;

pub const TRUNCATED_PLACEHOLDER: &str = "[tool-result truncated]";

/// Approximate token counter.
///
/// Exactness is not required; implementations must be deterministic and
/// monotonic in text length.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Four characters per token, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimator;

impl TokenEstimator for CharEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.chars().count().div_ceil(4)
    }
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}

/// Estimated cost of one message: its text plus, for assistant messages,
/// each requested invocation's name and serialized arguments.
pub fn message_tokens(message: &Message, estimator: &dyn TokenEstimator) -> usize {
    let mut tokens = estimator.estimate(message.content());
    for invocation in message.invocations() {
        let args = serde_json::to_string(&invocation.arguments).unwrap_or_default();
        tokens += estimator.estimate(&invocation.name) + estimator.estimate(&args);
    }
    tokens
}

pub fn transcript_tokens(messages: &[Message], estimator: &dyn TokenEstimator) -> usize {
    messages.iter().map(|m| message_tokens(m, estimator)).sum()
}

/// Shrink `messages` to fit within `budget` estimated tokens.
///
/// A leading system message is always kept, as is the newest message (a
/// newest capability result is kept verbatim). Older capability results over
/// [`TRUNCATION_THRESHOLD_CHARS`] are replaced by a placeholder. Messages are
/// kept newest-first until the next one would exceed the budget; everything
/// older is dropped. The kept window never opens on a capability result whose
/// assistant message was dropped.
pub fn compact(messages: &[Message], budget: usize, estimator: &dyn TokenEstimator) -> Vec<Message> {
    let (system, rest) = match messages.split_first() {
        None => return Vec::new(),
        Some((first @ Message::System { .. }, rest)) => (Some(first), rest),
        Some(_) => (None, messages),
    };

    let mut total = system.map_or(0, |m| message_tokens(m, estimator));
    let mut kept: Vec<Message> = Vec::with_capacity(rest.len());

    for (offset, message) in rest.iter().rev().enumerate() {
        let candidate = if offset == 0 {
            message.clone()
        } else {
            truncate_result(message)
        };
        let cost = message_tokens(&candidate, estimator);
        if offset > 0 && total + cost > budget {
            break;
        }
        total += cost;
        kept.push(candidate);
    }
    kept.reverse();

    // Orphaned results: their assistant message fell outside the window.
    let orphans = kept
        .iter()
        .take(kept.len().saturating_sub(1))
        .take_while(|m| matches!(m, Message::CapabilityResult { .. }))
        .count();
    kept.drain(..orphans);

    system.cloned().into_iter().chain(kept).collect()
}

/// [`compact`] with the default [`CharEstimator`].
pub fn compact_default(messages: &[Message], budget: usize) -> Vec<Message> {
    compact(messages, budget, &CharEstimator)
}

fn truncate_result(message: &Message) -> Message {
    match message {
        Message::CapabilityResult {
            invocation_id,
            content,
        } if content.chars().count() > TRUNCATION_THRESHOLD_CHARS => {
            Message::capability_result(invocation_id.clone(), TRUNCATED_PLACEHOLDER)
        }
        other => other.clone(),
    }
}
