//! The bounded reason-and-act loop that executes one user turn.

use std::sync::Arc;

use bon::Builder;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::capability::CapabilityRegistry;
use crate::compaction::{compact, transcript_tokens, CharEstimator, TokenEstimator};
use crate::config::{CadenceConfig, DEFAULT_MAX_LOOPS, DEFAULT_SYSTEM_PROMPT, DEFAULT_TOKEN_BUDGET};
use crate::display::DisplayTime;
use crate::error::{CadenceError, Result};
use crate::reasoner::{Reasoner, ReasonerRequest};
use crate::types::{CapabilityInvocation, Message, Transcript};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The reasoner produced a plain-text answer.
    Answered,
    /// Every requested capability was unknown; nothing was executed.
    Unsupported { names: Vec<String> },
    /// Every executed capability failed; carries the first error text.
    CapabilityFailed { error: String },
    /// The reasoner finished with blank text; the user gets
    /// [`EMPTY_REPLY_MESSAGE`] instead.
    EmptyReply,
}

/// Shown in place of a blank terminal reply.
pub const EMPTY_REPLY_MESSAGE: &str = "I couldn't produce an answer. Please rephrase your request.";

/// Result of [`DialogueLoop::run_turn`].
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    /// Text to show the user.
    pub text: String,
    pub outcome: TurnOutcome,
    /// Reasoner calls made.
    pub iterations: usize,
    /// Everything produced this turn, starting with the user message.
    /// Not persisted; the session keeps only the user text and `text`.
    pub turn_messages: Vec<Message>,
}

/// Executes user turns against a reasoner and a fixed capability set.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use cadence::capability::CapabilityRegistry;
/// # use cadence::dialogue::DialogueLoop;
/// # use cadence::reasoner::OpenAiReasoner;
/// # use cadence::types::Transcript;
/// # async fn run() -> cadence::error::Result<()> {
/// let dialogue = DialogueLoop::builder()
///     .reasoner(Arc::new(OpenAiReasoner::new("gpt-4o-mini", "sk-...", None)))
///     .registry(Arc::new(CapabilityRegistry::new()))
///     .system_prompt("You book meetings.")
///     .build();
/// let reply = dialogue.run_turn("What's on my calendar?", &Transcript::new()).await?;
/// println!("{}", reply.text);
/// # Ok(())
/// # }
/// ```
#[derive(Builder)]
pub struct DialogueLoop {
    reasoner: Arc<dyn Reasoner>,
    registry: Arc<CapabilityRegistry>,
    #[builder(into, default = DEFAULT_SYSTEM_PROMPT.to_string())]
    system_prompt: String,
    /// Maximum reasoner calls per turn.
    #[builder(default = DEFAULT_MAX_LOOPS)]
    max_loops: usize,
    /// Token budget for each outgoing transcript.
    #[builder(default = DEFAULT_TOKEN_BUDGET)]
    token_budget: usize,
    #[builder(default = Arc::new(CharEstimator) as Arc<dyn TokenEstimator>)]
    estimator: Arc<dyn TokenEstimator>,
    #[builder(default)]
    display: DisplayTime,
}

impl DialogueLoop {
    /// Build from configuration with the default estimator.
    pub fn from_config(
        config: &CadenceConfig,
        reasoner: Arc<dyn Reasoner>,
        registry: Arc<CapabilityRegistry>,
    ) -> Result<Self> {
        Ok(Self::builder()
            .reasoner(reasoner)
            .registry(registry)
            .system_prompt(config.system_prompt.clone())
            .max_loops(config.max_loops)
            .token_budget(config.token_budget)
            .display(config.display_time()?)
            .build())
    }

    pub fn max_loops(&self) -> usize {
        self.max_loops
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run one user turn to completion.
    ///
    /// A leading system message in `prior` is replaced by the configured
    /// prompt. Reasoner errors propagate unchanged; capability failures do
    /// not. Fails with [`CadenceError::LoopExceeded`] when no terminal answer
    /// arrives within `max_loops` reasoner calls.
    pub async fn run_turn(&self, user_text: &str, prior: &Transcript) -> Result<TurnReply> {
        let history = match prior.messages() {
            [Message::System { .. }, rest @ ..] => rest,
            all => all,
        };
        let system = Message::system(self.system_prompt.clone());
        let capabilities = self.registry.describe();
        let mut turn_messages = vec![Message::user(user_text)];

        for iteration in 1..=self.max_loops {
            let outgoing: Vec<Message> = std::iter::once(system.clone())
                .chain(history.iter().cloned())
                .chain(turn_messages.iter().cloned())
                .collect();
            let compacted = compact(&outgoing, self.token_budget, self.estimator.as_ref());
            debug!(
                iteration,
                messages = outgoing.len(),
                sent = compacted.len(),
                tokens = transcript_tokens(&compacted, self.estimator.as_ref()),
                "calling reasoner"
            );

            let reply = self
                .reasoner
                .respond(&ReasonerRequest::new(compacted, capabilities.clone()))
                .await?;
            turn_messages.push(Message::assistant_with_invocations(
                reply.text.clone(),
                reply.invocations.clone(),
            ));

            if reply.is_terminal() && reply.text.trim().is_empty() {
                warn!(iteration, "reasoner returned an empty reply");
                return Ok(TurnReply {
                    text: EMPTY_REPLY_MESSAGE.to_string(),
                    outcome: TurnOutcome::EmptyReply,
                    iterations: iteration,
                    turn_messages,
                });
            }

            if reply.is_terminal() {
                info!(iteration, "turn answered");
                return Ok(TurnReply {
                    text: self.display.rewrite(&reply.text),
                    outcome: TurnOutcome::Answered,
                    iterations: iteration,
                    turn_messages,
                });
            }

            let (known, unknown): (Vec<&CapabilityInvocation>, Vec<&CapabilityInvocation>) = reply
                .invocations
                .iter()
                .partition(|inv| self.registry.contains(&inv.name));

            for inv in &unknown {
                warn!(capability = %inv.name, invocation_id = %inv.id, "reasoner requested unknown capability");
            }

            if known.is_empty() {
                let names = unique_names(&unknown);
                info!(iteration, unsupported = ?names, "turn ended on unsupported capabilities");
                return Ok(TurnReply {
                    text: unsupported_message(&names),
                    outcome: TurnOutcome::Unsupported { names },
                    iterations: iteration,
                    turn_messages,
                });
            }

            debug!(iteration, invocations = known.len(), "executing capabilities");
            let results = join_all(known.iter().map(|inv| self.registry.dispatch(inv))).await;

            let first_error = results
                .iter()
                .all(Message::is_error)
                .then(|| results.first().map(|m| m.content().to_string()))
                .flatten();
            turn_messages.extend(results);

            if let Some(error) = first_error {
                info!(iteration, "turn ended with every capability failing");
                return Ok(TurnReply {
                    text: failure_message(&error),
                    outcome: TurnOutcome::CapabilityFailed { error },
                    iterations: iteration,
                    turn_messages,
                });
            }
        }

        warn!(max_loops = self.max_loops, "turn exceeded loop limit");
        Err(CadenceError::LoopExceeded {
            max_loops: self.max_loops,
        })
    }
}

impl std::fmt::Debug for DialogueLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueLoop")
            .field("registry", &self.registry)
            .field("max_loops", &self.max_loops)
            .field("token_budget", &self.token_budget)
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}

/// Shown when none of the requested capabilities exist.
pub fn unsupported_message(names: &[String]) -> String {
    format!(
        "Sorry — I don't support that action yet (requested: {}).",
        names.join(", ")
    )
}

/// Shown when every executed capability failed.
pub fn failure_message(error: &str) -> String {
    format!("I couldn't complete that action:\n\n{error}\n\nPlease revise the information and try again.")
}

fn unique_names(invocations: &[&CapabilityInvocation]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(invocations.len());
    for inv in invocations {
        if !names.iter().any(|n| n == &inv.name) {
            names.push(inv.name.clone());
        }
    }
    names
}
