//! Convenience re-exports for common use.

pub use crate::backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use crate::capability::{
    CapabilityArguments, CapabilityHandler, CapabilityRegistry, FnCapability, HandlerError,
    InputSchema,
};
pub use crate::compaction::{compact, CharEstimator, TokenEstimator};
pub use crate::config::CadenceConfig;
pub use crate::conversation::ConversationStore;
pub use crate::dialogue::{DialogueLoop, TurnOutcome, TurnReply};
pub use crate::display::DisplayTime;
pub use crate::error::{CadenceError, Result};
pub use crate::rate_limit::RateLimiter;
pub use crate::reasoner::{Reasoner, ReasonerRequest, SelectionMode};
#[cfg(feature = "openai")]
pub use crate::reasoner::OpenAiReasoner;
pub use crate::session::{SessionHandler, SessionReply, SessionRequest};
pub use crate::types::{AssistantReply, CapabilityInvocation, Message, Role, Transcript};
