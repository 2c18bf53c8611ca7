//! Cadence: tool-calling dialogue loop for conversational schedulers
//!
//! One user turn runs a bounded loop: compact the transcript, ask the
//! reasoner, execute any requested capabilities concurrently, fold the
//! results back in, and repeat until a plain-text answer arrives. Around the
//! loop sit a TTL-backed conversation store and a fixed-window rate limiter.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use cadence::prelude::*;
//!
//! # async fn example() -> cadence::error::Result<()> {
//! let config = CadenceConfig::from_env();
//! let registry = CapabilityRegistry::new().with(FnCapability::new(
//!     "list_bookings",
//!     "List upcoming bookings for an attendee",
//!     InputSchema::object().string("attendee_email", "Invitee email", true).build(),
//!     |args| async move { Ok(serde_json::json!({ "email": args.get_str("attendee_email")? })) },
//! ))?;
//!
//! let dialogue = DialogueLoop::from_config(
//!     &config,
//!     Arc::new(OpenAiReasoner::from_config(&config)?),
//!     Arc::new(registry),
//! )?;
//! let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::new());
//! let sessions = SessionHandler::new(
//!     Arc::new(dialogue),
//!     ConversationStore::new(backend.clone(), config.conversation_ttl()),
//!     RateLimiter::new(backend, config.rate_limit, config.rate_window())?,
//! );
//!
//! let reply = sessions
//!     .handle(SessionRequest::new("client-1", "What's booked for me?"))
//!     .await?;
//! println!("{}", reply.reply);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod capability;
pub mod compaction;
pub mod config;
pub mod conversation;
pub mod dialogue;
pub mod display;
pub mod error;
pub mod prelude;
pub mod rate_limit;
pub mod reasoner;
pub mod session;
pub mod types;
pub mod util;
