//! Remote reasoner client: the language model that answers or requests
//! capability invocations.

pub mod http;

#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::capability::CapabilityDescriptor;
use crate::error::Result;
use crate::types::{AssistantReply, Message};

#[cfg(feature = "openai")]
pub use openai::{OpenAiReasoner, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// How the reasoner may choose capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionMode {
    /// The reasoner decides between a text answer and invocations.
    #[default]
    Auto,
    /// Text answers only; capabilities are advertised but not callable.
    None,
}

/// One reasoner call.
#[derive(Debug, Clone)]
pub struct ReasonerRequest {
    pub messages: Vec<Message>,
    pub capabilities: Vec<CapabilityDescriptor>,
    pub selection: SelectionMode,
}

impl ReasonerRequest {
    pub fn new(messages: Vec<Message>, capabilities: Vec<CapabilityDescriptor>) -> Self {
        Self {
            messages,
            capabilities,
            selection: SelectionMode::Auto,
        }
    }
}

/// A remote reasoner.
///
/// Transport and quota failures are returned as errors and are not retried.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn respond(&self, request: &ReasonerRequest) -> Result<AssistantReply>;
}
