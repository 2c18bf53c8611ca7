//! Message types for conversation transcripts.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Prefix marking a capability result that encodes a failure.
pub const ERROR_MARKER: &str = "[error]";

/// One unit of a transcript.
///
/// Messages are immutable once appended; compaction produces shortened copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        invocations: Vec<CapabilityInvocation>,
    },
    CapabilityResult {
        invocation_id: String,
        content: String,
    },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create a plain-text assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            invocations: Vec::new(),
        }
    }

    /// Create an assistant message that requests capability invocations.
    pub fn assistant_with_invocations(
        content: impl Into<String>,
        invocations: Vec<CapabilityInvocation>,
    ) -> Self {
        Self::Assistant {
            content: content.into(),
            invocations,
        }
    }

    /// Create a capability result answering `invocation_id`.
    pub fn capability_result(invocation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::CapabilityResult {
            invocation_id: invocation_id.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::CapabilityResult { .. } => Role::CapabilityResult,
        }
    }

    /// Text content of the message.
    pub fn content(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content, .. }
            | Self::CapabilityResult { content, .. } => content,
        }
    }

    /// Invocations requested by an assistant message (empty for other roles).
    pub fn invocations(&self) -> &[CapabilityInvocation] {
        match self {
            Self::Assistant { invocations, .. } => invocations,
            _ => &[],
        }
    }

    /// Invocation id a capability result answers.
    pub fn invocation_id(&self) -> Option<&str> {
        match self {
            Self::CapabilityResult { invocation_id, .. } => Some(invocation_id),
            _ => None,
        }
    }

    /// Whether this is a capability result carrying the error marker.
    pub fn is_error(&self) -> bool {
        match self {
            Self::CapabilityResult { content, .. } => content.trim_start().starts_with(ERROR_MARKER),
            _ => false,
        }
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    CapabilityResult,
}

/// A capability invocation requested by the reasoner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityInvocation {
    /// Reasoner-supplied id used to correlate the result.
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl CapabilityInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// What the reasoner returns for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    pub invocations: Vec<CapabilityInvocation>,
}

impl AssistantReply {
    /// A terminal, text-only reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            invocations: Vec::new(),
        }
    }

    /// A reply requesting capability invocations.
    pub fn invoking(invocations: Vec<CapabilityInvocation>) -> Self {
        Self {
            text: String::new(),
            invocations,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.invocations.is_empty()
    }
}
