//! OpenAI Chat Completions reasoner.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::capability::CapabilityDescriptor;
use crate::config::CadenceConfig;
use crate::error::{CadenceError, Result};
use crate::types::{AssistantReply, CapabilityInvocation, Message};

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{Reasoner, ReasonerRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat Completions client with function calling.
///
/// Works with any OpenAI-compatible endpoint via `base_url`.
pub struct OpenAiReasoner {
    model: String,
    api_key: String,
    base_url: String,
    temperature: Option<f64>,
    client: reqwest::Client,
}

impl OpenAiReasoner {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            temperature: None,
            client: shared_client().clone(),
        }
    }

    /// Build from configuration; fails when no API key is configured.
    pub fn from_config(config: &CadenceConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(
            config.model.clone(),
            api_key,
            Some(config.openai_base_url.clone()),
        ))
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Use a caller-supplied HTTP client (custom timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(&self, request: &ReasonerRequest) -> serde_json::Value {
        let answered = answered_invocations(&request.messages);
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|msg| message_to_openai(msg, &answered))
            .collect();

        let mut body = serde_json::Map::new();
        body.insert("model".into(), self.model.clone().into());
        body.insert("messages".into(), messages.into());

        if let Some(temp) = self.temperature {
            body.insert("temperature".into(), temp.into());
        }

        if !request.capabilities.is_empty() {
            let tools: Vec<serde_json::Value> =
                request.capabilities.iter().map(capability_to_tool).collect();
            body.insert("tools".into(), tools.into());
            body.insert("tool_choice".into(), request.selection.to_string().into());
        }

        serde_json::Value::Object(body)
    }
}

impl std::fmt::Debug for OpenAiReasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiReasoner")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Reasoner for OpenAiReasoner {
    async fn respond(&self, request: &ReasonerRequest) -> Result<AssistantReply> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            capabilities = request.capabilities.len(),
            "OpenAI chat completion"
        );

        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(
                status.as_u16(),
                retry_after.as_deref(),
                &body_text,
            ));
        }

        let data: ChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CadenceError::InvalidResponse("no choices in response".into()))?;

        let invocations = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                CapabilityInvocation::new(
                    tc.id,
                    tc.function.name,
                    serde_json::from_str(&tc.function.arguments)
                        .unwrap_or(serde_json::Value::String(tc.function.arguments)),
                )
            })
            .collect();

        Ok(AssistantReply {
            text: choice.message.content.unwrap_or_default(),
            invocations,
        })
    }
}

fn capability_to_tool(descriptor: &CapabilityDescriptor) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": descriptor.name,
            "description": descriptor.description,
            "parameters": descriptor.schema,
        }
    })
}

/// Ids of invocations that have a result somewhere in `messages`.
fn answered_invocations(messages: &[Message]) -> HashSet<&str> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            Message::CapabilityResult { invocation_id, .. } => Some(invocation_id.as_str()),
            _ => None,
        })
        .collect()
}

/// Map one message to the Chat Completions shape.
///
/// The API rejects a `tool_calls` entry without a matching `tool` message,
/// so invocations missing from `answered` (unknown capabilities) are left out.
fn message_to_openai(msg: &Message, answered: &HashSet<&str>) -> serde_json::Value {
    match msg {
        Message::System { content } => serde_json::json!({ "role": "system", "content": content }),
        Message::User { content } => serde_json::json!({ "role": "user", "content": content }),
        Message::Assistant {
            content,
            invocations,
        } => {
            let tool_calls: Vec<serde_json::Value> = invocations
                .iter()
                .filter(|inv| answered.contains(inv.id.as_str()))
                .map(|inv| {
                    serde_json::json!({
                        "id": inv.id,
                        "type": "function",
                        "function": {
                            "name": inv.name,
                            "arguments": arguments_to_string(&inv.arguments),
                        }
                    })
                })
                .collect();
            if tool_calls.is_empty() {
                return serde_json::json!({ "role": "assistant", "content": content });
            }
            serde_json::json!({
                "role": "assistant",
                "content": if content.is_empty() { serde_json::Value::Null } else { content.clone().into() },
                "tool_calls": tool_calls,
            })
        }
        Message::CapabilityResult {
            invocation_id,
            content,
        } => serde_json::json!({
            "role": "tool",
            "tool_call_id": invocation_id,
            "content": content,
        }),
    }
}

/// Function-call arguments travel as a JSON string.
fn arguments_to_string(arguments: &serde_json::Value) -> String {
    match arguments {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    id: String,
    function: ToolFunction,
}

#[derive(Deserialize)]
struct ToolFunction {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoner::SelectionMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn capability_results_become_tool_messages() {
        let json = message_to_openai(&Message::capability_result("call_1", "ok"), &HashSet::new());
        assert_eq!(
            json,
            serde_json::json!({ "role": "tool", "tool_call_id": "call_1", "content": "ok" })
        );
    }

    #[test]
    fn assistant_invocations_become_tool_calls() {
        let json = message_to_openai(
            &Message::assistant_with_invocations(
                "",
                vec![CapabilityInvocation::new(
                    "call_1",
                    "list_bookings",
                    serde_json::json!({"attendee_email": "a@example.com"}),
                )],
            ),
            &HashSet::from(["call_1"]),
        );
        assert_eq!(json["content"], serde_json::Value::Null);
        assert_eq!(json["tool_calls"][0]["function"]["name"], "list_bookings");
        assert_eq!(
            json["tool_calls"][0]["function"]["arguments"],
            r#"{"attendee_email":"a@example.com"}"#
        );
    }

    #[test]
    fn tools_and_choice_are_omitted_without_capabilities() {
        let reasoner = OpenAiReasoner::new("gpt-4o-mini", "sk-test", None);
        let body = reasoner.build_request_body(&ReasonerRequest::new(vec![Message::user("hi")], vec![]));
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn selection_mode_is_sent_as_tool_choice() {
        let reasoner = OpenAiReasoner::new("gpt-4o-mini", "sk-test", None).with_temperature(0.2);
        let mut request = ReasonerRequest::new(
            vec![Message::user("hi")],
            vec![CapabilityDescriptor {
                name: "list_bookings".into(),
                description: "List".into(),
                schema: serde_json::json!({"type": "object"}),
            }],
        );
        assert_eq!(reasoner.build_request_body(&request)["tool_choice"], "auto");

        request.selection = SelectionMode::None;
        let body = reasoner.build_request_body(&request);
        assert_eq!(body["tool_choice"], "none");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn unanswered_invocations_are_not_sent() {
        let reasoner = OpenAiReasoner::new("gpt-4o-mini", "sk-test", None);
        let request = ReasonerRequest::new(
            vec![
                Message::user("list and fly"),
                Message::assistant_with_invocations(
                    "",
                    vec![
                        CapabilityInvocation::new("call_1", "list_bookings", serde_json::json!({})),
                        CapabilityInvocation::new("call_2", "book_flight", serde_json::json!({})),
                    ],
                ),
                Message::capability_result("call_1", "[]"),
                Message::assistant_with_invocations(
                    "Checking.",
                    vec![CapabilityInvocation::new("call_3", "book_flight", serde_json::json!({}))],
                ),
            ],
            vec![],
        );

        let body = reasoner.build_request_body(&request);
        let messages = body["messages"].as_array().unwrap();

        let ids: Vec<&str> = messages[1]["tool_calls"]
            .as_array()
            .unwrap()
            .iter()
            .map(|call| call["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["call_1"]);
        assert_eq!(
            messages[3],
            serde_json::json!({ "role": "assistant", "content": "Checking." })
        );
    }
}
