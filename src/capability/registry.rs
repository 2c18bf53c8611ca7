//! Name → handler registry and invocation dispatch.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CadenceError, Result};
use crate::types::{CapabilityInvocation, Message, ERROR_MARKER};

use super::arguments::CapabilityArguments;
use super::handler::{CapabilityHandler, HandlerError};
use super::validation::validate_arguments;

/// Capability advertisement sent to the reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// Fixed mapping from capability name to handler.
///
/// Built once at startup, then shared read-only (usually behind an `Arc`)
/// across concurrent turns.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    handlers: Vec<Arc<dyn CapabilityHandler>>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Names must be unique.
    pub fn register<H>(&mut self, handler: H) -> Result<()>
    where
        H: CapabilityHandler + 'static,
    {
        self.register_arc(Arc::new(handler))
    }

    pub fn register_arc(&mut self, handler: Arc<dyn CapabilityHandler>) -> Result<()> {
        let name = handler.name().to_string();
        if name.trim().is_empty() {
            return Err(CadenceError::Configuration(
                "capability name must not be empty".into(),
            ));
        }
        if self.index.contains_key(&name) {
            return Err(CadenceError::Configuration(format!(
                "capability '{name}' is already registered"
            )));
        }
        self.index.insert(name, self.handlers.len());
        self.handlers.push(handler);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with<H>(mut self, handler: H) -> Result<Self>
    where
        H: CapabilityHandler + 'static,
    {
        self.register(handler)?;
        Ok(self)
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CapabilityHandler>> {
        self.index.get(name).map(|&idx| Arc::clone(&self.handlers[idx]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Descriptors for every registered capability, in registration order.
    pub fn describe(&self) -> Vec<CapabilityDescriptor> {
        self.handlers
            .iter()
            .map(|h| CapabilityDescriptor {
                name: h.name().to_string(),
                description: h.description().to_string(),
                schema: h.input_schema().schema.clone(),
            })
            .collect()
    }

    /// Execute one invocation and wrap the outcome as a capability result.
    ///
    /// Never fails: unknown names, invalid arguments, handler errors and
    /// handler panics all become error-marked result text.
    pub async fn dispatch(&self, invocation: &CapabilityInvocation) -> Message {
        let Some(handler) = self.resolve(&invocation.name) else {
            warn!(
                capability = %invocation.name,
                invocation_id = %invocation.id,
                "dispatch to unknown capability"
            );
            return Message::capability_result(
                invocation.id.clone(),
                format!("{ERROR_MARKER} UnknownCapability: {}", invocation.name),
            );
        };

        let args = CapabilityArguments::new(invocation.arguments.clone());
        let outcome = match validate_arguments(args.raw(), &handler.input_schema().schema) {
            Ok(()) => AssertUnwindSafe(handler.invoke(&args))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(HandlerError::failed(panic_message(payload.as_ref())))),
            Err(err) => Err(err),
        };

        let content = match outcome {
            Ok(value) => {
                debug!(capability = %invocation.name, invocation_id = %invocation.id, "capability succeeded");
                render_value(value)
            }
            Err(err) => {
                warn!(
                    capability = %invocation.name,
                    invocation_id = %invocation.id,
                    kind = err.kind(),
                    error = %err,
                    "capability failed"
                );
                encode_error(&err)
            }
        };
        Message::capability_result(invocation.id.clone(), content)
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field(
                "capabilities",
                &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// `[error] <kind>: <message>`
pub fn encode_error(err: &HandlerError) -> String {
    format!("{ERROR_MARKER} {}: {}", err.kind(), err)
}

fn render_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("handler panicked: {msg}")
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{FnCapability, InputSchema};
    use pretty_assertions::assert_eq;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::new()
            .with(FnCapability::new(
                "list_bookings",
                "List bookings for an attendee",
                InputSchema::object()
                    .string("attendee_email", "Invitee email", true)
                    .build(),
                |args| async move {
                    let email = args.get_str("attendee_email")?.to_string();
                    Ok(serde_json::json!({ "bookings": [], "email": email }))
                },
            ))
            .unwrap()
            .with(FnCapability::new(
                "cancel_booking",
                "Cancel a booking",
                InputSchema::object().string("booking_uid", "Booking", true).build(),
                |_args| async move {
                    Err(HandlerError::Remote {
                        status: 404,
                        message: "booking not found".into(),
                    })
                },
            ))
            .unwrap()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = registry();
        let err = reg
            .register(FnCapability::new(
                "list_bookings",
                "again",
                InputSchema::empty(),
                |_args| async move { Ok(serde_json::Value::Null) },
            ))
            .unwrap_err();
        assert!(matches!(err, CadenceError::Configuration(_)));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn describe_preserves_registration_order() {
        let names: Vec<String> = registry().describe().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["list_bookings", "cancel_booking"]);
    }

    #[tokio::test]
    async fn dispatch_success_renders_json() {
        let msg = registry()
            .dispatch(&CapabilityInvocation::new(
                "call_1",
                "list_bookings",
                serde_json::json!({"attendee_email": "alice@example.com"}),
            ))
            .await;

        assert_eq!(msg.invocation_id(), Some("call_1"));
        assert!(!msg.is_error());
        assert!(msg.content().contains("alice@example.com"));
    }

    #[tokio::test]
    async fn dispatch_encodes_handler_error() {
        let msg = registry()
            .dispatch(&CapabilityInvocation::new(
                "call_2",
                "cancel_booking",
                serde_json::json!({"booking_uid": "x"}),
            ))
            .await;

        assert!(msg.is_error());
        assert_eq!(
            msg.content(),
            "[error] RemoteError: remote service returned status 404: booking not found"
        );
    }

    #[tokio::test]
    async fn dispatch_validates_before_invoking() {
        let msg = registry()
            .dispatch(&CapabilityInvocation::new("call_3", "list_bookings", serde_json::json!({})))
            .await;

        assert_eq!(
            msg.content(),
            "[error] InvalidArguments: missing required field 'attendee_email'"
        );
    }

    #[tokio::test]
    async fn dispatch_unknown_capability_is_error_marked() {
        let msg = registry()
            .dispatch(&CapabilityInvocation::new("call_4", "teleport", serde_json::json!({})))
            .await;

        assert_eq!(msg.content(), "[error] UnknownCapability: teleport");
    }

    #[tokio::test]
    async fn dispatch_catches_panics() {
        let reg = CapabilityRegistry::new()
            .with(FnCapability::new(
                "explode",
                "Always panics",
                InputSchema::empty(),
                |_args| async move {
                    if true {
                        panic!("calendar exploded");
                    }
                    Ok(serde_json::Value::Null)
                },
            ))
            .unwrap();

        let msg = reg
            .dispatch(&CapabilityInvocation::new("call_5", "explode", serde_json::json!({})))
            .await;

        assert!(msg.is_error());
        assert!(msg.content().contains("calendar exploded"));
    }
}
