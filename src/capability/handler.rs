//! Capability handler trait and closure-based wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::arguments::CapabilityArguments;
use super::schema::InputSchema;

/// Failure raised by a capability handler.
///
/// Never escapes the dialogue loop: dispatch encodes it into the result text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("remote service returned status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// Label used in the `[error] <kind>: <message>` encoding.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "InvalidArguments",
            Self::Remote { .. } => "RemoteError",
            Self::Network(_) => "NetworkError",
            Self::Failed(_) => "HandlerError",
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

impl From<reqwest::Error> for HandlerError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Remote {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

/// A named, schema-described action the reasoner may request.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Capability name (must match what the reasoner calls).
    fn name(&self) -> &str;

    /// Human-readable description advertised to the reasoner.
    fn description(&self) -> &str;

    fn input_schema(&self) -> &InputSchema;

    /// Execute with already-validated arguments.
    async fn invoke(&self, args: &CapabilityArguments) -> Result<serde_json::Value, HandlerError>;
}

type HandlerFn = dyn Fn(CapabilityArguments) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, HandlerError>> + Send>>
    + Send
    + Sync;

/// Closure-backed capability for quick registration.
pub struct FnCapability {
    name: String,
    description: String,
    schema: InputSchema,
    handler: Arc<HandlerFn>,
}

impl FnCapability {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: InputSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(CapabilityArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, HandlerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl CapabilityHandler for FnCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> &InputSchema {
        &self.schema
    }

    async fn invoke(&self, args: &CapabilityArguments) -> Result<serde_json::Value, HandlerError> {
        (self.handler)(args.clone()).await
    }
}

impl std::fmt::Debug for FnCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCapability")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
