//! Typed access to capability invocation arguments.

use super::handler::HandlerError;

/// Wrapper around invocation arguments providing typed extraction.
///
/// Reasoners often send arguments as a stringified JSON object; such strings
/// are parsed on construction so handlers always see the structured value.
#[derive(Debug, Clone)]
pub struct CapabilityArguments {
    value: serde_json::Value,
}

impl CapabilityArguments {
    pub fn new(value: serde_json::Value) -> Self {
        let value = match value {
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(trimmed).unwrap_or(serde_json::Value::String(raw))
                }
            }
            serde_json::Value::Null => serde_json::json!({}),
            other => other,
        };
        Self { value }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, HandlerError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| HandlerError::invalid(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, HandlerError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| HandlerError::invalid(format!("Missing integer argument: {key}")))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, HandlerError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| HandlerError::invalid(format!("Missing boolean argument: {key}")))
    }

    /// Get an optional boolean argument, falling back to `default`.
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.value.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn get_object(&self, key: &str) -> Result<&serde_json::Value, HandlerError> {
        self.value
            .get(key)
            .filter(|v| v.is_object())
            .ok_or_else(|| HandlerError::invalid(format!("Missing object argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| HandlerError::invalid(format!("Failed to deserialize arguments: {e}")))
    }
}
