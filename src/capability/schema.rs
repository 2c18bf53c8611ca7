//! JSON Schema input descriptions for capabilities.

use serde::{Deserialize, Serialize};

/// JSON Schema describing a capability's arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSchema {
    pub schema: serde_json::Value,
}

impl InputSchema {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: serde_json::Value) -> Self {
        Self { schema }
    }

    /// A schema accepting no arguments.
    pub fn empty() -> Self {
        Self {
            schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Start an object schema.
    pub fn object() -> SchemaBuilder {
        SchemaBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for object schemas.
pub struct SchemaBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    fn property(mut self, name: impl Into<String>, definition: serde_json::Value, required: bool) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), definition);
        if required {
            self.required.push(name);
        }
        self
    }

    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "string", "description": description.into() }),
            required,
        )
    }

    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "integer", "description": description.into() }),
            required,
        )
    }

    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "number", "description": description.into() }),
            required,
        )
    }

    pub fn boolean(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({ "type": "boolean", "description": description.into() }),
            required,
        )
    }

    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.property(
            name,
            serde_json::json!({
                "type": "string",
                "description": description.into(),
                "enum": values,
            }),
            required,
        )
    }

    /// Nested object property described by another schema.
    pub fn object(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        nested: InputSchema,
        required: bool,
    ) -> Self {
        let mut definition = nested.schema;
        if let Some(obj) = definition.as_object_mut() {
            obj.insert("description".into(), description.into().into());
        }
        self.property(name, definition, required)
    }

    /// Array property whose items follow `items`.
    pub fn array(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        items: serde_json::Value,
        required: bool,
    ) -> Self {
        self.property(
            name,
            serde_json::json!({
                "type": "array",
                "description": description.into(),
                "items": items,
            }),
            required,
        )
    }

    pub fn build(self) -> InputSchema {
        InputSchema {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
