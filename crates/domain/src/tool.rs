use serde::{Deserialize, Serialize};

use crate::record::{FunctionResult, ToolArgs};

/// Internal tool call format (provider-agnostic).
/// The inference adapter converts provider-specific calls to this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Flatten the JSON arguments into the persisted string map.
    ///
    /// String values are taken verbatim; any other value is stored as its
    /// compact JSON text. Non-object arguments yield an empty map.
    pub fn string_args(&self) -> ToolArgs {
        let mut args = ToolArgs::new();
        if let serde_json::Value::Object(map) = &self.arguments {
            for (k, v) in map {
                let text = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                args.insert(k.clone(), text);
            }
        }
        args
    }
}

/// Tool definition exposed to the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A transcript entry: one message of the conversation as the inference
/// service sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    FunctionCall { name: String, args: ToolArgs },
    FunctionResponse { name: String, response: FunctionResult },
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: Content::Text { text: text.into() } }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, content: Content::Text { text: text.into() } }
    }

    /// A tool invocation issued by the model.
    pub fn function_call(name: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            role: Role::Model,
            content: Content::FunctionCall { name: name.into(), args },
        }
    }

    pub fn function_response(name: impl Into<String>, response: FunctionResult) -> Self {
        Self {
            role: Role::Function,
            content: Content::FunctionResponse { name: name.into(), response },
        }
    }

    /// Plain text of a text entry.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text { text } => Some(text),
            _ => None,
        }
    }
}
