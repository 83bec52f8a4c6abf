//! Persisted conversation turns.
//!
//! A [`TurnRecord`] is one line of history: a timestamp plus exactly one of
//! four [`Turn`] shapes, discriminated on disk by an explicit `kind` tag.
//!
//! ```json
//! {"time":"2026-10-19T07:00:00Z","kind":"user","text":"SEND_MORNING"}
//! {"time":"2026-10-19T07:00:02Z","kind":"function","name":"send_email","args":{"body":"B","subject":"S"}}
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Arguments of a tool invocation, as persisted.
pub type ToolArgs = BTreeMap<String, String>;

/// One persisted unit of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub turn: Turn,
}

/// The four shapes a turn can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    /// A trigger- or human-originated utterance.
    User { text: String },
    /// A plain-text reply from the model.
    Model { text: String },
    /// A tool invocation requested by the model.
    Function { name: String, args: ToolArgs },
    /// The outcome of executing a tool invocation.
    FunctionResponse { name: String, response: FunctionResult },
}

/// Payload of a `function_response` turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub result: String,
}

impl FunctionResult {
    pub fn new(result: impl Into<String>) -> Self {
        Self { result: result.into() }
    }
}

// ── Convenience constructors ───────────────────────────────────────

impl TurnRecord {
    pub fn user(text: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self { time, turn: Turn::User { text: text.into() } }
    }

    pub fn model(text: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self { time, turn: Turn::Model { text: text.into() } }
    }

    pub fn function_call(name: impl Into<String>, args: ToolArgs, time: DateTime<Utc>) -> Self {
        Self {
            time,
            turn: Turn::Function { name: name.into(), args },
        }
    }

    pub fn function_response(
        name: impl Into<String>,
        response: FunctionResult,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            time,
            turn: Turn::FunctionResponse { name: name.into(), response },
        }
    }

    /// The on-disk `kind` tag of this record.
    pub fn kind(&self) -> &'static str {
        self.turn.kind()
    }
}

impl Turn {
    pub fn kind(&self) -> &'static str {
        match self {
            Turn::User { .. } => "user",
            Turn::Model { .. } => "model",
            Turn::Function { .. } => "function",
            Turn::FunctionResponse { .. } => "function_response",
        }
    }

    /// Tool name for `function` / `function_response` turns.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Turn::Function { name, .. } | Turn::FunctionResponse { name, .. } => Some(name),
            _ => None,
        }
    }

    /// One-line human summary, used by `tidings history`.
    pub fn summary(&self) -> String {
        match self {
            Turn::User { text } | Turn::Model { text } => text.replace('\n', " "),
            Turn::Function { name, args } => {
                let keys: Vec<&str> = args.keys().map(String::as_str).collect();
                format!("{name}({})", keys.join(", "))
            }
            Turn::FunctionResponse { name, response } => {
                format!("{name} -> {}", response.result.replace('\n', " "))
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
