//! Transcript codec: stored documents ⇄ turn records ⇄ transcript entries.
//!
//! Classification is driven solely by the `kind` tag. A document whose tag
//! is missing or unknown, or whose fields do not fit the tag, is a
//! classification fault; there is no fallback probing for other keys.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use td_domain::error::{Error, Result};
use td_domain::record::{Turn, TurnRecord};
use td_domain::tool::{Content, Message, Role};

const KNOWN_KINDS: [&str; 4] = ["user", "model", "function", "function_response"];

/// Classify one raw stored document.
///
/// Errors carry `line: 0`; [`parse_jsonl`] fills in the real line number.
pub fn classify(value: &Value) -> Result<TurnRecord> {
    classify_at(0, value)
}

fn classify_at(line: usize, value: &Value) -> Result<TurnRecord> {
    let fault = |reason: String| Error::Classification { line, reason };

    let obj = value
        .as_object()
        .ok_or_else(|| fault("document is not a JSON object".into()))?;
    let kind = match obj.get("kind") {
        None => return Err(fault("missing `kind` tag".into())),
        Some(Value::String(k)) => k.as_str(),
        Some(other) => return Err(fault(format!("`kind` must be a string, got {other}"))),
    };
    if !KNOWN_KINDS.contains(&kind) {
        return Err(fault(format!("unknown kind `{kind}`")));
    }

    TurnRecord::deserialize(value).map_err(|e| fault(format!("`{kind}` record: {e}")))
}

/// Parse a JSONL history dump. Blank lines are ignored; the first line that
/// is not valid JSON or fails classification aborts with its 1-based number.
pub fn parse_jsonl(raw: &str) -> Result<Vec<TurnRecord>> {
    let mut records = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| Error::Classification {
            line: line_no,
            reason: format!("invalid JSON: {e}"),
        })?;
        records.push(classify_at(line_no, &value)?);
    }
    Ok(records)
}

/// Materialize records into transcript entries, one-to-one and in order.
pub fn decode(records: &[TurnRecord]) -> Vec<Message> {
    records.iter().map(to_entry).collect()
}

/// The transcript entry for a single record.
pub fn to_entry(record: &TurnRecord) -> Message {
    match &record.turn {
        Turn::User { text } => Message::user(text.clone()),
        Turn::Model { text } => Message::model(text.clone()),
        Turn::Function { name, args } => Message::function_call(name.clone(), args.clone()),
        Turn::FunctionResponse { name, response } => {
            Message::function_response(name.clone(), response.clone())
        }
    }
}

/// Inverse of [`to_entry`]: stamp a transcript entry with `time`.
///
/// The content decides the shape; for text entries the role picks between
/// `model` and `user`.
pub fn encode(entry: &Message, time: DateTime<Utc>) -> TurnRecord {
    let turn = match &entry.content {
        Content::Text { text } => match entry.role {
            Role::Model => Turn::Model { text: text.clone() },
            Role::User | Role::Function => Turn::User { text: text.clone() },
        },
        Content::FunctionCall { name, args } => Turn::Function {
            name: name.clone(),
            args: args.clone(),
        },
        Content::FunctionResponse { name, response } => Turn::FunctionResponse {
            name: name.clone(),
            response: response.clone(),
        },
    };
    TurnRecord { time, turn }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
