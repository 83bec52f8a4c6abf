//! Import of key-shaped legacy documents.
//!
//! Older deployments stored each turn as a document whose *shape* told what
//! it was: `{"user": "..."}`, `{"model": "..."}`, `{"function": {name, args}}`
//! or `{"function_response": {name, response}}`, each next to a `time`.
//! This module is the only place that shape is sniffed; the result is a list
//! of tagged [`TurnRecord`]s ready to append to a [`crate::HistoryStore`].
//!
//! `time` may be an RFC 3339 string or a Mongo extended-JSON date
//! (`{"$date": "..."}` or `{"$date": {"$numberLong": "<millis>"}}`).

use chrono::{DateTime, Utc};
use serde_json::Value;
use td_domain::error::{Error, Result};
use td_domain::record::{FunctionResult, ToolArgs, Turn, TurnRecord};

/// Convert a JSON-lines legacy export. The returned records are sorted by
/// time (stable). The first unrecognizable line aborts the import.
pub fn parse_legacy_jsonl(raw: &str) -> Result<Vec<TurnRecord>> {
    let mut records = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fault = |reason: String| Error::Classification { line: line_no, reason };
        let doc: Value =
            serde_json::from_str(line).map_err(|e| fault(format!("invalid JSON: {e}")))?;
        records.push(convert(&doc).map_err(fault)?);
    }
    records.sort_by_key(|r| r.time);
    Ok(records)
}

fn convert(doc: &Value) -> std::result::Result<TurnRecord, String> {
    let obj = doc.as_object().ok_or("document is not a JSON object")?;
    let time = parse_time(obj.get("time").ok_or("missing `time`")?)?;

    let turn = if let Some(v) = obj.get("user") {
        Turn::User { text: text_of(v, "user")? }
    } else if let Some(v) = obj.get("model") {
        Turn::Model { text: text_of(v, "model")? }
    } else if let Some(v) = obj.get("function") {
        Turn::Function {
            name: name_of(v, "function")?,
            args: args_of(v.get("args")),
        }
    } else if let Some(v) = obj.get("function_response") {
        Turn::FunctionResponse {
            name: name_of(v, "function_response")?,
            response: response_of(v.get("response")),
        }
    } else {
        return Err("none of `user`, `model`, `function`, `function_response` present".into());
    };

    Ok(TurnRecord { time, turn })
}

/// Text of a `user`/`model` document. `null` was written when the model
/// returned no text part and reads as an empty turn.
fn text_of(v: &Value, key: &str) -> std::result::Result<String, String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        _ => Err(format!("`{key}` must be a string or null")),
    }
}

fn name_of(v: &Value, key: &str) -> std::result::Result<String, String> {
    v.get("name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| format!("`{key}.name` missing or not a string"))
}

fn args_of(v: Option<&Value>) -> ToolArgs {
    let mut args = ToolArgs::new();
    if let Some(Value::Object(map)) = v {
        for (k, v) in map {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            args.insert(k.clone(), text);
        }
    }
    args
}

fn response_of(v: Option<&Value>) -> FunctionResult {
    match v {
        Some(Value::Object(map)) => match map.get("result") {
            Some(Value::String(s)) => FunctionResult::new(s.clone()),
            Some(other) => FunctionResult::new(other.to_string()),
            None => FunctionResult::new(Value::Object(map.clone()).to_string()),
        },
        Some(Value::String(s)) => FunctionResult::new(s.clone()),
        Some(other) => FunctionResult::new(other.to_string()),
        None => FunctionResult::new(String::new()),
    }
}

fn parse_time(v: &Value) -> std::result::Result<DateTime<Utc>, String> {
    match v {
        Value::String(s) => parse_rfc3339(s),
        Value::Object(map) => match map.get("$date") {
            Some(Value::String(s)) => parse_rfc3339(s),
            Some(Value::Object(inner)) => {
                let millis = inner
                    .get("$numberLong")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or("`time.$date.$numberLong` is not an integer string")?;
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or_else(|| format!("timestamp {millis} out of range"))
            }
            _ => Err("unsupported `time` object".into()),
        },
        _ => Err("`time` must be a string or a `$date` object".into()),
    }
}

fn parse_rfc3339(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad time `{s}`: {e}"))
}
