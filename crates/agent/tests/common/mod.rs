//! Shared fixtures: a scripted provider, a recording sink, a stepping clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use td_agent::runtime::{Clock, Driver, DriverSettings};
use td_domain::error::{Error, Result};
use td_domain::record::{ToolArgs, TurnRecord};
use td_domain::tool::{ToolCall, ToolDefinition};
use td_history::HistoryStore;
use td_providers::{ChatRequest, ChatResponse, LlmProvider};
use td_tools::{NotificationSink, SendEmailTool, Tool, ToolOutcome, ToolRegistry};

// ── Provider ──────────────────────────────────────────────────────────

/// Replays a fixed list of responses and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ChatResponse>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ChatResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().push(req.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("script exhausted".into())))
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

pub fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        call_id: format!("call_{name}"),
        tool_name: name.into(),
        arguments: args,
    }
}

pub fn email_call(subject: &str, body: &str) -> Result<ChatResponse> {
    Ok(ChatResponse::tool_call(call(
        "send_email",
        serde_json::json!({ "subject": subject, "body": body }),
    )))
}

pub fn text(reply: &str) -> Result<ChatResponse> {
    Ok(ChatResponse::text(reply))
}

// ── Sinks and tools ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().push((subject.into(), body.into()));
        Ok(())
    }
}

/// Records like [`RecordingSink`] but only after sleeping for `delay`.
pub struct SlowSink {
    pub delay: std::time::Duration,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl SlowSink {
    pub fn new(delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self { delay, sent: Mutex::new(Vec::new()) })
    }
}

#[async_trait::async_trait]
impl NotificationSink for SlowSink {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.sent.lock().push((subject.into(), body.into()));
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait::async_trait]
impl NotificationSink for FailingSink {
    async fn send(&self, _subject: &str, _body: &str) -> Result<()> {
        Err(Error::Notify("relay unreachable: connection refused".into()))
    }
}

/// Tool that panics whenever it is called.
pub struct PanickingTool;

#[async_trait::async_trait]
impl Tool for PanickingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "explode".into(),
            description: "panics".into(),
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    async fn call(&self, _args: &ToolArgs) -> ToolOutcome {
        panic!("tool blew up")
    }
}

pub fn email_registry(sink: Arc<dyn NotificationSink>) -> Arc<ToolRegistry> {
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(SendEmailTool::new(sink, "sends email to end user"))];
    Arc::new(ToolRegistry::new(tools).unwrap())
}

// ── Clock ─────────────────────────────────────────────────────────────

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap()
}

/// Advances by `step` seconds on every reading. A negative step runs
/// backwards.
pub struct StepClock {
    start: DateTime<Utc>,
    step: i64,
    ticks: AtomicI64,
}

impl StepClock {
    pub fn new(start: DateTime<Utc>, step: i64) -> Arc<Self> {
        Arc::new(Self { start, step, ticks: AtomicI64::new(0) })
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::seconds(n * self.step)
    }
}

// ── Driver ────────────────────────────────────────────────────────────

pub fn settings(max_tool_rounds: usize) -> DriverSettings {
    DriverSettings {
        system_prompt: "You write one short email a day.".into(),
        temperature: 0.9,
        thinking_budget: 1024,
        max_tool_rounds,
        model: None,
    }
}

pub fn driver(
    provider: Arc<ScriptedProvider>,
    store: Arc<dyn HistoryStore>,
    tools: Arc<ToolRegistry>,
    max_tool_rounds: usize,
) -> Driver {
    Driver::new(provider, store, tools, settings(max_tool_rounds))
        .with_clock(StepClock::new(t0(), 1))
}

/// Asserts every `function` record is immediately followed by its response.
pub fn assert_paired(records: &[TurnRecord]) {
    for (i, rec) in records.iter().enumerate() {
        if rec.kind() == "function" {
            let next = records
                .get(i + 1)
                .unwrap_or_else(|| panic!("function record at {i} has no successor"));
            assert_eq!(next.kind(), "function_response", "record {} breaks pairing", i + 1);
            assert_eq!(next.turn.tool_name(), rec.turn.tool_name());
        }
    }
}

pub fn assert_monotonic(records: &[TurnRecord]) {
    for pair in records.windows(2) {
        assert!(pair[0].time <= pair[1].time, "timestamps went backwards");
    }
}
