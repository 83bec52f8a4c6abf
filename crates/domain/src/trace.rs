use serde::Serialize;

/// Structured trace events emitted across all Tidings crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    RunStarted {
        store: String,
        trigger: String,
        history_len: usize,
    },
    RecordAppended {
        store: String,
        kind: String,
    },
    LlmRequest {
        provider: String,
        model: String,
        messages: usize,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ToolInvoked {
        tool_name: String,
        ok: bool,
        duration_ms: u64,
    },
    RunFinished {
        store: String,
        tool_rounds: usize,
        appended: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "td_event");
    }
}
