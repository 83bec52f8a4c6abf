//! Conversation driver: the function-calling loop.
//!
//! A run replays the persisted history into a transcript, appends the
//! trigger turn, then alternates inference and tool execution until the
//! model answers with plain text. Each transition appends exactly one
//! record to the history store *before* the transcript is extended, so a
//! failed append leaves both in agreement.
//!
//! ```text
//! AwaitTrigger ─▶ TurnAppended ─▶ Inferring ─┬─▶ Terminal(reply)
//!                                    ▲       └─▶ ToolCalled(call)
//!                                    │                 │
//!                                    └── ToolExecuted ◀┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::Instrument;

use td_domain::config::AgentConfig;
use td_domain::error::{Error, Result};
use td_domain::record::{FunctionResult, Turn, TurnRecord};
use td_domain::tool::{Message, ToolCall};
use td_domain::trace::TraceEvent;
use td_history::codec;
use td_history::HistoryStore;
use td_providers::{ChatRequest, LlmProvider};
use td_tools::{ToolOutcome, ToolRegistry};

/// Result recorded for a tool call whose run stopped before it finished.
pub const INTERRUPTED_RESULT: &str = "An error occurred: run interrupted";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Clock
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Source of record timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    AwaitTrigger,
    TurnAppended,
    Inferring,
    ToolCalled(ToolCall),
    ToolExecuted,
    Terminal(String),
}

/// Inference parameters sent with every request.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub system_prompt: String,
    pub temperature: f32,
    pub thinking_budget: u32,
    pub max_tool_rounds: usize,
    /// Model override; the provider default when `None`.
    pub model: Option<String>,
}

impl DriverSettings {
    pub fn from_config(agent: &AgentConfig, system_prompt: String) -> Self {
        Self {
            system_prompt,
            temperature: agent.temperature,
            thinking_budget: agent.thinking_budget,
            max_tool_rounds: agent.max_tool_rounds,
            model: None,
        }
    }
}

/// Result of one trigger-to-reply pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub reply: String,
    /// Tool calls executed.
    pub tool_rounds: usize,
    /// Executed calls whose outcome was a failure.
    pub tool_failures: usize,
    /// Records appended to the store.
    pub appended: usize,
}

/// Transcript materialized from the store, extended as a run progresses.
pub struct Conversation {
    transcript: Vec<Message>,
    last_time: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Driver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Driver {
    llm: Arc<dyn LlmProvider>,
    history: Arc<dyn HistoryStore>,
    tools: Arc<ToolRegistry>,
    settings: DriverSettings,
    clock: Arc<dyn Clock>,
}

impl Driver {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        history: Arc<dyn HistoryStore>,
        tools: Arc<ToolRegistry>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            llm,
            history,
            tools,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.settings.model = model;
        self
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Load the history and materialize the transcript.
    ///
    /// A history ending in a `function` record belongs to a run that was cut
    /// off before the tool result was stored; it is answered with an error
    /// result first so the transcript stays well formed.
    pub async fn open(&self) -> Result<Conversation> {
        let records = self.history.load().await?;
        let mut conv = Conversation {
            transcript: codec::decode(&records),
            last_time: records.last().map(|r| r.time),
        };

        if let Some(Turn::Function { name, .. }) = records.last().map(|r| &r.turn) {
            tracing::warn!(
                store = %self.history.identity(),
                tool_name = %name,
                "history ends with an unanswered tool call, recording it as interrupted"
            );
            let rec = TurnRecord::function_response(
                name.clone(),
                FunctionResult::new(INTERRUPTED_RESULT),
                self.stamp(&mut conv),
            );
            self.commit(&mut conv, rec).await?;
        }

        Ok(conv)
    }

    /// One complete run: load history, then drive `trigger` to a reply.
    pub async fn run(&self, trigger: &str) -> Result<RunOutcome> {
        let span = tracing::info_span!(
            "run",
            store = %self.history.identity(),
            trigger = %trigger,
        );
        async {
            let mut conv = self.open().await?;
            self.respond(&mut conv, trigger).await
        }
        .instrument(span)
        .await
    }

    /// Drive one trigger through the state machine on an open conversation.
    ///
    /// Continuous callers (the chat REPL) call this repeatedly on the same
    /// [`Conversation`].
    pub async fn respond(&self, conv: &mut Conversation, trigger: &str) -> Result<RunOutcome> {
        TraceEvent::RunStarted {
            store: self.history.identity().to_owned(),
            trigger: trigger.to_owned(),
            history_len: conv.len(),
        }
        .emit();

        let mut tool_rounds = 0usize;
        let mut tool_failures = 0usize;
        let mut appended = 0usize;
        let mut state = DriverState::AwaitTrigger;

        let reply = loop {
            state = match state {
                DriverState::AwaitTrigger => {
                    let rec = TurnRecord::user(trigger, self.stamp(conv));
                    self.commit(conv, rec).await?;
                    appended += 1;
                    DriverState::TurnAppended
                }

                DriverState::TurnAppended | DriverState::ToolExecuted => DriverState::Inferring,

                DriverState::Inferring => {
                    let resp = self.infer(conv).await?;

                    let mut calls = resp.tool_calls.into_iter();
                    match calls.next() {
                        Some(call) => {
                            let dropped = calls.count();
                            if dropped > 0 {
                                tracing::warn!(
                                    dropped,
                                    honoured = %call.tool_name,
                                    "model requested several tool calls, only the first is executed"
                                );
                            }
                            if !resp.text.is_empty() {
                                tracing::debug!("response carried text alongside a tool call, ignoring text");
                            }
                            if tool_rounds >= self.settings.max_tool_rounds {
                                tracing::error!(
                                    rounds = tool_rounds,
                                    tool_name = %call.tool_name,
                                    "tool loop limit reached, aborting run"
                                );
                                return Err(Error::ToolLoopLimit { rounds: tool_rounds });
                            }

                            let rec = TurnRecord::function_call(
                                call.tool_name.clone(),
                                call.string_args(),
                                self.stamp(conv),
                            );
                            self.commit(conv, rec).await?;
                            appended += 1;
                            DriverState::ToolCalled(call)
                        }
                        None => {
                            let rec = TurnRecord::model(resp.text.clone(), self.stamp(conv));
                            self.commit(conv, rec).await?;
                            appended += 1;
                            DriverState::Terminal(resp.text)
                        }
                    }
                }

                DriverState::ToolCalled(call) => {
                    let outcome = self
                        .tools
                        .invoke_detailed(&call.tool_name, &call.string_args())
                        .await;
                    tool_rounds += 1;
                    if let ToolOutcome::Failure { kind, message } = &outcome {
                        tool_failures += 1;
                        tracing::warn!(
                            tool_name = %call.tool_name,
                            kind = kind.as_str(),
                            error = %message,
                            "tool failed, reporting the error to the model"
                        );
                    }
                    let result = outcome.into_function_result();

                    let rec =
                        TurnRecord::function_response(call.tool_name, result, self.stamp(conv));
                    self.commit(conv, rec).await?;
                    appended += 1;
                    DriverState::ToolExecuted
                }

                DriverState::Terminal(reply) => break reply,
            };
        };

        TraceEvent::RunFinished {
            store: self.history.identity().to_owned(),
            tool_rounds,
            appended,
        }
        .emit();

        Ok(RunOutcome {
            reply,
            tool_rounds,
            tool_failures,
            appended,
        })
    }

    // ── Private helpers ───────────────────────────────────────────────

    /// Next record timestamp, never earlier than the previous one.
    fn stamp(&self, conv: &mut Conversation) -> DateTime<Utc> {
        let now = self.clock.now();
        let t = match conv.last_time {
            Some(last) if last > now => last,
            _ => now,
        };
        conv.last_time = Some(t);
        t
    }

    /// Persist first, then extend the transcript.
    async fn commit(&self, conv: &mut Conversation, rec: TurnRecord) -> Result<()> {
        if let Err(e) = self.history.append(&rec).await {
            tracing::error!(kind = rec.kind(), error = %e, "history append failed, aborting run");
            return Err(e);
        }
        conv.transcript.push(codec::to_entry(&rec));
        Ok(())
    }

    async fn infer(&self, conv: &Conversation) -> Result<td_providers::ChatResponse> {
        let req = ChatRequest {
            messages: conv.transcript.clone(),
            tools: self.tools.definitions().to_vec(),
            system_prompt: Some(self.settings.system_prompt.clone()),
            temperature: Some(self.settings.temperature),
            thinking_budget: Some(self.settings.thinking_budget),
            model: self.settings.model.clone(),
        };

        let llm_call_span = tracing::info_span!(
            "llm.call",
            "otel.kind" = "CLIENT",
            provider = %self.llm.provider_id(),
            model = req.model.as_deref().unwrap_or("default"),
            input_tokens = tracing::field::Empty,
            output_tokens = tracing::field::Empty,
        );

        let started = Instant::now();
        let result = self.llm.chat(&req).instrument(llm_call_span.clone()).await;

        match result {
            Ok(resp) => {
                if let Some(usage) = resp.usage {
                    llm_call_span.record("input_tokens", usage.prompt_tokens);
                    llm_call_span.record("output_tokens", usage.completion_tokens);
                }
                tracing::debug!(
                    duration_ms = started.elapsed().as_millis() as u64,
                    tool_calls = resp.tool_calls.len(),
                    "inference complete"
                );
                Ok(resp)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    connectivity = e.is_connectivity(),
                    "inference failed, aborting run"
                );
                Err(e)
            }
        }
    }
}
