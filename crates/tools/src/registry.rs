//! Tool registry: definitions for the model, fault-isolated dispatch.
//!
//! Every failure a tool can produce, including a panic inside it, is turned
//! into a [`ToolOutcome::Failure`]. The registry boundary then renders it as
//! the text the model receives: `"An error occurred: <message>"`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tracing::Instrument;

use td_domain::error::{Error, Result};
use td_domain::record::{FunctionResult, ToolArgs};
use td_domain::tool::ToolDefinition;
use td_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Required arguments missing or unusable.
    InvalidArguments,
    /// The downstream collaborator (mail relay, outbox) failed.
    Sink,
    /// The model asked for a tool that is not registered.
    UnknownTool,
    /// The tool panicked.
    Panicked,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::InvalidArguments => "invalid_arguments",
            FailureKind::Sink => "sink",
            FailureKind::UnknownTool => "unknown_tool",
            FailureKind::Panicked => "panicked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Failure { kind: FailureKind, message: String },
}

impl ToolOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ToolOutcome::Failure { kind, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    /// Render as the payload of a `function_response` turn.
    pub fn into_function_result(self) -> FunctionResult {
        match self {
            ToolOutcome::Success(text) => FunctionResult::new(text),
            ToolOutcome::Failure { message, .. } => {
                FunctionResult::new(format!("An error occurred: {message}"))
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Schema advertised to the model. Called once, at registry construction.
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, args: &ToolArgs) -> ToolOutcome;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Immutable set of tools, built once per process.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Build the registry. Two tools advertising the same name is a
    /// configuration error.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        let mut by_name: HashMap<String, Arc<dyn Tool>> = HashMap::new();
        let mut definitions = Vec::with_capacity(tools.len());

        for tool in tools {
            let def = tool.definition();
            if by_name.contains_key(&def.name) {
                return Err(Error::Config(format!("duplicate tool name '{}'", def.name)));
            }
            by_name.insert(def.name.clone(), tool);
            definitions.push(def);
        }

        Ok(Self { tools: by_name, definitions })
    }

    /// Tool schemas in registration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Execute a tool and render its outcome. Never fails.
    pub async fn invoke(&self, name: &str, args: &ToolArgs) -> FunctionResult {
        self.invoke_detailed(name, args).await.into_function_result()
    }

    /// Execute a tool, keeping the failure kind.
    pub async fn invoke_detailed(&self, name: &str, args: &ToolArgs) -> ToolOutcome {
        let span = tracing::info_span!("tool.call", tool_name = %name);
        async {
            let started = Instant::now();

            let outcome = match self.tools.get(name) {
                None => ToolOutcome::failure(
                    FailureKind::UnknownTool,
                    format!("unknown tool '{name}'"),
                ),
                Some(tool) => match AssertUnwindSafe(tool.call(args)).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => ToolOutcome::failure(
                        FailureKind::Panicked,
                        format!("tool '{name}' panicked: {}", panic_message(payload.as_ref())),
                    ),
                },
            };

            if let ToolOutcome::Failure { kind, message } = &outcome {
                tracing::debug!(kind = kind.as_str(), error = %message, "tool call failed");
            }

            TraceEvent::ToolInvoked {
                tool_name: name.to_owned(),
                ok: outcome.is_success(),
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();

            outcome
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
