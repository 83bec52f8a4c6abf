//! AppState construction shared by `serve`, `run` and `chat`.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::task::TaskTracker;

use td_domain::config::{Config, ConfigSeverity, NotifyKind};
use td_history::{HistoryStore, JsonlHistoryStore};
use td_providers::{GoogleProvider, LlmProvider};
use td_tools::{HttpRelaySink, NotificationSink, OutboxSink, SendEmailTool, Tool, ToolRegistry};

use crate::runtime::{Driver, DriverSettings, RunLockMap, TriggerSource};
use crate::state::AppState;

/// Validate config, initialize every collaborator and return a fully-wired
/// [`AppState`]. `model` overrides `llm.default_model` for this process.
pub fn build_app_state(config: Arc<Config>, model: Option<String>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── LLM provider ─────────────────────────────────────────────────
    let llm: Arc<dyn LlmProvider> = Arc::new(
        GoogleProvider::from_config(&config.llm).context("initializing Gemini provider")?,
    );
    tracing::info!(
        provider = %config.llm.id,
        model = %config.llm.default_model,
        "LLM provider ready"
    );

    // ── History store ────────────────────────────────────────────────
    let history: Arc<dyn HistoryStore> = Arc::new(JsonlHistoryStore::new(&config.history.path));
    tracing::info!(path = %config.history.path.display(), "history store ready");

    // ── Tools ────────────────────────────────────────────────────────
    let tools = Arc::new(build_tool_registry(&config)?);

    // ── Driver ───────────────────────────────────────────────────────
    let system_prompt = config
        .agent
        .resolve_system_prompt()
        .context("loading system prompt")?;
    let settings = DriverSettings::from_config(&config.agent, system_prompt);
    let driver = Arc::new(Driver::new(llm, history, tools, settings).with_model(model));

    let trigger = Arc::new(
        TriggerSource::from_config(&config.trigger, &config.agent)
            .context("initializing trigger source")?,
    );

    Ok(AppState {
        config,
        driver,
        trigger,
        run_locks: Arc::new(RunLockMap::new()),
        runs: TaskTracker::new(),
    })
}

/// Build the notification sink and the tool registry around it.
pub fn build_tool_registry(config: &Config) -> anyhow::Result<ToolRegistry> {
    let notify = &config.notify;
    let sink: Arc<dyn NotificationSink> = match notify.kind {
        NotifyKind::HttpRelay => {
            let bearer = notify
                .auth
                .as_ref()
                .map(td_providers::resolve_api_key)
                .transpose()
                .context("resolving notify.auth")?;
            tracing::info!(endpoint = %notify.endpoint, "notification sink: http relay");
            Arc::new(HttpRelaySink::new(
                notify.endpoint.clone(),
                notify.sender.clone(),
                notify.recipient.clone(),
                bearer,
            )?)
        }
        NotifyKind::Outbox => {
            tracing::info!(path = %notify.outbox_path.display(), "notification sink: local outbox");
            Arc::new(OutboxSink::new(
                notify.outbox_path.clone(),
                notify.recipient.clone(),
            ))
        }
    };

    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(SendEmailTool::new(
        sink,
        notify.tool_description.clone(),
    ))];
    let registry = ToolRegistry::new(tools)?;
    tracing::info!(tools = registry.len(), "tool registry ready");
    Ok(registry)
}
