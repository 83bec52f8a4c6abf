mod agent;
mod llm;
mod notify;
mod observability;
mod server;

pub use agent::*;
pub use llm::*;
pub use notify::*;
pub use observability::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process configuration, built once at startup and shared by `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: &str, message: String| {
            errors.push(ConfigError {
                severity,
                field: field.into(),
                message,
            });
        };

        // ── agent ──────────────────────────────────────────────────────
        if let Err(e) = self.agent.tz() {
            push(ConfigSeverity::Error, "agent.timezone", e.to_string());
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            push(
                ConfigSeverity::Error,
                "agent.temperature",
                "temperature must be between 0.0 and 2.0".into(),
            );
        }
        if self.agent.max_tool_rounds == 0 {
            push(
                ConfigSeverity::Error,
                "agent.max_tool_rounds",
                "at least one tool round is required".into(),
            );
        }
        if self.agent.system_prompt.trim().is_empty() && self.agent.system_prompt_file.is_none() {
            push(
                ConfigSeverity::Warning,
                "agent.system_prompt",
                "no system prompt configured".into(),
            );
        }

        // ── llm ────────────────────────────────────────────────────────
        if self.llm.base_url.is_empty() {
            push(ConfigSeverity::Error, "llm.base_url", "base_url must not be empty".into());
        }
        if self.llm.default_model.is_empty() {
            push(
                ConfigSeverity::Error,
                "llm.default_model",
                "default_model must not be empty".into(),
            );
        }

        // ── history ────────────────────────────────────────────────────
        if self.history.path.as_os_str().is_empty() {
            push(ConfigSeverity::Error, "history.path", "path must not be empty".into());
        }

        // ── notify ─────────────────────────────────────────────────────
        if self.notify.kind == NotifyKind::HttpRelay {
            if self.notify.endpoint.is_empty() {
                push(
                    ConfigSeverity::Error,
                    "notify.endpoint",
                    "http_relay requires an endpoint".into(),
                );
            }
            if self.notify.recipient.is_empty() {
                push(
                    ConfigSeverity::Warning,
                    "notify.recipient",
                    "no recipient configured; the relay must supply a default".into(),
                );
            }
        }

        // ── trigger ────────────────────────────────────────────────────
        if self.trigger.noon_cutoff_hour > 23 {
            push(
                ConfigSeverity::Error,
                "trigger.noon_cutoff_hour",
                "hour must be between 0 and 23".into(),
            );
        }
        if self.trigger.mode == TriggerMode::Fixed && self.trigger.fixed_text.is_empty() {
            push(
                ConfigSeverity::Error,
                "trigger.fixed_text",
                "fixed mode requires fixed_text".into(),
            );
        }

        // ── server ─────────────────────────────────────────────────────
        if self.server.port == 0 {
            push(ConfigSeverity::Error, "server.port", "port must be greater than 0".into());
        }
        if !self.server.endpoint.starts_with('/') {
            push(
                ConfigSeverity::Error,
                "server.endpoint",
                "endpoint must start with '/'".into(),
            );
        }

        // ── observability ──────────────────────────────────────────────
        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            push(
                ConfigSeverity::Error,
                "observability.sample_rate",
                "sample_rate must be between 0.0 and 1.0".into(),
            );
        }

        errors
    }
}
