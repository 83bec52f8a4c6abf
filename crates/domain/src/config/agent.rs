use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent behaviour
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Conversation driver settings: prompt, sampling constants, loop bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Behavioural system prompt sent with every inference call.
    #[serde(default)]
    pub system_prompt: String,
    /// When set, the prompt is read from this file instead.
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    /// Token budget for the model's internal reasoning.
    #[serde(default = "d_thinking_budget")]
    pub thinking_budget: u32,
    /// Maximum tool-call rounds per run before the run is aborted.
    #[serde(default = "d_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// IANA timezone used for trigger selection and timestamp formatting.
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            system_prompt_file: None,
            temperature: d_temperature(),
            thinking_budget: d_thinking_budget(),
            max_tool_rounds: d_max_tool_rounds(),
            timezone: d_timezone(),
        }
    }
}

impl AgentConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| Error::Config(format!("agent.timezone '{}': {e}", self.timezone)))
    }

    /// Resolve the system prompt, preferring `system_prompt_file`.
    pub fn resolve_system_prompt(&self) -> Result<String> {
        match &self.system_prompt_file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("reading system prompt {}: {e}", path.display()))
            }),
            None => Ok(self.system_prompt.clone()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// History store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// JSONL file holding the append-only turn history.
    #[serde(default = "d_history_path")]
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: d_history_path() }
    }
}

impl HistoryConfig {
    /// Sidecar file used for the cross-process run lock.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trigger source
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Morning/evening sentinel chosen by the local hour.
    #[default]
    Sentinel,
    /// The current local time, formatted.
    Timestamp,
    /// A constant configured text.
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub mode: TriggerMode,
    #[serde(default = "d_morning")]
    pub morning: String,
    #[serde(default = "d_evening")]
    pub evening: String,
    /// Hours up to and including this one count as morning.
    #[serde(default = "d_noon_cutoff_hour")]
    pub noon_cutoff_hour: u32,
    /// `chrono` format string for `timestamp` mode.
    #[serde(default = "d_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default)]
    pub fixed_text: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            mode: TriggerMode::Sentinel,
            morning: d_morning(),
            evening: d_evening(),
            noon_cutoff_hour: d_noon_cutoff_hour(),
            timestamp_format: d_timestamp_format(),
            fixed_text: String::new(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_temperature() -> f32 {
    0.9
}
fn d_thinking_budget() -> u32 {
    1024
}
fn d_max_tool_rounds() -> usize {
    25
}
fn d_timezone() -> String {
    "UTC".into()
}
fn d_history_path() -> PathBuf {
    PathBuf::from("data/history.jsonl")
}
fn d_morning() -> String {
    "SEND_MORNING".into()
}
fn d_evening() -> String {
    "SEND_EVENING".into()
}
fn d_noon_cutoff_hour() -> u32 {
    12
}
fn d_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S %Z".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timezone_parses() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.tz().unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn bad_timezone_is_a_config_error() {
        let cfg = AgentConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        let err = cfg.tz().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn prompt_file_overrides_inline_prompt() {
        let dir = std::env::temp_dir().join(format!("td-prompt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prompt.txt");
        std::fs::write(&path, "from file").unwrap();

        let cfg = AgentConfig {
            system_prompt: "inline".into(),
            system_prompt_file: Some(path),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_system_prompt().unwrap(), "from file");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn lock_path_is_a_sidecar() {
        let cfg = HistoryConfig {
            path: PathBuf::from("/var/lib/tidings/history.jsonl"),
        };
        assert_eq!(
            cfg.lock_path(),
            PathBuf::from("/var/lib/tidings/history.jsonl.lock")
        );
    }
}
