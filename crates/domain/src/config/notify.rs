use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::AuthConfig;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notification sink (the `send_email` tool)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    /// Append messages to a local JSONL outbox.
    #[default]
    Outbox,
    /// POST messages to an HTTP mail relay.
    HttpRelay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub kind: NotifyKind,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    /// Relay URL (`http_relay` only).
    #[serde(default)]
    pub endpoint: String,
    /// Bearer key for the relay; unauthenticated when absent.
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default = "d_outbox_path")]
    pub outbox_path: PathBuf,
    /// Description of the tool as advertised to the model.
    #[serde(default = "d_tool_description")]
    pub tool_description: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            kind: NotifyKind::Outbox,
            sender: String::new(),
            recipient: String::new(),
            endpoint: String::new(),
            auth: None,
            outbox_path: d_outbox_path(),
            tool_description: d_tool_description(),
        }
    }
}

fn d_outbox_path() -> PathBuf {
    PathBuf::from("data/outbox.jsonl")
}
fn d_tool_description() -> String {
    "sends email to end user".into()
}
