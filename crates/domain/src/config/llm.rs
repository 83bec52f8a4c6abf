use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inference provider (Gemini)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Identifier used in logs and error messages.
    #[serde(default = "d_id")]
    pub id: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub default_model: String,
    /// HTTP client timeout for one inference call.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_auth")]
    pub auth: AuthConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            id: d_id(),
            base_url: d_base_url(),
            default_model: d_model(),
            timeout_ms: d_timeout_ms(),
            auth: d_auth(),
        }
    }
}

/// Where to find an API key.
///
/// Resolution order: `keys` (rotation, each entry an env var name), then
/// `key` (plaintext), keychain `service`+`account`, `env`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env or keychain).
    #[serde(default)]
    pub key: Option<String>,
    /// Multiple env var names for round-robin key rotation.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Keychain service name (e.g., "tidings").
    #[serde(default)]
    pub service: Option<String>,
    /// Keychain account name (e.g., "gemini-api-key").
    #[serde(default)]
    pub account: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_id() -> String {
    "google".into()
}
fn d_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn d_model() -> String {
    "gemini-2.5-flash".into()
}
fn d_timeout_ms() -> u64 {
    120_000
}
fn d_auth() -> AuthConfig {
    AuthConfig {
        env: Some("GEMINI_API_KEY".into()),
        ..Default::default()
    }
}
