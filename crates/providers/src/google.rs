//! Gemini `generateContent` adapter with function calling.
//!
//! The request and response bodies are modelled as private serde types; the
//! API key travels in the `key` query parameter and is redacted from logs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use td_domain::config::LlmConfig;
use td_domain::error::{Error, Result};
use td_domain::record::{FunctionResult, ToolArgs};
use td_domain::tool::{Content, Message, Role, ToolCall, ToolDefinition};
use td_domain::trace::TraceEvent;

use crate::auth::AuthRotator;
use crate::traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
use crate::util::{from_reqwest, redact_url_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GoogleProvider {
    id: String,
    base_url: String,
    auth: Arc<AuthRotator>,
    default_model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a new provider from the `[llm]` config section.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let auth = Arc::new(AuthRotator::from_auth_config(&cfg.auth)?);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth,
            default_model: cfg.default_model.clone(),
            client,
        })
    }

    fn generate_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionDeclarations<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: [WirePart<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum WirePart<'a> {
    Text(&'a str),
    FunctionCall { name: &'a str, args: &'a ToolArgs },
    FunctionResponse { name: &'a str, response: &'a FunctionResult },
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionDeclarations<'a> {
    function_declarations: &'a [ToolDefinition],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ResponsePart {
    text: Option<String>,
    thought: bool,
    function_call: Option<ResponseCall>,
}

#[derive(Deserialize)]
struct ResponseCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
    total_token_count: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response mapping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The `generateContent` body for `req`.
pub(crate) fn build_body(req: &ChatRequest) -> Result<Value> {
    let body = GenerateRequest {
        contents: req.messages.iter().map(wire_content).collect(),
        system_instruction: req
            .system_prompt
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|text| SystemInstruction { parts: [TextPart { text }] }),
        tools: if req.tools.is_empty() {
            Vec::new()
        } else {
            vec![FunctionDeclarations { function_declarations: &req.tools }]
        },
        generation_config: GenerationConfig {
            response_mime_type: "text/plain",
            temperature: req.temperature,
            thinking_config: req
                .thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
        },
    };
    Ok(serde_json::to_value(body)?)
}

fn wire_content(msg: &Message) -> WireContent<'_> {
    // Gemini has no function role; tool results go back as user parts.
    let role = match msg.role {
        Role::Model => "model",
        Role::User | Role::Function => "user",
    };
    let part = match &msg.content {
        Content::Text { text } => WirePart::Text(text),
        Content::FunctionCall { name, args } => WirePart::FunctionCall { name, args },
        Content::FunctionResponse { name, response } => {
            WirePart::FunctionResponse { name, response }
        }
    };
    WireContent { role, parts: [part] }
}

/// Map a `generateContent` response body onto a [`ChatResponse`].
///
/// Thought-summary parts are dropped; the remaining text parts are
/// concatenated.
pub(crate) fn parse_gemini_response(provider: &str, raw: &str, model: &str) -> Result<ChatResponse> {
    let resp: GenerateResponse = serde_json::from_str(raw)?;

    let Some(candidate) = resp.candidates.into_iter().next() else {
        let message = match resp.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => format!("prompt blocked: {reason}"),
            None => "no candidates in response".into(),
        };
        return Err(Error::Provider { provider: provider.into(), message });
    };

    let mut out = ChatResponse {
        model: model.to_string(),
        finish_reason: candidate.finish_reason.map(|r| match r.as_str() {
            "STOP" => "stop".into(),
            "MAX_TOKENS" => "length".into(),
            _ => r.to_lowercase(),
        }),
        usage: resp.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u
                .total_token_count
                .unwrap_or(u.prompt_token_count + u.candidates_token_count),
        }),
        ..Default::default()
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for part in parts.into_iter().filter(|p| !p.thought) {
        if let Some(text) = part.text {
            out.text.push_str(&text);
        }
        if let Some(call) = part.function_call {
            out.tool_calls.push(ToolCall {
                call_id: format!("call_{}", uuid::Uuid::new_v4()),
                tool_name: call.name,
                arguments: if call.args.is_null() {
                    Value::Object(Default::default())
                } else {
                    call.args
                },
            });
        }
    }

    Ok(out)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let entry = self.auth.next_key();
        let url = self.generate_url(&model, &entry.key);
        let body = build_body(req)?;
        let started = Instant::now();

        tracing::debug!(
            provider = %self.id,
            url = %redact_url_key(&url),
            messages = req.messages.len(),
            "gemini generate request"
        );

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            if matches!(status.as_u16(), 401 | 403 | 429) {
                self.auth.mark_failed(entry.index);
            }
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let parsed = parse_gemini_response(&self.id, &resp_text, &model)?;

        TraceEvent::LlmRequest {
            provider: self.id.clone(),
            model,
            messages: req.messages.len(),
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: parsed.usage.map(|u| u.prompt_tokens),
            completion_tokens: parsed.usage.map(|u| u.completion_tokens),
        }
        .emit();

        Ok(parsed)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
