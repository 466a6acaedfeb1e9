//! OpenAI-compatible LLM Provider
//!
//! Talks to any `/chat/completions` endpoint that follows the OpenAI wire
//! format. Tools are sent as functions; each handoff target becomes a
//! `transfer_to_<agent>` function so the model can pick it natively.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use switchboard_core::{
    error::{AgentError, Result},
    handoff::{HandoffRequest, HandoffSchema},
    message::{Message, Role},
    provider::{
        Completion, CompletionRequest, FinishReason, LlmProvider, ModelInfo, ModelResponse,
        TokenUsage,
    },
    tool::{ToolCall, ToolSchema},
};

const TRANSFER_PREFIX: &str = "transfer_to_";

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Bearer token
    pub api_key: String,

    /// API root, without the trailing `/chat/completions`
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 60,
        }
    }

    /// Read `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY is not set".into()))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// OpenAI-compatible LLM provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    /// Build the chat-completions request body
    fn build_body(request: &CompletionRequest<'_>) -> Value {
        let mut messages = vec![json!({"role": "system", "content": request.instructions})];
        messages.extend(request.messages.iter().map(convert_message));

        let functions: Vec<Value> = request
            .tools
            .iter()
            .map(tool_function)
            .chain(request.handoffs.iter().map(handoff_function))
            .collect();

        let opts = request.options;
        let mut body = json!({
            "model": opts.model,
            "messages": messages,
            "temperature": opts.temperature,
            "top_p": opts.top_p,
            "max_tokens": opts.max_tokens,
        });
        if !opts.stop_sequences.is_empty() {
            body["stop"] = json!(opts.stop_sequences);
        }
        if !functions.is_empty() {
            body["tools"] = Value::Array(functions);
        }
        body
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        let message = format!("{status}: {detail}");
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(AgentError::ProviderUnavailable(message))
        } else {
            Err(AgentError::Provider(message))
        }
    }
}

fn convert_message(m: &Message) -> Value {
    match m.role {
        Role::System => json!({"role": "system", "content": m.content}),
        Role::User => json!({"role": "user", "content": m.content}),
        Role::Tool => json!({
            "role": "tool",
            "content": m.content,
            "tool_call_id": m.tool_call_id,
        }),
        Role::Assistant if m.has_tool_calls() => {
            let calls: Vec<WireToolCall> = m
                .tool_calls
                .iter()
                .map(|c| WireToolCall {
                    id: c.id.clone(),
                    kind: "function".into(),
                    function: WireFunction {
                        name: c.name.clone(),
                        arguments: c.arguments.to_string(),
                    },
                })
                .collect();
            let content = (!m.content.is_empty()).then(|| m.content.clone());
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        // Handoffs are replayed as plain text; they have no tool reply to pair with
        Role::Assistant => json!({"role": "assistant", "content": m.content}),
    }
}

fn tool_function(schema: &ToolSchema) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": schema.name,
            "description": schema.description,
            "parameters": schema.input.to_json_schema(),
        }
    })
}

fn handoff_function(schema: &HandoffSchema) -> Value {
    let parameters = schema
        .input
        .as_ref()
        .map_or_else(|| json!({"type": "object", "properties": {}}), |i| i.to_json_schema());
    json!({
        "type": "function",
        "function": {
            "name": format!("{TRANSFER_PREFIX}{}", schema.name),
            "description": format!("Hand the conversation to `{}`: {}", schema.name, schema.description),
            "parameters": parameters,
        }
    })
}

/// Interpret one response choice. A transfer call wins over ordinary tool calls.
fn decode_choice(message: WireResponseMessage) -> ModelResponse {
    let content = message.content.unwrap_or_default();
    let calls = message.tool_calls.unwrap_or_default();

    if let Some(transfer) = calls
        .iter()
        .find(|c| c.function.name.starts_with(TRANSFER_PREFIX))
    {
        let target = &transfer.function.name[TRANSFER_PREFIX.len()..];
        let mut request = HandoffRequest::new(target);
        if !transfer.function.arguments.trim().is_empty() {
            request.payload = Some(parse_arguments(&transfer.function.arguments));
        }
        return ModelResponse::Handoff(request);
    }

    if calls.is_empty() {
        return ModelResponse::Text(content);
    }

    ModelResponse::ToolCalls {
        content,
        calls: calls
            .into_iter()
            .map(|c| {
                let arguments = parse_arguments(&c.function.arguments);
                ToolCall::new(c.function.name, arguments).with_id(c.id)
            })
            .collect(),
    }
}

/// Malformed argument JSON is passed on as a string so validation reports it
fn parse_arguments(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn finish_reason(raw: &str) -> Option<FinishReason> {
    match raw {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolUse),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

fn convert_response(response: ChatResponse) -> Result<Completion> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::Provider("response contained no choices".into()))?;

    Ok(Completion {
        response: decode_choice(choice.message),
        model: response.model,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        finish_reason: choice.finish_reason.as_deref().and_then(finish_reason),
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let body = Self::build_body(request);
        tracing::debug!(agent = request.agent, model = %request.options.model, "chat completion");

        let response = self
            .send(self.client.post(self.config.endpoint("chat/completions")).json(&body))
            .await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("malformed response: {e}")))?;

        convert_response(parsed)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .send(self.client.get(self.config.endpoint("models")))
            .await?;
        let list: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("malformed model list: {e}")))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.id.clone(),
                id: m.id,
                context_length: None,
            })
            .collect())
    }
}
