//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Ollama chat is
//! text-only here, so tools and handoffs are described in the system prompt and
//! the reply is decoded from fenced JSON blocks.

use std::collections::HashMap;

use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
    models::ModelOptions as OllamaOptions,
};
use switchboard_core::{
    error::{AgentError, Result},
    handoff,
    message::{Message, Role},
    provider::{
        Completion, CompletionRequest, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ModelResponse, TokenUsage,
    },
    tool,
};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);

        Self { host, port }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host, config.port),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// System prompt: agent instructions plus tool and handoff catalogues
    fn system_prompt(request: &CompletionRequest<'_>) -> String {
        let mut prompt = request.instructions.to_string();
        if !request.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&tool::prompt_section(&request.tools));
        }
        if !request.handoffs.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&handoff::prompt_section(&request.handoffs));
        }
        prompt
    }

    /// Convert the transcript to Ollama chat messages
    fn convert_messages(request: &CompletionRequest<'_>) -> Vec<ChatMessage> {
        let mut tool_names: HashMap<&str, &str> = HashMap::new();
        let mut converted = vec![ChatMessage::new(
            MessageRole::System,
            Self::system_prompt(request),
        )];

        for m in request.messages {
            let (role, content) = match m.role {
                Role::System => (MessageRole::System, m.content.clone()),
                Role::User => (MessageRole::User, m.content.clone()),
                Role::Assistant => {
                    for call in &m.tool_calls {
                        tool_names.insert(&call.id, &call.name);
                    }
                    (MessageRole::Assistant, render_assistant(m))
                }
                // Tools appear as user context
                Role::Tool => {
                    let name = m
                        .tool_call_id
                        .as_deref()
                        .and_then(|id| tool_names.get(id).copied())
                        .unwrap_or("tool");
                    (
                        MessageRole::User,
                        format!("[Tool '{name}' returned]\n{}", m.content),
                    )
                }
            };
            converted.push(ChatMessage::new(role, content));
        }

        converted
    }

    /// Convert Ollama response to a decoded completion
    fn convert_completion(response: ChatMessageResponse, model: &str) -> Completion {
        let usage = response.final_data.as_ref().map(|d| {
            let prompt = u32::try_from(d.prompt_eval_count).unwrap_or(u32::MAX);
            let completion = u32::try_from(d.eval_count).unwrap_or(u32::MAX);
            TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt.saturating_add(completion),
            }
        });

        let decoded = ModelResponse::decode(&response.message.content);
        let finish_reason = match decoded {
            ModelResponse::Text(_) => FinishReason::Stop,
            _ => FinishReason::ToolUse,
        };

        Completion {
            response: decoded,
            model: model.to_string(),
            usage,
            finish_reason: Some(finish_reason),
        }
    }

    /// Build Ollama generation options
    fn build_options(opts: &GenerationOptions) -> OllamaOptions {
        OllamaOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
            .stop(opts.stop_sequences.clone())
    }
}

/// Render an assistant message back into the fenced protocol it was decoded from
fn render_assistant(m: &Message) -> String {
    let mut out = m.content.clone();
    for call in &m.tool_calls {
        let block = serde_json::json!({
            "tool": call.name,
            "arguments": call.arguments,
            "id": call.id,
        });
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("```tool\n{block}\n```"));
    }
    if let Some(request) = &m.handoff {
        let block = serde_json::json!({
            "agent": request.target,
            "payload": request.payload,
        });
        out = format!("```handoff\n{block}\n```");
    }
    out
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let chat_request = ChatMessageRequest::new(
            request.options.model.clone(),
            Self::convert_messages(request),
        )
        .options(Self::build_options(request.options));

        let response = self
            .client
            .send_chat_messages(chat_request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(Self::convert_completion(response, &request.options.model))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                context_length: None, // Not exposed by Ollama API
            })
            .collect())
    }
}
