//! LLM Provider Strategy Pattern
//!
//! Defines the single "complete one LLM turn" capability the turn executor
//! depends on. Providers (Ollama, OpenAI-compatible endpoints, test stubs)
//! implement [`LlmProvider`] and hand back a decoded [`ModelResponse`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switchboard_core::provider::{CompletionRequest, LlmProvider};
//!
//! let completion = provider.complete(&request).await?;
//! match completion.response {
//!     ModelResponse::Text(text) => println!("{text}"),
//!     other => { /* tool calls or handoff */ }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handoff::{HandoffRequest, HandoffSchema};
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "gpt-4o", "gemini-2.5-flash")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

const fn default_temperature() -> f32 {
    0.7
}
const fn default_max_tokens() -> u32 {
    2048
}
const fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

/// Everything a provider needs for one model round-trip
#[derive(Clone, Debug)]
pub struct CompletionRequest<'a> {
    /// Active agent's name
    pub agent: &'a str,
    /// Active agent's system instructions
    pub instructions: &'a str,
    /// Full transcript so far
    pub messages: &'a [Message],
    /// Active agent's generation settings
    pub options: &'a GenerationOptions,
    /// Tools the active agent may call
    pub tools: Vec<ToolSchema>,
    /// Agents the active agent may hand off to
    pub handoffs: Vec<HandoffSchema>,
}

/// Decoded shape of one model response
#[derive(Clone, Debug, PartialEq)]
pub enum ModelResponse {
    /// Final answer
    Text(String),
    /// One or more tool invocations, with any text that accompanied them
    ToolCalls {
        content: String,
        calls: Vec<ToolCall>,
    },
    /// Transfer to another agent
    Handoff(HandoffRequest),
}

const HANDOFF_FENCE: &str = "```handoff";
const TOOL_FENCE: &str = "```tool";
const FENCE_END: &str = "```";

impl ModelResponse {
    /// Decode a text-only completion.
    ///
    /// Recognises fenced ```` ```handoff ```` and ```` ```tool ```` JSON blocks,
    /// then a bare JSON object carrying a `handoff` or `tool` key. Handoff wins
    /// over tool calls; anything else is plain text.
    pub fn decode(content: &str) -> Self {
        if let Some(request) = fenced_blocks(content, HANDOFF_FENCE)
            .into_iter()
            .find_map(|block| serde_json::from_str::<HandoffRequest>(block).ok())
        {
            return Self::Handoff(request);
        }

        let calls: Vec<ToolCall> = fenced_blocks(content, TOOL_FENCE)
            .into_iter()
            .map(|block| {
                serde_json::from_str::<ToolCall>(block).unwrap_or_else(|_| malformed_call(block))
            })
            .collect();
        if !calls.is_empty() {
            return Self::ToolCalls {
                content: strip_fenced(content).trim().to_string(),
                calls,
            };
        }

        Self::decode_inline(content).unwrap_or_else(|| Self::Text(content.trim().to_string()))
    }

    fn decode_inline(content: &str) -> Option<Self> {
        let trimmed = content.trim();
        if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        if value.get("handoff").is_some() {
            return serde_json::from_value(value).ok().map(Self::Handoff);
        }
        if value.get("tool").is_some() {
            return serde_json::from_value::<ToolCall>(value)
                .ok()
                .map(|call| Self::ToolCalls {
                    content: String::new(),
                    calls: vec![call],
                });
        }
        None
    }
}

/// A tool block that is not valid call JSON still names an intent. Keep the raw
/// text as arguments so validation reports it back to the model.
fn malformed_call(block: &str) -> ToolCall {
    let name = ["\"tool\"", "\"name\""]
        .iter()
        .find_map(|key| quoted_value_after(block, key))
        .unwrap_or_else(|| "unknown".into());
    ToolCall::new(name, serde_json::Value::String(block.to_string()))
}

fn quoted_value_after(text: &str, key: &str) -> Option<String> {
    let rest = &text[text.find(key)? + key.len()..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn fenced_blocks<'a>(content: &'a str, fence: &str) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(fence) {
        let after = &rest[start + fence.len()..];
        let Some(end) = after.find(FENCE_END) else {
            break;
        };
        blocks.push(after[..end].trim());
        rest = &after[end + FENCE_END.len()..];
    }
    blocks
}

fn strip_fenced(content: &str) -> String {
    let mut out = String::new();
    let mut rest = content;
    while let Some(start) = rest.find(TOOL_FENCE) {
        out.push_str(&rest[..start]);
        let after = &rest[start + TOOL_FENCE.len()..];
        match after.find(FENCE_END) {
            Some(end) => rest = &after[end + FENCE_END.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Response from an LLM completion
#[derive(Clone, Debug)]
pub struct Completion {
    /// Decoded response
    pub response: ModelResponse,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// A completion with no usage or finish metadata
    pub fn new(model: impl Into<String>, response: ModelResponse) -> Self {
        Self {
            response,
            model: model.into(),
            usage: None,
            finish_reason: None,
        }
    }
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Accumulate another round-trip's usage
    pub const fn add(&mut self, other: &Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: Option<u32>,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The turn executor works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs and health output
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Run one model round-trip
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "llama3.2");
    }

    #[test]
    fn test_decode_keeps_malformed_tool_block() {
        let raw = "{\"tool\": \"add\", \"arguments\": {a: 2, b: 3}}";
        let decoded = ModelResponse::decode(&format!("Let me add that.\n```tool\n{raw}\n```"));

        match decoded {
            ModelResponse::ToolCalls { content, calls } => {
                assert_eq!(content, "Let me add that.");
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "add");
                assert_eq!(calls[0].arguments, json!(raw));
            }
            other => panic!("tool intent lost: {other:?}"),
        }
    }

    #[test]
    fn test_decode_unnamed_garbage_block() {
        match ModelResponse::decode("```tool\nnot json at all\n```") {
            ModelResponse::ToolCalls { calls, .. } => {
                assert_eq!(calls[0].name, "unknown");
                assert_eq!(calls[0].arguments, json!("not json at all"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_plain_text() {
        assert_eq!(
            ModelResponse::decode("  Hello there \n"),
            ModelResponse::Text("Hello there".into())
        );
    }

    #[test]
    fn test_decode_fenced_tool_calls() {
        let content = r#"Let me add those.
```tool
{"tool": "add", "arguments": {"a": 2, "b": 3}}
```
```tool
{"tool": "datetime", "arguments": {}, "id": "c2"}
```"#;
        let ModelResponse::ToolCalls { content, calls } = ModelResponse::decode(content) else {
            panic!("expected tool calls");
        };
        assert_eq!(content, "Let me add those.");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "add");
        assert_eq!(calls[0].arguments, json!({"a": 2, "b": 3}));
        assert_eq!(calls[1].id, "c2");
    }

    #[test]
    fn test_decode_prefers_handoff() {
        let content = r#"```tool
{"tool": "add", "arguments": {"a": 1, "b": 1}}
```
```handoff
{"agent": "billing", "payload": {"reason": "refund"}}
```"#;
        let ModelResponse::Handoff(request) = ModelResponse::decode(content) else {
            panic!("expected handoff");
        };
        assert_eq!(request.target, "billing");
        assert_eq!(request.payload, Some(json!({"reason": "refund"})));
    }

    #[test]
    fn test_decode_inline_json() {
        let decoded = ModelResponse::decode(r#"{"tool": "add", "arguments": {"a": 1, "b": 2}}"#);
        assert!(matches!(decoded, ModelResponse::ToolCalls { ref calls, .. } if calls.len() == 1));

        let decoded = ModelResponse::decode(r#"{"handoff": "history"}"#);
        assert!(matches!(decoded, ModelResponse::Handoff(ref r) if r.target == "history"));

        let decoded = ModelResponse::decode(r#"{"answer": 42}"#);
        assert!(matches!(decoded, ModelResponse::Text(_)));
    }

    #[test]
    fn test_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        total.add(&TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
        });
        assert_eq!(total.total_tokens, 17);
    }
}
