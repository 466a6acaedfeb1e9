//! Scripted provider shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use switchboard_core::provider::{ModelInfo, TokenUsage};
use switchboard_core::{
    AgentError, Completion, CompletionRequest, HandoffRequest, LlmProvider, Message,
    ModelResponse, Result, ToolCall,
};

/// What the provider saw on one call
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub agent: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub handoffs: Vec<String>,
}

/// Replays canned responses in order and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ModelResponse>>,
    repeat: Option<ModelResponse>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Answer every call with the same response
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::default()
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        self.seen.lock().unwrap().push(SeenRequest {
            agent: request.agent.to_string(),
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            handoffs: request.handoffs.iter().map(|h| h.name.clone()).collect(),
        });

        let response = match &self.repeat {
            Some(response) => response.clone(),
            None => self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?,
        };

        let mut completion = Completion::new(request.options.model.clone(), response);
        completion.usage = Some(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 2,
            total_tokens: 12,
        });
        Ok(completion)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

pub fn text(content: &str) -> ModelResponse {
    ModelResponse::Text(content.into())
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ModelResponse {
    ModelResponse::ToolCalls {
        content: String::new(),
        calls: vec![ToolCall::new(name, arguments).with_id(id)],
    }
}

pub fn handoff(target: &str, payload: Option<Value>) -> ModelResponse {
    let mut request = HandoffRequest::new(target);
    request.payload = payload;
    ModelResponse::Handoff(request)
}
