//! Turn Executor
//!
//! Drives model round-trips for one turn. Each response is decoded once into a
//! [`ModelResponse`] and moves the state machine:
//!
//! ```text
//! AwaitingModel ──tool calls──▶ ExecutingTools ──▶ AwaitingModel
//! AwaitingModel ──handoff─────▶ HandoffPending ──▶ AwaitingModel (agent swapped)
//! AwaitingModel ──text────────▶ Done
//! ```
//!
//! Model calls and tool invocations are strictly sequential: every tool result
//! from a round is appended before the next model call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::agent::{AgentDefinition, AgentRegistry};
use crate::config::RunConfig;
use crate::error::{AgentError, Result};
use crate::handoff::{HandoffRequest, HandoffResolver};
use crate::message::{Message, Transcript};
use crate::provider::{Completion, CompletionRequest, LlmProvider, ModelResponse, TokenUsage};
use crate::tool::{ToolCall, ToolRegistry, new_call_id};

enum TurnState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    HandoffPending(HandoffRequest),
    Done(String),
}

/// What a completed turn produced besides the transcript
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// Final answer
    pub output: String,
    /// Agent that produced the final answer
    pub final_agent: Arc<AgentDefinition>,
    /// Model round-trips used
    pub turns: usize,
    /// Token usage summed over all round-trips
    pub usage: TokenUsage,
}

/// Runs the model/tool/handoff loop for one turn
pub struct TurnExecutor {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    agents: Arc<AgentRegistry>,
    config: RunConfig,
}

impl TurnExecutor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        agents: Arc<AgentRegistry>,
        config: RunConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            agents,
            config,
        }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run until the active agent answers in plain text.
    ///
    /// Appends to `transcript` as it goes. On `TurnLimitExceeded` the error
    /// carries a copy of everything appended so far.
    pub async fn execute(
        &self,
        start: Arc<AgentDefinition>,
        transcript: &mut Transcript,
    ) -> Result<TurnOutcome> {
        let mut active = start;
        let mut state = TurnState::AwaitingModel;
        let mut turns = 0;
        let mut usage = TokenUsage::default();
        let mut failures: HashMap<String, usize> = HashMap::new();

        loop {
            state = match state {
                TurnState::AwaitingModel => {
                    if turns >= self.config.max_turns {
                        tracing::warn!(
                            agent = %active.name(),
                            limit = self.config.max_turns,
                            "Turn limit exceeded"
                        );
                        return Err(AgentError::TurnLimitExceeded {
                            limit: self.config.max_turns,
                            transcript: Box::new(transcript.clone()),
                        });
                    }
                    turns += 1;

                    let completion = self.call_model(&active, transcript, turns).await?;
                    if let Some(u) = &completion.usage {
                        usage.add(u);
                    }
                    self.interpret(&active, completion, transcript)?
                }

                TurnState::ExecutingTools(calls) => {
                    for call in calls {
                        let content = self.run_tool(&active, &call, &mut failures).await?;
                        transcript.push(Message::tool(content, call.id).with_agent(active.name()));
                    }
                    TurnState::AwaitingModel
                }

                TurnState::HandoffPending(request) => {
                    let next = HandoffResolver::new(&self.agents)
                        .resolve(&active, &request)
                        .await?;
                    transcript.push(Message::assistant_handoff(request).with_agent(active.name()));
                    active = next;
                    TurnState::AwaitingModel
                }

                TurnState::Done(output) => {
                    tracing::debug!(agent = %active.name(), turns, "Turn complete");
                    return Ok(TurnOutcome {
                        output,
                        final_agent: active,
                        turns,
                        usage,
                    });
                }
            };
        }
    }

    async fn call_model(
        &self,
        agent: &AgentDefinition,
        transcript: &Transcript,
        turn: usize,
    ) -> Result<Completion> {
        let request = CompletionRequest {
            agent: agent.name(),
            instructions: agent.instructions(),
            messages: transcript.messages(),
            options: agent.options(),
            tools: self.tools.schemas_for(agent.tools())?,
            handoffs: agent.handoff_schemas(),
        };

        if let Some(max) = self.config.max_context_tokens {
            let used = transcript
                .estimate_tokens()
                .saturating_add(Message::system(request.instructions).estimate_tokens());
            if used > max {
                return Err(AgentError::ContextOverflow { used, max });
            }
        }

        tracing::debug!(
            agent = %agent.name(),
            model = %agent.model(),
            turn,
            messages = request.messages.len(),
            "Calling model"
        );
        self.provider.complete(&request).await
    }

    fn interpret(
        &self,
        agent: &AgentDefinition,
        completion: Completion,
        transcript: &mut Transcript,
    ) -> Result<TurnState> {
        let response = match completion.response {
            ModelResponse::ToolCalls { content, calls } if calls.is_empty() => {
                ModelResponse::Text(content)
            }
            other => other,
        };

        match response {
            ModelResponse::Text(text) => {
                if text.trim().is_empty() {
                    return Err(AgentError::EmptyCompletion(completion.model));
                }
                transcript.push(Message::assistant(text.clone()).with_agent(agent.name()));
                Ok(TurnState::Done(text))
            }
            ModelResponse::ToolCalls { content, mut calls } => {
                assign_unique_ids(&mut calls, transcript);
                tracing::debug!(agent = %agent.name(), count = calls.len(), "Tool calls requested");
                transcript.push(
                    Message::assistant_tool_calls(content, calls.clone()).with_agent(agent.name()),
                );
                Ok(TurnState::ExecutingTools(calls))
            }
            ModelResponse::Handoff(request) => {
                if !agent.can_hand_off_to(&request.target) {
                    return Err(AgentError::InvalidHandoff {
                        from: agent.name().to_string(),
                        to: request.target,
                    });
                }
                Ok(TurnState::HandoffPending(request))
            }
        }
    }

    /// Invoke one tool call, turning recoverable failures into an error
    /// payload for the model until the per-tool budget runs out
    async fn run_tool(
        &self,
        agent: &AgentDefinition,
        call: &ToolCall,
        failures: &mut HashMap<String, usize>,
    ) -> Result<String> {
        if !agent.declares_tool(&call.name) {
            return Err(AgentError::UnknownTool(call.name.clone()));
        }

        tracing::debug!(agent = %agent.name(), tool = %call.name, call_id = %call.id, "Executing tool");

        match self.tools.invoke(&call.name, &call.arguments).await {
            Ok(value) => Ok(render_result(value)),
            Err(e) if e.is_recoverable() => {
                let count = failures.entry(call.name.clone()).or_insert(0);
                *count += 1;
                if *count > self.config.max_tool_failures {
                    tracing::error!(tool = %call.name, failures = *count, error = %e, "Tool failure budget exhausted");
                    return Err(e);
                }
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool failed");
                Ok(serde_json::json!({ "error": e.to_string() }).to_string())
            }
            Err(e) => Err(e),
        }
    }
}

/// Re-mint call ids that are blank or already taken, so every tool message
/// answers exactly one call when the transcript is loaded again
fn assign_unique_ids(calls: &mut [ToolCall], transcript: &Transcript) {
    let mut used: HashSet<String> = transcript
        .messages()
        .iter()
        .flat_map(|m| m.tool_calls.iter().map(|c| c.id.clone()))
        .collect();

    for call in calls {
        if call.id.trim().is_empty() || used.contains(&call.id) {
            let fresh = new_call_id();
            tracing::debug!(
                tool = %call.name,
                from = %call.id,
                to = %fresh,
                "Re-minted tool call id"
            );
            call.id = fresh;
        }
        used.insert(call.id.clone());
    }
}

fn render_result(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
