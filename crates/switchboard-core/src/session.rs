//! Orchestration Sessions
//!
//! [`Orchestrator::run`] is the public entry point for one turn: append the
//! user message, drive the turn executor from the starting agent, hand back the
//! grown transcript. [`Conversations`] layers the request-level entry points on
//! top, loading and saving transcripts through a [`TranscriptStore`].

use std::sync::Arc;

use serde::Serialize;

use crate::agent::{AgentDefinition, AgentRegistry};
use crate::config::RunConfig;
use crate::error::{AgentError, Result};
use crate::executor::TurnExecutor;
use crate::message::{Message, Transcript};
use crate::provider::{LlmProvider, TokenUsage};
use crate::store::{ConversationId, TranscriptStore};
use crate::tool::ToolRegistry;

/// Output of a completed turn
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Final textual output
    pub output: String,
    /// Input transcript plus everything appended this turn
    pub transcript: Transcript,
    /// Agent that produced the output
    pub final_agent: Arc<AgentDefinition>,
    /// Model round-trips used
    pub turns: usize,
    /// Token usage summed over the turn
    pub usage: TokenUsage,
}

/// Runs turns against a fixed set of agents and tools
pub struct Orchestrator {
    executor: TurnExecutor,
}

impl Orchestrator {
    /// Wire an orchestrator, failing on any unresolved tool or agent name
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        agents: Arc<AgentRegistry>,
        config: RunConfig,
    ) -> Result<Self> {
        config.validate()?;
        agents.validate(&tools)?;
        Ok(Self {
            executor: TurnExecutor::new(provider, tools, agents, config),
        })
    }

    pub fn agents(&self) -> &AgentRegistry {
        self.executor.agents()
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.executor.tools()
    }

    /// Run one turn.
    ///
    /// Never persists anything; fatal errors come back with their kind intact.
    #[tracing::instrument(skip(self, transcript, user_message), fields(history = transcript.len()))]
    pub async fn run(
        &self,
        starting_agent: &str,
        mut transcript: Transcript,
        user_message: impl Into<String> + Send,
    ) -> Result<RunResult> {
        let agent = self.agents().get(starting_agent)?;
        transcript.check_integrity()?;
        transcript.push(Message::user(user_message));

        let outcome = self.executor.execute(agent, &mut transcript).await?;

        tracing::info!(
            final_agent = %outcome.final_agent.name(),
            turns = outcome.turns,
            tokens = outcome.usage.total_tokens,
            "Run complete"
        );

        Ok(RunResult {
            output: outcome.output,
            transcript,
            final_agent: outcome.final_agent,
            turns: outcome.turns,
            usage: outcome.usage,
        })
    }
}

/// Reply from a persisted chat turn
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub output: String,
    pub conversation_id: ConversationId,
}

/// Reply from a one-shot agent run
#[derive(Clone, Debug, Serialize)]
pub struct FlowReply {
    pub output: String,
    /// Agent that answered
    pub agent: String,
}

/// Request-level entry points
pub struct Conversations {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn TranscriptStore>,
    chat_agent: String,
}

impl Conversations {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn TranscriptStore>,
        chat_agent: impl Into<String>,
    ) -> Result<Self> {
        let chat_agent = chat_agent.into();
        orchestrator.agents().get(&chat_agent)?;
        Ok(Self {
            orchestrator,
            store,
            chat_agent,
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Continue a stored conversation, or start one when no id is given.
    ///
    /// An id that does not resolve is an error, never a fresh conversation.
    /// Nothing is written unless the turn completes.
    pub async fn start_messages(
        &self,
        conversation_id: Option<&ConversationId>,
        user_text: &str,
    ) -> Result<ChatReply> {
        let Some(id) = conversation_id else {
            let result = self
                .orchestrator
                .run(&self.chat_agent, Transcript::new(), user_text)
                .await?;
            let conversation_id = self.store.create(&result.transcript).await?;
            return Ok(ChatReply {
                output: result.output,
                conversation_id,
            });
        };

        let transcript = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| AgentError::ConversationNotFound(id.to_string()))?;

        let result = self
            .orchestrator
            .run(&self.chat_agent, transcript, user_text)
            .await?;
        self.store.save(id, &result.transcript).await?;

        Ok(ChatReply {
            output: result.output,
            conversation_id: id.clone(),
        })
    }

    /// One-shot run of a tool-using agent, no persistence
    pub async fn start_tool_run(&self, agent: &str, user_text: &str) -> Result<FlowReply> {
        self.one_shot(agent, user_text).await
    }

    /// One-shot run starting from a triage agent that may hand off
    pub async fn start_handoff_flow(&self, triage_agent: &str, user_text: &str) -> Result<FlowReply> {
        let reply = self.one_shot(triage_agent, user_text).await?;
        if reply.agent != triage_agent {
            tracing::debug!(from = %triage_agent, to = %reply.agent, "Answered after handoff");
        }
        Ok(reply)
    }

    async fn one_shot(&self, agent: &str, user_text: &str) -> Result<FlowReply> {
        let result = self
            .orchestrator
            .run(agent, Transcript::new(), user_text)
            .await?;
        Ok(FlowReply {
            output: result.output,
            agent: result.final_agent.name().to_string(),
        })
    }
}
