//! Conversation Messages
//!
//! Standard message format and the append-only transcript shared by the
//! executor, the orchestrator and the transcript store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::handoff::HandoffRequest;
use crate::tool::ToolCall;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single transcript entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content (tool results are stored as serialized JSON)
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Handoff requested by an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffRequest>,

    /// Correlates a tool message with the assistant call that requested it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Agent that produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            handoff: None,
            tool_call_id: None,
            agent_name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message carrying tool-call requests
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = calls;
        msg
    }

    /// Create an assistant message recording a handoff
    pub fn assistant_handoff(request: HandoffRequest) -> Self {
        let mut msg = Self::new(
            Role::Assistant,
            format!("Transferring to {}", request.target),
        );
        msg.handoff = Some(request);
        msg
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Attribute the message to an agent
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent_name = Some(agent.into());
        self
    }

    /// Whether this message requests tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        let arguments: usize = self
            .tool_calls
            .iter()
            .map(|c| c.name.len() + c.arguments.to_string().len())
            .sum();
        // ~4 characters per token, +4 for role overhead
        u32::try_from((self.content.len() + arguments) / 4)
            .unwrap_or(u32::MAX)
            .saturating_add(4)
    }
}

/// Ordered, append-only conversation history
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push(Message::system(prompt));
        transcript
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Estimate total tokens in the transcript
    pub fn estimate_tokens(&self) -> u32 {
        self.messages
            .iter()
            .map(Message::estimate_tokens)
            .fold(0, u32::saturating_add)
    }

    /// Whether `prefix` appears unchanged at the start of this transcript
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.messages.starts_with(&prefix.messages)
    }

    /// Verify ordering and tool-correlation invariants.
    ///
    /// System messages may only lead the transcript, and every tool message must
    /// answer a tool call requested by an earlier assistant message, once.
    pub fn check_integrity(&self) -> Result<()> {
        let mut seen_non_system = false;
        let mut pending: HashSet<&str> = HashSet::new();
        let mut answered: HashSet<&str> = HashSet::new();

        for (index, message) in self.messages.iter().enumerate() {
            match message.role {
                Role::System if seen_non_system => {
                    return Err(AgentError::InvalidTranscript(format!(
                        "system message at position {index} follows conversation messages"
                    )));
                }
                Role::System => {}
                Role::Assistant => {
                    seen_non_system = true;
                    pending.extend(message.tool_calls.iter().map(|c| c.id.as_str()));
                }
                Role::Tool => {
                    seen_non_system = true;
                    let id = message.tool_call_id.as_deref().ok_or_else(|| {
                        AgentError::InvalidTranscript(format!(
                            "tool message at position {index} has no tool call id"
                        ))
                    })?;
                    if !pending.remove(id) {
                        let reason = if answered.contains(id) {
                            "answers tool call twice"
                        } else {
                            "answers unknown tool call"
                        };
                        return Err(AgentError::InvalidTranscript(format!(
                            "tool message at position {index} {reason} '{id}'"
                        )));
                    }
                    answered.insert(id);
                }
                Role::User => seen_non_system = true,
            }
        }

        Ok(())
    }

    /// Consume into the underlying message list
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
