//! Error Types

use thiserror::Error;

use crate::message::Transcript;
use crate::schema::SchemaViolation;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Orchestration error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Tool not found in registry, or not declared by the calling agent
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with this name is already registered
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// An agent with this name is already registered
    #[error("Duplicate agent: {0}")]
    DuplicateAgent(String),

    /// Agent not found in the agent registry
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Tool arguments did not match the tool's input schema
    #[error("Invalid arguments for tool '{tool}': {}", join_violations(.violations))]
    ToolArgument {
        tool: String,
        violations: Vec<SchemaViolation>,
    },

    /// Tool executor failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Handoff to an agent the active agent may not transfer to
    #[error("Agent '{from}' cannot hand off to '{to}'")]
    InvalidHandoff { from: String, to: String },

    /// Handoff payload did not match the target's input schema
    #[error("Invalid handoff payload for '{target}': {}", join_violations(.violations))]
    HandoffPayload {
        target: String,
        violations: Vec<SchemaViolation>,
    },

    /// Maximum model round-trips reached; carries everything appended so far
    #[error("Turn limit ({limit}) exceeded")]
    TurnLimitExceeded {
        limit: usize,
        transcript: Box<Transcript>,
    },

    /// Context length exceeded
    #[error("Context length exceeded: {used} tokens (max: {max})")]
    ContextOverflow { used: u32, max: u32 },

    /// Supplied conversation id does not resolve in the transcript store
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// Transcript violates ordering or tool-correlation invariants
    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    /// Model answered with no usable content
    #[error("Model '{0}' returned an empty completion")]
    EmptyCompletion(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Transcript store error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AgentError {
    /// Whether the turn executor may turn this into a tool error message
    /// instead of aborting the turn
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ToolArgument { .. } | Self::ToolExecution { .. }
        )
    }

    /// Check if error is retryable by the caller
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::Io(_)
        )
    }

    /// Partial transcript carried by the error, if any
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            Self::TurnLimitExceeded { transcript, .. } => Some(transcript),
            _ => None,
        }
    }

    /// Stable machine-readable code for transport layers
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::DuplicateTool(_) => "DUPLICATE_TOOL",
            Self::DuplicateAgent(_) => "DUPLICATE_AGENT",
            Self::UnknownAgent(_) => "UNKNOWN_AGENT",
            Self::ToolArgument { .. } => "TOOL_ARGUMENT",
            Self::ToolExecution { .. } => "TOOL_EXECUTION",
            Self::InvalidHandoff { .. } => "INVALID_HANDOFF",
            Self::HandoffPayload { .. } => "HANDOFF_PAYLOAD",
            Self::TurnLimitExceeded { .. } => "TURN_LIMIT_EXCEEDED",
            Self::ContextOverflow { .. } => "CONTEXT_OVERFLOW",
            Self::ConversationNotFound(_) => "CONVERSATION_NOT_FOUND",
            Self::InvalidTranscript(_) => "INVALID_TRANSCRIPT",
            Self::EmptyCompletion(_) => "EMPTY_COMPLETION",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::Store(_) => "STORE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::EmptyCompletion(_) => "The AI service returned an empty answer.".into(),
            Self::ConversationNotFound(id) => format!("Invalid conversation id: {id}"),
            Self::InvalidTranscript(_) => "The stored conversation is corrupted.".into(),
            Self::UnknownTool(name) => format!("The tool '{name}' is not available."),
            Self::InvalidHandoff { to, .. } => format!("The agent '{to}' is not reachable from here."),
            Self::HandoffPayload { target, .. } => {
                format!("The request could not be routed to '{target}'.")
            }
            Self::ToolArgument { tool, .. } => format!("Invalid input for tool '{tool}'."),
            Self::ToolExecution { tool, message } => format!("Tool '{tool}' failed: {message}"),
            Self::TurnLimitExceeded { .. } => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            Self::ContextOverflow { .. } => {
                "The conversation is too long. Please start a new conversation.".into()
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
