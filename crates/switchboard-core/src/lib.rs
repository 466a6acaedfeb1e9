//! # switchboard-core
//!
//! Agent orchestration and handoff engine with a provider-agnostic LLM
//! abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Orchestrator                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │ TurnExecutor │──│ ToolRegistry │  │   LlmProvider          │  │
//! │  │  (state      │──│ AgentRegistry│──│   (Strategy)           │  │
//! │  │   machine)   │──│ HandoffRes.  │  │                        │  │
//! │  └──────────────┘  └──────────────┘  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//!                 │ Transcript in / Transcript out
//!          ┌──────▼────────┐
//!          │TranscriptStore│
//!          └───────────────┘
//! ```
//!
//! Agents refer to each other by name through the [`AgentRegistry`], so
//! cyclic handoff graphs need no shared ownership.

pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod handoff;
pub mod message;
pub mod provider;
pub mod schema;
pub mod session;
pub mod store;
pub mod tool;

pub use agent::{AgentBuilder, AgentDefinition, AgentRegistry};
pub use config::RunConfig;
pub use error::{AgentError, Result};
pub use executor::{TurnExecutor, TurnOutcome};
pub use handoff::{HandoffCallback, HandoffData, HandoffRequest, HandoffResolver, HandoffTarget};
pub use message::{Message, Role, Transcript};
pub use provider::{Completion, CompletionRequest, GenerationOptions, LlmProvider, ModelResponse};
pub use schema::{InputSchema, ParamType, ParameterSchema, SchemaViolation, ValidatedArgs};
pub use session::{ChatReply, Conversations, FlowReply, Orchestrator, RunResult};
pub use store::{ConversationId, MemoryTranscriptStore, TranscriptStore};
pub use tool::{FunctionTool, Tool, ToolCall, ToolRegistry, ToolSchema};
