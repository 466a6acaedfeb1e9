//! # switchboard-runtime
//!
//! Model-completion providers for the switchboard engine.
//!
//! ## Providers
//!
//! - **Ollama** (default): Local LLM inference via Ollama, with tools and
//!   handoffs described in the system prompt
//! - **OpenAI**: any OpenAI-compatible chat-completions endpoint, with tools
//!   and handoffs sent as native functions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switchboard_runtime::ollama::OllamaProvider;
//!
//! let provider = Arc::new(OllamaProvider::new("http://localhost", 11434));
//! let orchestrator = Orchestrator::new(provider, tools, agents, RunConfig::default())?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use switchboard_core::{AgentError, LlmProvider, Message, Result, Role};
