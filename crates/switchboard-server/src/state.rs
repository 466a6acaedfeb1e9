//! Application State

use std::sync::Arc;
use std::time::Duration;

use switchboard_core::{Conversations, LlmProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Session entry points over the orchestrator and transcript store
    pub conversations: Arc<Conversations>,

    /// LLM provider, for health and model listing
    pub provider: Arc<dyn LlmProvider>,

    /// Upper bound on one agent run
    pub request_timeout: Duration,
}
