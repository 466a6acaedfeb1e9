//! switchboard HTTP Server
//!
//! Axum-based server exposing the agent entry points:
//! persona chat with stored history, a tool-using agent, and a triage agent
//! that hands off to specialists.

mod agents;
mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use switchboard_core::{
    Conversations, LlmProvider, MemoryTranscriptStore, Orchestrator, RunConfig,
};
use switchboard_runtime::{OllamaProvider, OpenAiProvider};

use crate::config::{ProviderKind, ServerConfig};
use crate::handlers::{
    health_check, list_models, not_found, post_handoff, post_messages, post_tool_run, root,
};
use crate::state::AppState;

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        // Agent API
        .route("/messages", post(post_messages))
        .route("/agents/tools", post(post_tool_run))
        .route("/agents/handoff", post(post_handoff))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn provider(kind: ProviderKind) -> anyhow::Result<Arc<dyn LlmProvider>> {
    Ok(match kind {
        ProviderKind::Ollama => Arc::new(OllamaProvider::from_env()),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_env()?),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    let provider = provider(config.provider)?;

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("Connected to {}", provider.name());
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("{} not reachable - agent runs will fail", provider.name());
        }
    }

    let tools = agents::tools()?;
    let agents = agents::agents(config.model.as_deref())?;
    tracing::info!(tools = ?tools.names(), agents = ?agents.names(), "Registered roster");

    let mut run_config = RunConfig::default();
    if let Some(max_turns) = config.max_turns {
        run_config = run_config.with_max_turns(max_turns);
    }

    let orchestrator = Orchestrator::new(
        provider.clone(),
        Arc::new(tools),
        Arc::new(agents),
        run_config,
    )?;
    let conversations = Conversations::new(
        Arc::new(orchestrator),
        Arc::new(MemoryTranscriptStore::new()),
        agents::CHAT_AGENT,
    )?;

    let state = AppState {
        conversations: Arc::new(conversations),
        provider,
        request_timeout: config.request_timeout,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("switchboard listening on http://{}", config.bind_addr);
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  GET  /api/models      - List available models");
    tracing::info!("  POST /messages        - Persona chat with history");
    tracing::info!("  POST /agents/tools    - Tool-using agent");
    tracing::info!("  POST /agents/handoff  - Triage with handoffs");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
