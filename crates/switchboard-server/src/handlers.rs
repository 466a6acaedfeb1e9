//! HTTP Handlers

use std::future::Future;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use switchboard_core::{AgentError, ConversationId, provider::ModelInfo};

use crate::agents::{TOOL_AGENT, TRIAGE_AGENT};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub prompt: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub result: String,
    pub chat_id: ConversationId,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Error surfaced to HTTP clients as `{error, code}`
#[derive(Debug)]
pub enum ApiError {
    Agent(AgentError),
    BadRequest(String),
    Timeout,
    NotFound(String),
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self::Agent(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

const fn agent_status(err: &AgentError) -> StatusCode {
    match err {
        AgentError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
        AgentError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AgentError::Provider(_) | AgentError::EmptyCompletion(_) => StatusCode::BAD_GATEWAY,
        AgentError::UnknownTool(_)
        | AgentError::ToolArgument { .. }
        | AgentError::ToolExecution { .. }
        | AgentError::InvalidHandoff { .. }
        | AgentError::HandoffPayload { .. }
        | AgentError::TurnLimitExceeded { .. }
        | AgentError::ContextOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, code) = match self {
            Self::Agent(err) => {
                let status = agent_status(&err);
                if status.is_server_error() {
                    tracing::error!(code = err.code(), "Agent error: {}", err);
                } else {
                    tracing::warn!(code = err.code(), "Agent error: {}", err);
                }
                (status, err.user_message(), err.code())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "INVALID_REQUEST"),
            Self::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "The agent took too long to answer.".into(),
                "TIMEOUT",
            ),
            Self::NotFound(path) => (
                StatusCode::NOT_FOUND,
                format!("Page not found: {path}"),
                "NOT_FOUND",
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                code: code.into(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn require_prompt(prompt: &str) -> Result<(), ApiError> {
    if prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".into()));
    }
    Ok(())
}

/// Bound one agent run by the configured timeout. A timed-out run is dropped
/// before anything is persisted.
async fn bounded<T>(
    state: &AppState,
    run: impl Future<Output = switchboard_core::Result<T>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(state.request_timeout, run)
        .await
        .map_err(|_| ApiError::Timeout)?
        .map_err(ApiError::from)
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Running" }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
    })
}

/// Models offered by the configured provider
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Vec<ModelInfo>> {
    Ok(Json(state.provider.list_models().await?))
}

/// Persona chat; continues the conversation named by `chatId`, or starts one
pub async fn post_messages(
    State(state): State<AppState>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(payload) = payload?;
    require_prompt(&payload.prompt)?;

    let chat_id = payload
        .chat_id
        .filter(|id| !id.is_empty())
        .map(ConversationId::from_string);

    let reply = bounded(
        &state,
        state
            .conversations
            .start_messages(chat_id.as_ref(), &payload.prompt),
    )
    .await?;

    Ok(Json(MessageResponse {
        result: reply.output,
        chat_id: reply.conversation_id,
    }))
}

/// One-shot run of the tool-using agent
pub async fn post_tool_run(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> ApiResult<PromptResponse> {
    let Json(payload) = payload?;
    require_prompt(&payload.prompt)?;

    let reply = bounded(
        &state,
        state
            .conversations
            .start_tool_run(TOOL_AGENT, &payload.prompt),
    )
    .await?;

    Ok(Json(PromptResponse {
        result: reply.output,
    }))
}

/// One-shot run starting at the triage agent
pub async fn post_handoff(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> ApiResult<PromptResponse> {
    let Json(payload) = payload?;
    require_prompt(&payload.prompt)?;

    let reply = bounded(
        &state,
        state
            .conversations
            .start_handoff_flow(TRIAGE_AGENT, &payload.prompt),
    )
    .await?;
    tracing::info!(agent = %reply.agent, "Handoff flow answered");

    Ok(Json(PromptResponse {
        result: reply.output,
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
