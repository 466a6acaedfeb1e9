//! # Agent Handoffs
//!
//! A handoff transfers "who answers next" from the active agent to another
//! agent within the same turn. Targets are declared per agent as
//! [`HandoffTarget`]s and refer to other agents by name, so cyclic graphs
//! (triage → billing → triage) need no shared ownership.
//!
//! When the model requests a handoff the [`HandoffResolver`]:
//!
//! 1. checks the target is declared by the active agent,
//! 2. validates the payload against the target's input schema, if any,
//! 3. runs the target's `on_handoff` callback once, best-effort,
//! 4. returns the target definition.
//!
//! The transcript is never rewritten; the new agent sees the full history.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::agent::{AgentDefinition, AgentRegistry};
use crate::error::{AgentError, Result};
use crate::schema::InputSchema;

/// A handoff directive produced by the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandoffRequest {
    /// Name of the agent to transfer to
    #[serde(alias = "agent", alias = "handoff")]
    pub target: String,

    /// Structured payload, validated against the target's input schema
    #[serde(default, alias = "arguments", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl HandoffRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Context passed to an `on_handoff` callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffData {
    /// The agent initiating the handoff
    pub from_agent: String,

    /// The agent taking over
    pub to_agent: String,

    /// Validated payload, if the model sent one
    pub payload: Option<Value>,
}

/// Side effect run when control is handed to an agent.
///
/// Failures are logged and never affect the handoff outcome.
#[async_trait]
pub trait HandoffCallback: Send + Sync {
    async fn on_handoff(&self, data: &HandoffData) -> Result<()>;
}

#[async_trait]
impl<F> HandoffCallback for F
where
    F: Fn(&HandoffData) -> Result<()> + Send + Sync,
{
    async fn on_handoff(&self, data: &HandoffData) -> Result<()> {
        self(data)
    }
}

/// Model-facing description of a handoff target
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandoffSchema {
    /// Target agent name
    pub name: String,

    /// When the model should pick this target
    pub description: String,

    /// Payload contract, if the target declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSchema>,
}

/// A legal transfer from one agent to another
#[derive(Clone)]
pub struct HandoffTarget {
    /// Name of the target agent
    pub agent: String,

    /// Description shown to the model
    pub description: String,

    /// Payload contract
    pub input_schema: Option<InputSchema>,

    /// Best-effort side effect run after validation
    pub on_handoff: Option<Arc<dyn HandoffCallback>>,
}

impl std::fmt::Debug for HandoffTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandoffTarget")
            .field("agent", &self.agent)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("on_handoff", &self.on_handoff.is_some())
            .finish()
    }
}

impl HandoffTarget {
    pub fn new(agent: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            description: description.into(),
            input_schema: None,
            on_handoff: None,
        }
    }

    #[must_use]
    pub fn with_input_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_callback(mut self, callback: impl HandoffCallback + 'static) -> Self {
        self.on_handoff = Some(Arc::new(callback));
        self
    }

    pub fn schema(&self) -> HandoffSchema {
        HandoffSchema {
            name: self.agent.clone(),
            description: self.description.clone(),
            input: self.input_schema.clone(),
        }
    }
}

/// Render the handoff catalogue for providers without native function calling
pub fn prompt_section(handoffs: &[HandoffSchema]) -> String {
    use std::fmt::Write;

    let mut prompt = String::from("## Handoffs\n\n");
    prompt.push_str(
        "To transfer the conversation to another agent, respond with only this block:\n\n",
    );
    prompt.push_str("```handoff\n{\"agent\": \"agent_name\", \"payload\": {}}\n```\n\n");
    for handoff in handoffs {
        let _ = writeln!(prompt, "- `{}`: {}", handoff.name, handoff.description);
        if let Some(input) = &handoff.input {
            for param in &input.parameters {
                let required = if param.required { " (required)" } else { "" };
                let _ = writeln!(
                    prompt,
                    "  - payload `{}` ({}){}: {}",
                    param.name, param.param_type, required, param.description
                );
            }
        }
    }
    prompt
}

/// Validates and executes transfers of control
pub struct HandoffResolver<'a> {
    agents: &'a AgentRegistry,
}

impl<'a> HandoffResolver<'a> {
    pub const fn new(agents: &'a AgentRegistry) -> Self {
        Self { agents }
    }

    /// Transfer control from `from` to the agent named in `request`
    pub async fn resolve(
        &self,
        from: &AgentDefinition,
        request: &HandoffRequest,
    ) -> Result<Arc<AgentDefinition>> {
        let target = from
            .handoff(&request.target)
            .ok_or_else(|| AgentError::InvalidHandoff {
                from: from.name().to_string(),
                to: request.target.clone(),
            })?;

        let payload = match (&target.input_schema, &request.payload) {
            (Some(schema), raw) => {
                let raw = raw.clone().unwrap_or(Value::Null);
                let args = schema
                    .validate(&raw)
                    .map_err(|violations| AgentError::HandoffPayload {
                        target: target.agent.clone(),
                        violations,
                    })?;
                Some(args.into_value())
            }
            (None, raw) => raw.clone(),
        };

        let next = self.agents.get(&target.agent)?;

        if let Some(callback) = &target.on_handoff {
            let data = HandoffData {
                from_agent: from.name().to_string(),
                to_agent: next.name().to_string(),
                payload,
            };
            if let Err(e) = callback.on_handoff(&data).await {
                tracing::warn!(
                    from = %data.from_agent,
                    target = %data.to_agent,
                    error = %e,
                    "Handoff callback failed"
                );
            }
        }

        tracing::info!(from = %from.name(), target = %next.name(), "Handoff");
        Ok(next)
    }
}
