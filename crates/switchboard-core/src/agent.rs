//! Agent Definitions
//!
//! Immutable descriptors built once at startup and shared by name through the
//! [`AgentRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::handoff::{HandoffSchema, HandoffTarget};
use crate::provider::GenerationOptions;
use crate::tool::ToolRegistry;

/// A named configuration of instructions, model, tools and handoff targets
#[derive(Clone, Debug)]
pub struct AgentDefinition {
    name: String,
    instructions: String,
    options: GenerationOptions,
    tools: Vec<String>,
    handoffs: Vec<HandoffTarget>,
}

impl AgentDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub const fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    /// Names of the tools this agent may call
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    pub fn declares_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    pub fn handoffs(&self) -> &[HandoffTarget] {
        &self.handoffs
    }

    pub fn handoff(&self, agent: &str) -> Option<&HandoffTarget> {
        self.handoffs.iter().find(|h| h.agent == agent)
    }

    pub fn can_hand_off_to(&self, agent: &str) -> bool {
        self.handoff(agent).is_some()
    }

    /// Model-facing schemas of this agent's handoff targets
    pub fn handoff_schemas(&self) -> Vec<HandoffSchema> {
        self.handoffs.iter().map(HandoffTarget::schema).collect()
    }
}

/// Builder for agent definitions
pub struct AgentBuilder {
    name: String,
    instructions: String,
    options: GenerationOptions,
    tools: Vec<String>,
    handoffs: Vec<HandoffTarget>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: DEFAULT_INSTRUCTIONS.into(),
            options: GenerationOptions::default(),
            tools: Vec::new(),
            handoffs: Vec::new(),
        }
    }

    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = model.into();
        self
    }

    #[must_use]
    pub fn temperature(mut self, temp: f32) -> Self {
        self.options.temperature = temp;
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max: u32) -> Self {
        self.options.max_tokens = max;
        self
    }

    #[must_use]
    pub fn tool(mut self, name: impl Into<String>) -> Self {
        self.tools.push(name.into());
        self
    }

    #[must_use]
    pub fn handoff(mut self, target: HandoffTarget) -> Self {
        self.handoffs.push(target);
        self
    }

    pub fn build(self) -> Result<AgentDefinition> {
        if self.name.trim().is_empty() {
            return Err(AgentError::Config("Agent name is required".into()));
        }
        for (i, tool) in self.tools.iter().enumerate() {
            if self.tools[..i].contains(tool) {
                return Err(AgentError::Config(format!(
                    "Agent '{}' declares tool '{tool}' twice",
                    self.name
                )));
            }
        }
        for (i, target) in self.handoffs.iter().enumerate() {
            if target.agent == self.name {
                return Err(AgentError::Config(format!(
                    "Agent '{}' cannot hand off to itself",
                    self.name
                )));
            }
            if self.handoffs[..i].iter().any(|h| h.agent == target.agent) {
                return Err(AgentError::Config(format!(
                    "Agent '{}' declares handoff to '{}' twice",
                    self.name, target.agent
                )));
            }
        }

        Ok(AgentDefinition {
            name: self.name,
            instructions: self.instructions,
            options: self.options,
            tools: self.tools,
            handoffs: self.handoffs,
        })
    }
}

const DEFAULT_INSTRUCTIONS: &str = "You are a helpful AI assistant. Be concise and accurate.";

/// Lookup table of agents by name
#[derive(Clone, Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<AgentDefinition>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent
    pub fn register(&mut self, agent: AgentDefinition) -> Result<Arc<AgentDefinition>> {
        if self.agents.contains_key(agent.name()) {
            return Err(AgentError::DuplicateAgent(agent.name().to_string()));
        }
        let agent = Arc::new(agent);
        self.agents.insert(agent.name().to_string(), agent.clone());
        Ok(agent)
    }

    /// Get an agent by name
    pub fn get(&self, name: &str) -> Result<Arc<AgentDefinition>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownAgent(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Check that every declared tool and handoff target resolves.
    ///
    /// Run once after wiring; a failure here is a configuration bug.
    pub fn validate(&self, tools: &ToolRegistry) -> Result<()> {
        for agent in self.agents.values() {
            for tool in agent.tools() {
                tools.resolve(tool)?;
            }
            for target in agent.handoffs() {
                self.get(&target.agent)?;
            }
        }
        Ok(())
    }
}
