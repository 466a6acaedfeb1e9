//! Run Configuration

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Limits applied to every orchestration run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum model round-trips per turn
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Recoverable failures tolerated per tool within one turn before the
    /// failure is escalated
    #[serde(default = "default_max_tool_failures")]
    pub max_tool_failures: usize,

    /// Optional cap on the estimated prompt size
    #[serde(default)]
    pub max_context_tokens: Option<u32>,
}

const fn default_max_turns() -> usize {
    10
}
const fn default_max_tool_failures() -> usize {
    3
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_tool_failures: default_max_tool_failures(),
            max_context_tokens: None,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub const fn with_max_tool_failures(mut self, max: usize) -> Self {
        self.max_tool_failures = max;
        self
    }

    #[must_use]
    pub const fn with_max_context_tokens(mut self, max: u32) -> Self {
        self.max_context_tokens = Some(max);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_turns == 0 {
            return Err(AgentError::Config("max_turns must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.max_tool_failures, 3);
        assert!(config.max_context_tokens.is_none());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: RunConfig = serde_json::from_str(r#"{"max_turns": 4}"#).unwrap();
        assert_eq!(config.max_turns, 4);
        assert_eq!(config.max_tool_failures, 3);
    }

    #[test]
    fn test_zero_turns_rejected() {
        assert!(RunConfig::default().with_max_turns(0).validate().is_err());
    }
}
