//! Server configuration from the environment

use std::time::Duration;

use anyhow::{Context, bail};

/// Which completion backend to talk to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => bail!("unknown LLM_PROVIDER `{other}` (expected ollama or openai)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub provider: ProviderKind,
    /// Overrides every agent's model when set
    pub model: Option<String>,
    pub max_turns: Option<usize>,
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Read `BIND_ADDR`, `LLM_PROVIDER`, `LLM_MODEL`, `MAX_TURNS` and
    /// `REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into());

        let provider = match lookup("LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => ProviderKind::Ollama,
        };

        let model = lookup("LLM_MODEL").filter(|m| !m.trim().is_empty());

        let max_turns = lookup("MAX_TURNS")
            .map(|raw| raw.parse::<usize>().context("MAX_TURNS must be a positive integer"))
            .transpose()?;

        let timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>()
                    .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")
            })
            .transpose()?
            .unwrap_or(60);

        Ok(Self {
            bind_addr,
            provider,
            model,
            max_turns,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert!(config.model.is_none());
        assert!(config.max_turns.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("LLM_PROVIDER", "OpenAI"),
            ("LLM_MODEL", "gemini-2.5-flash"),
            ("MAX_TURNS", "4"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.max_turns, Some(4));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(config(&[("LLM_PROVIDER", "carrier-pigeon")]).is_err());
        assert!(config(&[("MAX_TURNS", "many")]).is_err());
    }
}
