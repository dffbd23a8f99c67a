//! Wire-level types shared by agent servers and their clients

use serde::{Deserialize, Serialize};

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const HEALTH_PATH: &str = "/health";
pub const MESSAGE_PATH: &str = "/a2a/message";

/// Maximum request body size (1MB)
pub const MAX_REQUEST_BODY_SIZE: usize = 1_048_576;

/// Self-description published at [`AGENT_CARD_PATH`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl AgentCard {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            capabilities: vec!["envelope/text".to_string()],
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub agent: String,
}

impl HealthStatus {
    pub fn healthy(agent: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            agent: agent.into(),
        }
    }
}

/// Body of every non-2xx response from an agent server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Join a base URL and a path without doubling the slash
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
