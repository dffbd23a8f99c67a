//! Remote agent: an `AgentEndpoint` that forwards envelopes over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use switchboard_core::{AgentEndpoint, DispatchError, Envelope, Result};

use crate::protocol::{
    AGENT_CARD_PATH, AgentCard, ErrorBody, HEALTH_PATH, HealthStatus, MESSAGE_PATH, join_url,
};

pub struct RemoteAgent {
    name: String,
    description: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for RemoteAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAgent")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RemoteAgent {
    /// `timeout` bounds each request end to end
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::SpecialistUnavailable(format!("{}: {}", name, e)))?;
        Ok(Self {
            description: format!("Remote agent at {}", base_url),
            name,
            base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_card(&self) -> Result<AgentCard> {
        self.get_json(AGENT_CARD_PATH).await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json(HEALTH_PATH).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(join_url(&self.base_url, path))
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.unavailable(e))?;
        if !status.is_success() {
            return Err(self.status_error(status, &bytes));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn unavailable(&self, e: impl std::fmt::Display) -> DispatchError {
        DispatchError::SpecialistUnavailable(format!("{} ({}): {}", self.name, self.base_url, e))
    }

    fn status_error(&self, status: StatusCode, body: &[u8]) -> DispatchError {
        let detail = serde_json::from_slice::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
        if status == StatusCode::BAD_REQUEST {
            DispatchError::ProtocolViolation(detail)
        } else {
            self.unavailable(format!("HTTP {}: {}", status, detail))
        }
    }
}

#[async_trait]
impl AgentEndpoint for RemoteAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn handle(&self, envelope: Envelope) -> Result<Envelope> {
        let body = envelope.to_wire()?;
        debug!("RemoteAgent: POST {} ({} bytes)", self.base_url, body.len());

        let response = self
            .client
            .post(join_url(&self.base_url, MESSAGE_PATH))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.unavailable(e))?;
        if !status.is_success() {
            return Err(self.status_error(status, &bytes));
        }
        Envelope::from_wire(&bytes)
    }
}
