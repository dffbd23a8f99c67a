//! Agent endpoint: the capability every agent in the network implements

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::Result;

/// A unit that accepts an envelope and answers with an envelope.
///
/// Implementations fold business failures (model unreachable, unusable
/// output, write errors) into the text of the returned AGENT envelope. `Err`
/// is reserved for protocol violations and for transport failures of remote
/// endpoints.
#[async_trait]
pub trait AgentEndpoint: Send + Sync {
    /// Registry name (e.g. "greeting_agent")
    fn name(&self) -> &str;

    /// One-line description, published in the agent card
    fn description(&self) -> &str;

    /// Handle a single request
    async fn handle(&self, envelope: Envelope) -> Result<Envelope>;

    /// Entry point used by servers and routers; wraps [`Self::handle`] with logging
    async fn call(&self, envelope: Envelope) -> Result<Envelope> {
        debug!(
            agent = self.name(),
            role = %envelope.role(),
            chars = envelope.text().len(),
            "Agent call start"
        );

        let result = self.handle(envelope).await;

        match &result {
            Ok(reply) => debug!(
                agent = self.name(),
                chars = reply.text().len(),
                "Agent call success"
            ),
            Err(e) => warn!(agent = self.name(), error = %e, "Agent call error"),
        }

        result
    }
}
