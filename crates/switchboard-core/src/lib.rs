//! switchboard-core - envelope protocol, routing, and specialist agents
//!
//! This crate provides:
//! - The message envelope and its JSON wire encoding
//! - The `AgentEndpoint` capability every agent implements
//! - The manager agent that classifies requests and relays them to specialists
//! - Greeting (text, optional research) and image specialists
//! - Generator providers (Gemini) with retry

pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod manager;
pub mod providers;
pub mod research;
pub mod responders;
pub mod routing;

// Re-export main types for convenience
pub use endpoint::AgentEndpoint;
pub use envelope::{Content, Envelope, Role};
pub use error::{DispatchError, Result};
pub use manager::{ManagerAgent, SpecialistRegistry};
pub use providers::{
    Generated, GeneratedBlock, Generator, GoogleGenerator, ResponseKind, RetryingGenerator,
};
pub use research::{GraphResearchPipeline, ResearchOutcome, ResearchPipeline};
pub use responders::{GreetingResponder, ImageResponder};
pub use routing::{GREETING_AGENT, IMAGE_AGENT, RoutingDecision};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _ = std::mem::size_of::<Envelope>();
        let _ = std::mem::size_of::<ManagerAgent>();
        let _ = std::mem::size_of::<GreetingResponder>();
        let _ = std::mem::size_of::<ImageResponder>();
        let _ = std::mem::size_of::<GoogleGenerator>();
    }
}
