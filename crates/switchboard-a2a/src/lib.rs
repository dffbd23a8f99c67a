//! switchboard-a2a - agent-to-agent transport
//!
//! Every agent in the network runs behind an [`AgentServer`]. Peers reach it
//! through a [`RemoteAgent`], which implements the same `AgentEndpoint`
//! trait as a local agent, so the manager cannot tell the two apart.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::RemoteAgent;
pub use protocol::AgentCard;
pub use server::AgentServer;
