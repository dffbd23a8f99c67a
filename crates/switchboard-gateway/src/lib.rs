//! switchboard-gateway - front door for the agent network
//!
//! Accepts plain `{"text": ...}` queries over HTTP, wraps them in a USER
//! envelope, hands them to the manager, and returns the manager's reply text.

pub mod auth;
pub mod protocol;
pub mod server;

pub use server::GatewayServer;
