//! Generation capability used by the router and the specialist agents
//!
//! Providers implement the [`Generator`] trait. [`RetryingGenerator`] adds a
//! bounded retry policy on top of any provider.

pub mod google;
pub mod retry;
pub mod types;

pub use google::GoogleGenerator;
pub use retry::RetryingGenerator;
pub use types::{Generated, GeneratedBlock, Generator, ResponseKind};
