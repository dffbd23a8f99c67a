//! Error taxonomy shared by every agent in the network

use thiserror::Error;

/// Failures an agent can detect while handling a request.
///
/// Only [`DispatchError::ProtocolViolation`] is allowed to reach the
/// transport layer. Every other kind is folded into the text of a normal
/// AGENT envelope by the component that detects it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("classification failed: {0}")]
    ClassificationFailure(String),

    #[error("specialist unavailable: {0}")]
    SpecialistUnavailable(String),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error("persistence failed: {0}")]
    PersistenceFailure(String),
}

impl DispatchError {
    /// Whether this error must escape to the transport layer instead of
    /// being folded into a reply envelope
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        Self::ProtocolViolation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
