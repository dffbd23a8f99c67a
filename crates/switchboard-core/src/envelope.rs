//! Message envelope: the unit of communication between agents
//!
//! Every hop in the network builds a fresh [`Envelope`]. The JSON wire
//! encoding is private to this module; other components construct and read
//! envelopes only through the methods below.
//!
//! Wire format:
//!
//! ```json
//! {"role": "user", "content": {"type": "text", "text": "Draw a robot"}}
//! {"role": "agent", "content": {"type": "image_status", "text": "Image generated ..."}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Who produced the envelope's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// Envelope payload. Image results travel as status text; the image bytes
/// themselves are persisted out-of-band by the image responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    ImageStatus(String),
}

impl Content {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(t) | Self::ImageStatus(t) => t,
        }
    }
}

/// A single message exchanged between agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireEnvelope", from = "WireEnvelope")]
pub struct Envelope {
    role: Role,
    content: Content,
}

impl Envelope {
    pub fn new(role: Role, content: Content) -> Self {
        Self { role, content }
    }

    /// A request as sent by a client
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::Text(text.into()))
    }

    /// A textual reply produced by an agent
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, Content::Text(text.into()))
    }

    /// An image responder's status reply
    pub fn image_status(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, Content::ImageStatus(text.into()))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Text of whichever content variant the envelope carries
    pub fn text(&self) -> &str {
        self.content.text()
    }

    pub fn into_text(self) -> String {
        match self.content {
            Content::Text(t) | Content::ImageStatus(t) => t,
        }
    }

    /// Encode to the JSON wire format
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(&WireEnvelope::from(self.clone()))?)
    }

    /// Decode from the JSON wire format.
    ///
    /// Fails with [`crate::DispatchError::ProtocolViolation`] when the document is
    /// not JSON, names an unknown role, or lacks a recognized content variant.
    pub fn from_wire(raw: &[u8]) -> Result<Self> {
        let wire: WireEnvelope = serde_json::from_slice(raw)?;
        Ok(wire.into())
    }
}

// ── Wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEnvelope {
    role: Role,
    content: WireContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text { text: String },
    ImageStatus { text: String },
}

impl From<Envelope> for WireEnvelope {
    fn from(env: Envelope) -> Self {
        let content = match env.content {
            Content::Text(text) => WireContent::Text { text },
            Content::ImageStatus(text) => WireContent::ImageStatus { text },
        };
        Self {
            role: env.role,
            content,
        }
    }
}

impl From<WireEnvelope> for Envelope {
    fn from(wire: WireEnvelope) -> Self {
        let content = match wire.content {
            WireContent::Text { text } => Content::Text(text),
            WireContent::ImageStatus { text } => Content::ImageStatus(text),
        };
        Self {
            role: wire.role,
            content,
        }
    }
}
