//! Provider-agnostic generation types

use async_trait::async_trait;

use crate::error::Result;

/// What kind of output the caller wants from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Text,
    Image,
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// A single content block returned by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedBlock {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

/// Ordered content blocks of one generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub blocks: Vec<GeneratedBlock>,
}

impl Generated {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            blocks: vec![GeneratedBlock::Text(text.into())],
        }
    }

    pub fn image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            blocks: vec![GeneratedBlock::Image {
                mime_type: mime_type.into(),
                data,
            }],
        }
    }

    /// All text blocks concatenated in order
    pub fn joined_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                GeneratedBlock::Text(t) => Some(t.as_str()),
                GeneratedBlock::Image { .. } => None,
            })
            .collect()
    }

    pub fn first(&self) -> Option<&GeneratedBlock> {
        self.blocks.first()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The generative-model capability used by the router and the specialists
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable provider name (e.g. "google")
    fn provider_name(&self) -> &str;

    /// Model identifier (e.g. "gemini-2.0-flash")
    fn model(&self) -> &str;

    /// Generate content for a prompt
    async fn generate(&self, prompt: &str, kind: ResponseKind) -> Result<Generated>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_kind_display() {
        assert_eq!(ResponseKind::Text.to_string(), "text");
        assert_eq!(ResponseKind::Image.to_string(), "image");
    }

    #[test]
    fn test_joined_text_skips_images() {
        let generated = Generated {
            blocks: vec![
                GeneratedBlock::Text("Hello, ".to_string()),
                GeneratedBlock::Image {
                    mime_type: "image/png".to_string(),
                    data: vec![1, 2, 3],
                },
                GeneratedBlock::Text("world".to_string()),
            ],
        };
        assert_eq!(generated.joined_text(), "Hello, world");
    }

    #[test]
    fn test_first_block() {
        let generated = Generated::image("image/png", vec![9]);
        assert!(matches!(generated.first(), Some(GeneratedBlock::Image { .. })));
        assert!(Generated::default().first().is_none());
        assert!(Generated::default().is_empty());
    }
}
