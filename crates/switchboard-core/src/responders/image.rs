//! Image responder: synthesizes an image and saves it to a fixed path

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::endpoint::AgentEndpoint;
use crate::envelope::Envelope;
use crate::error::{DispatchError, Result};
use crate::providers::{GeneratedBlock, Generator, ResponseKind};
use crate::routing::IMAGE_AGENT;

pub const DEFAULT_IMAGE_PATH: &str = "generated_image.png";

pub struct ImageResponder {
    generator: Arc<dyn Generator>,
    output_path: PathBuf,
}

impl ImageResponder {
    pub fn new(generator: Arc<dyn Generator>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Generate and persist one image. The file is overwritten on every call.
    async fn generate_and_save(&self, prompt: &str) -> Result<()> {
        let generated = self.generator.generate(prompt, ResponseKind::Image).await?;
        let data = match generated.first() {
            Some(GeneratedBlock::Image { data, .. }) if !data.is_empty() => data,
            Some(GeneratedBlock::Image { .. }) => {
                return Err(DispatchError::GenerationFailure(
                    "model returned an empty image".to_string(),
                ));
            }
            Some(GeneratedBlock::Text(text)) => {
                return Err(DispatchError::GenerationFailure(format!(
                    "model returned text instead of an image: {}",
                    text
                )));
            }
            None => {
                return Err(DispatchError::GenerationFailure(
                    "model returned no content".to_string(),
                ));
            }
        };

        tokio::fs::write(&self.output_path, data).await.map_err(|e| {
            DispatchError::PersistenceFailure(format!(
                "{}: {}",
                self.output_path.display(),
                e
            ))
        })?;
        info!(
            "ImageResponder: wrote {} bytes to {}",
            data.len(),
            self.output_path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl AgentEndpoint for ImageResponder {
    fn name(&self) -> &str {
        IMAGE_AGENT
    }

    fn description(&self) -> &str {
        "Draws pictures, illustrations, and logos from a text prompt"
    }

    async fn handle(&self, envelope: Envelope) -> Result<Envelope> {
        let prompt = envelope.text();
        info!("ImageResponder: received prompt ({} chars)", prompt.len());

        let status = match self.generate_and_save(prompt).await {
            Ok(()) => format!(
                "Image generated successfully and saved to '{}'",
                self.output_path.display()
            ),
            Err(e) => {
                warn!("ImageResponder: {}", e);
                format!("Error generating image: {}", e)
            }
        };
        Ok(Envelope::image_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Content, Role};
    use crate::providers::Generated;

    struct CannedGenerator(Result<Generated>);

    #[async_trait]
    impl Generator for CannedGenerator {
        fn provider_name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-image-model"
        }
        async fn generate(&self, _prompt: &str, kind: ResponseKind) -> Result<Generated> {
            assert_eq!(kind, ResponseKind::Image);
            self.0.clone()
        }
    }

    fn responder(result: Result<Generated>, path: &Path) -> ImageResponder {
        ImageResponder::new(Arc::new(CannedGenerator(result)), path)
    }

    #[tokio::test]
    async fn test_saves_image_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robot.png");
        let agent = responder(Ok(Generated::image("image/png", vec![137, 80, 78, 71])), &path);

        let reply = agent
            .handle(Envelope::user_text("Draw a friendly robot"))
            .await
            .unwrap();

        assert_eq!(reply.role(), Role::Agent);
        assert!(matches!(reply.content(), Content::ImageStatus(_)));
        assert_eq!(
            reply.text(),
            format!("Image generated successfully and saved to '{}'", path.display())
        );
        assert_eq!(std::fs::read(&path).unwrap(), vec![137, 80, 78, 71]);
    }

    #[tokio::test]
    async fn test_overwrites_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        std::fs::write(&path, b"old image bytes").unwrap();

        let agent = responder(Ok(Generated::image("image/png", vec![1, 2])), &path);
        agent.handle(Envelope::user_text("a logo")).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_text_only_reply_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let agent = responder(Ok(Generated::text("I cannot draw that")), &path);

        let reply = agent.handle(Envelope::user_text("draw")).await.unwrap();
        assert!(matches!(reply.content(), Content::ImageStatus(_)));
        assert!(reply.text().starts_with("Error generating image: "));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let agent = responder(Ok(Generated::image("image/png", Vec::new())), &path);
        let reply = agent.handle(Envelope::user_text("draw")).await.unwrap();
        assert!(reply.text().contains("empty image"));

        let agent = responder(Ok(Generated::default()), &path);
        let reply = agent.handle(Envelope::user_text("draw")).await.unwrap();
        assert!(reply.text().contains("no content"));
    }

    #[tokio::test]
    async fn test_generator_failure_is_folded() {
        let dir = tempfile::tempdir().unwrap();
        let agent = responder(
            Err(DispatchError::GenerationFailure("safety block".into())),
            &dir.path().join("out.png"),
        );
        let reply = agent.handle(Envelope::user_text("draw")).await.unwrap();
        assert!(matches!(reply.content(), Content::ImageStatus(_)));
        assert!(reply.text().starts_with("Error generating image: "));
        assert!(reply.text().contains("safety block"));
    }

    #[tokio::test]
    async fn test_write_failure_is_folded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let agent = responder(Ok(Generated::image("image/png", vec![7])), &path);
        let reply = agent.handle(Envelope::user_text("draw")).await.unwrap();
        assert!(reply.text().starts_with("Error generating image: persistence failed"));
    }
}
