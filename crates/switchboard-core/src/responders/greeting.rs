//! Greeting responder: plain text answers, with an optional research path

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::endpoint::AgentEndpoint;
use crate::envelope::Envelope;
use crate::error::{DispatchError, Result};
use crate::providers::{Generator, ResponseKind};
use crate::research::{
    DEFAULT_INITIAL_SEARCH_QUERY_COUNT, DEFAULT_MAX_RESEARCH_LOOPS, ResearchPipeline,
    extract_answer, is_research_query,
};
use crate::routing::GREETING_AGENT;

/// Text specialist. Research is only attempted when a pipeline was supplied.
pub struct GreetingResponder {
    generator: Arc<dyn Generator>,
    research: Option<Arc<dyn ResearchPipeline>>,
    max_research_loops: u32,
    initial_search_query_count: u32,
}

impl GreetingResponder {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            research: None,
            max_research_loops: DEFAULT_MAX_RESEARCH_LOOPS,
            initial_search_query_count: DEFAULT_INITIAL_SEARCH_QUERY_COUNT,
        }
    }

    pub fn with_research(mut self, pipeline: Arc<dyn ResearchPipeline>) -> Self {
        self.research = Some(pipeline);
        self
    }

    pub fn with_research_limits(mut self, max_loops: u32, initial_search_count: u32) -> Self {
        self.max_research_loops = max_loops;
        self.initial_search_query_count = initial_search_count;
        self
    }

    pub fn research_enabled(&self) -> bool {
        self.research.is_some()
    }

    async fn simple(&self, prompt: &str) -> String {
        match self.generate_text(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("GreetingResponder: generation failed: {}", e);
                format!("Error generating response: {}", e)
            }
        }
    }

    /// A reply without any text is unusable
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let generated = self.generator.generate(prompt, ResponseKind::Text).await?;
        let text = generated.joined_text();
        if text.trim().is_empty() {
            return Err(DispatchError::GenerationFailure(
                "model returned no text".to_string(),
            ));
        }
        Ok(text)
    }

    async fn researched(&self, pipeline: &dyn ResearchPipeline, query: &str) -> Result<String> {
        let outcome = pipeline
            .invoke(
                query,
                self.max_research_loops,
                self.initial_search_query_count,
            )
            .await?;
        debug!(
            "GreetingResponder: research produced {} messages",
            outcome.messages.len()
        );
        Ok(extract_answer(&outcome, query))
    }
}

#[async_trait]
impl AgentEndpoint for GreetingResponder {
    fn name(&self) -> &str {
        GREETING_AGENT
    }

    fn description(&self) -> &str {
        "Answers questions, writes text, and researches current events"
    }

    async fn handle(&self, envelope: Envelope) -> Result<Envelope> {
        let prompt = envelope.text();
        info!("GreetingResponder: received prompt ({} chars)", prompt.len());

        if let Some(pipeline) = &self.research {
            if is_research_query(prompt) {
                match self.researched(pipeline.as_ref(), prompt).await {
                    Ok(answer) => return Ok(Envelope::agent_text(answer)),
                    Err(e) => warn!(
                        "GreetingResponder: research failed, falling back to simple path: {}",
                        e
                    ),
                }
            }
        }

        Ok(Envelope::agent_text(self.simple(prompt).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Content, Role};
    use crate::providers::Generated;
    use crate::research::{ResearchMessage, ResearchOutcome};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        fn provider_name(&self) -> &str {
            "echo"
        }
        fn model(&self) -> &str {
            "echo-model"
        }
        async fn generate(&self, prompt: &str, _kind: ResponseKind) -> Result<Generated> {
            Ok(Generated::text(format!("simple: {}", prompt)))
        }
    }

    struct DownGenerator;

    #[async_trait]
    impl Generator for DownGenerator {
        fn provider_name(&self) -> &str {
            "down"
        }
        fn model(&self) -> &str {
            "down-model"
        }
        async fn generate(&self, _prompt: &str, _kind: ResponseKind) -> Result<Generated> {
            Err(DispatchError::GenerationFailure("HTTP 503".into()))
        }
    }

    struct FixedText(&'static str);

    #[async_trait]
    impl Generator for FixedText {
        fn provider_name(&self) -> &str {
            "fixed"
        }
        fn model(&self) -> &str {
            "fixed-model"
        }
        async fn generate(&self, _prompt: &str, _kind: ResponseKind) -> Result<Generated> {
            Ok(Generated::text(self.0))
        }
    }

    struct SilentGenerator;

    #[async_trait]
    impl Generator for SilentGenerator {
        fn provider_name(&self) -> &str {
            "silent"
        }
        fn model(&self) -> &str {
            "silent-model"
        }
        async fn generate(&self, _prompt: &str, _kind: ResponseKind) -> Result<Generated> {
            Ok(Generated::default())
        }
    }

    /// Pipeline returning fixed messages and recording its arguments
    struct CannedPipeline {
        messages: Vec<ResearchMessage>,
        calls: Mutex<Vec<(String, u32, u32)>>,
    }

    impl CannedPipeline {
        fn new(messages: Vec<ResearchMessage>) -> Arc<Self> {
            Arc::new(Self {
                messages,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ResearchPipeline for CannedPipeline {
        async fn invoke(
            &self,
            query: &str,
            max_loops: u32,
            initial_search_count: u32,
        ) -> Result<ResearchOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), max_loops, initial_search_count));
            Ok(ResearchOutcome {
                messages: self.messages.clone(),
            })
        }
    }

    struct FailingPipeline(AtomicUsize);

    #[async_trait]
    impl ResearchPipeline for FailingPipeline {
        async fn invoke(&self, _query: &str, _max: u32, _initial: u32) -> Result<ResearchOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(DispatchError::GenerationFailure("search backend down".into()))
        }
    }

    #[tokio::test]
    async fn test_simple_path() {
        let responder = GreetingResponder::new(Arc::new(EchoGenerator));
        let reply = responder
            .handle(Envelope::user_text("Write a short welcome message"))
            .await
            .unwrap();
        assert_eq!(reply.role(), Role::Agent);
        assert!(matches!(reply.content(), Content::Text(_)));
        assert_eq!(reply.text(), "simple: Write a short welcome message");
    }

    #[tokio::test]
    async fn test_simple_path_generator_failure() {
        let responder = GreetingResponder::new(Arc::new(DownGenerator));
        let reply = responder.handle(Envelope::user_text("hello")).await.unwrap();
        assert!(reply.text().starts_with("Error generating response: "));
        assert!(reply.text().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_empty_model_reply_is_an_error() {
        let responder = GreetingResponder::new(Arc::new(SilentGenerator));
        let reply = responder
            .handle(Envelope::user_text("Write a poem"))
            .await
            .unwrap();
        assert!(reply.text().starts_with("Error generating response: "));
        assert!(reply.text().contains("no text"));

        let whitespace = GreetingResponder::new(Arc::new(FixedText("  \n")));
        let reply = whitespace.handle(Envelope::user_text("hi")).await.unwrap();
        assert!(reply.text().starts_with("Error generating response: "));
    }

    #[tokio::test]
    async fn test_research_answer_is_last_message() {
        let pipeline = CannedPipeline::new(vec![
            ResearchMessage::user("Who won the last World Cup?"),
            ResearchMessage::agent("Argentina won the 2022 FIFA World Cup."),
        ]);
        let responder = GreetingResponder::new(Arc::new(EchoGenerator))
            .with_research(pipeline.clone())
            .with_research_limits(3, 4);

        let reply = responder
            .handle(Envelope::user_text("Who won the last World Cup?"))
            .await
            .unwrap();
        assert_eq!(reply.text(), "Argentina won the 2022 FIFA World Cup.");
        assert_eq!(
            pipeline.calls.lock().unwrap().as_slice(),
            &[("Who won the last World Cup?".to_string(), 3, 4)]
        );
    }

    #[tokio::test]
    async fn test_research_without_answer_uses_placeholder() {
        let pipeline = CannedPipeline::new(vec![ResearchMessage::user("latest news")]);
        let responder = GreetingResponder::new(Arc::new(EchoGenerator)).with_research(pipeline);
        let reply = responder.handle(Envelope::user_text("latest news")).await.unwrap();
        assert_eq!(
            reply.text(),
            "Research completed but produced no answer for: 'latest news'"
        );
    }

    #[tokio::test]
    async fn test_research_failure_falls_back_to_simple_path() {
        let pipeline = Arc::new(FailingPipeline(AtomicUsize::new(0)));
        let responder =
            GreetingResponder::new(Arc::new(EchoGenerator)).with_research(pipeline.clone());
        let reply = responder
            .handle(Envelope::user_text("Compare Rust and Go"))
            .await
            .unwrap();
        assert_eq!(reply.text(), "simple: Compare Rust and Go");
        assert_eq!(pipeline.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_research_query_skips_pipeline() {
        let pipeline = CannedPipeline::new(vec![]);
        let responder =
            GreetingResponder::new(Arc::new(EchoGenerator)).with_research(pipeline.clone());
        let reply = responder.handle(Envelope::user_text("Say hello")).await.unwrap();
        assert_eq!(reply.text(), "simple: Say hello");
        assert!(pipeline.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_research_disabled_uses_simple_path() {
        let responder = GreetingResponder::new(Arc::new(EchoGenerator));
        assert!(!responder.research_enabled());
        let reply = responder
            .handle(Envelope::user_text("Who won the last World Cup?"))
            .await
            .unwrap();
        assert_eq!(reply.text(), "simple: Who won the last World Cup?");
    }
}
