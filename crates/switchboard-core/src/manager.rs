//! Manager agent: classifies requests and relays them to specialists

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::endpoint::AgentEndpoint;
use crate::envelope::Envelope;
use crate::error::{DispatchError, Result};
use crate::providers::{Generator, ResponseKind};
use crate::routing::{RoutingDecision, classification_prompt};

/// Ordered, read-only mapping from specialist name to endpoint
#[derive(Clone, Default)]
pub struct SpecialistRegistry {
    entries: Vec<(String, Arc<dyn AgentEndpoint>)>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specialist. Re-registering a name replaces the endpoint
    /// but keeps its original position.
    pub fn with(mut self, name: impl Into<String>, endpoint: Arc<dyn AgentEndpoint>) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = endpoint,
            None => self.entries.push((name, endpoint)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AgentEndpoint>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, endpoint)| endpoint)
    }

    /// Registered names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a request currently is inside [`ManagerAgent::handle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerState {
    Idle,
    Classifying,
    Dispatching,
    Relaying,
}

/// Router agent: classify, dispatch, relay
pub struct ManagerAgent {
    classifier: Arc<dyn Generator>,
    specialists: SpecialistRegistry,
}

impl ManagerAgent {
    pub fn new(classifier: Arc<dyn Generator>, specialists: SpecialistRegistry) -> Self {
        info!(
            "ManagerAgent: initialized with specialists [{}] (classifier: {})",
            specialists.names().join(", "),
            classifier.model()
        );
        Self {
            classifier,
            specialists,
        }
    }

    pub fn specialists(&self) -> &SpecialistRegistry {
        &self.specialists
    }

    /// Ask the classifier which specialist should answer `query`
    pub async fn classify(&self, query: &str) -> Result<RoutingDecision> {
        let prompt = classification_prompt(query);
        let generated = self
            .classifier
            .generate(&prompt, ResponseKind::Text)
            .await
            .map_err(|e| DispatchError::ClassificationFailure(e.to_string()))?;
        Ok(RoutingDecision::parse(&generated.joined_text()))
    }

    fn unknown_specialist_text(&self, name: &str) -> String {
        format!(
            "Routing error: Could not find a specialist named '{}'. Valid specialists: {}",
            name,
            self.specialists.names().join(", ")
        )
    }

    async fn route(&self, envelope: Envelope) -> Result<Envelope> {
        transition(ManagerState::Idle, ManagerState::Classifying);
        let decision = self.classify(envelope.text()).await?;
        info!("ManagerAgent: routing decision '{}'", decision);

        transition(ManagerState::Classifying, ManagerState::Dispatching);
        match self.specialists.get(decision.name()) {
            Some(specialist) => specialist.call(envelope).await,
            None => {
                warn!("ManagerAgent: unrecognized specialist '{}'", decision);
                Ok(Envelope::agent_text(
                    self.unknown_specialist_text(decision.name()),
                ))
            }
        }
    }
}

fn transition(from: ManagerState, to: ManagerState) {
    debug!("ManagerAgent: {:?} -> {:?}", from, to);
}

#[async_trait]
impl AgentEndpoint for ManagerAgent {
    fn name(&self) -> &str {
        "manager_agent"
    }

    fn description(&self) -> &str {
        "Routes each request to the specialist agent best suited to answer it"
    }

    async fn handle(&self, envelope: Envelope) -> Result<Envelope> {
        info!("ManagerAgent: received query ({} chars)", envelope.text().len());

        let reply = match self.route(envelope).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("ManagerAgent: folding error into reply: {}", e);
                Envelope::agent_text(format!("An error occurred in the ManagerAgent: {}", e))
            }
        };

        transition(ManagerState::Relaying, ManagerState::Idle);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Content, Role};
    use crate::providers::Generated;
    use crate::responders::ImageResponder;
    use crate::routing::{GREETING_AGENT, IMAGE_AGENT};
    use std::sync::Mutex;

    /// Classifier that always answers with a fixed string
    struct FixedClassifier(String);

    #[async_trait]
    impl Generator for FixedClassifier {
        fn provider_name(&self) -> &str {
            "fixed"
        }
        fn model(&self) -> &str {
            "fixed-model"
        }
        async fn generate(&self, _prompt: &str, _kind: ResponseKind) -> Result<Generated> {
            Ok(Generated::text(self.0.clone()))
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl Generator for FailingClassifier {
        fn provider_name(&self) -> &str {
            "failing"
        }
        fn model(&self) -> &str {
            "failing-model"
        }
        async fn generate(&self, _prompt: &str, _kind: ResponseKind) -> Result<Generated> {
            Err(DispatchError::GenerationFailure("quota exhausted".into()))
        }
    }

    /// Specialist that records what it received and answers with its name
    struct RecordingSpecialist {
        name: String,
        received: Mutex<Vec<Envelope>>,
    }

    impl RecordingSpecialist {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                received: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AgentEndpoint for RecordingSpecialist {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "records requests"
        }
        async fn handle(&self, envelope: Envelope) -> Result<Envelope> {
            self.received.lock().unwrap().push(envelope);
            Ok(Envelope::agent_text(format!("handled by {}", self.name)))
        }
    }

    struct UnreachableSpecialist;

    #[async_trait]
    impl AgentEndpoint for UnreachableSpecialist {
        fn name(&self) -> &str {
            IMAGE_AGENT
        }
        fn description(&self) -> &str {
            "always down"
        }
        async fn handle(&self, _envelope: Envelope) -> Result<Envelope> {
            Err(DispatchError::SpecialistUnavailable("connection refused".into()))
        }
    }

    fn manager_with(
        classifier: Arc<dyn Generator>,
    ) -> (ManagerAgent, Arc<RecordingSpecialist>, Arc<RecordingSpecialist>) {
        let greeting = RecordingSpecialist::new(GREETING_AGENT);
        let image = RecordingSpecialist::new(IMAGE_AGENT);
        let registry = SpecialistRegistry::new()
            .with(GREETING_AGENT, greeting.clone())
            .with(IMAGE_AGENT, image.clone());
        (ManagerAgent::new(classifier, registry), greeting, image)
    }

    #[tokio::test]
    async fn test_routes_to_registered_specialist() {
        let (manager, greeting, image) =
            manager_with(Arc::new(FixedClassifier("image_agent".into())));
        let reply = manager
            .handle(Envelope::user_text("Draw a friendly robot"))
            .await
            .unwrap();

        assert_eq!(reply.role(), Role::Agent);
        assert_eq!(reply.text(), "handled by image_agent");
        assert!(greeting.received.lock().unwrap().is_empty());

        // The original USER envelope is forwarded unmodified
        let received = image.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], Envelope::user_text("Draw a friendly robot"));
    }

    #[tokio::test]
    async fn test_normalizes_classifier_output() {
        let (manager, greeting, _) =
            manager_with(Arc::new(FixedClassifier("  'Greeting_Agent'\n".into())));
        let reply = manager.handle(Envelope::user_text("hi")).await.unwrap();
        assert_eq!(reply.text(), "handled by greeting_agent");
        assert_eq!(greeting.received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_specialist_lists_valid_names_in_order() {
        let (manager, greeting, image) =
            manager_with(Arc::new(FixedClassifier("translation_agent".into())));
        let reply = manager.handle(Envelope::user_text("foobar")).await.unwrap();

        assert_eq!(reply.role(), Role::Agent);
        assert!(reply.text().contains("'translation_agent'"));
        assert!(reply.text().contains("greeting_agent, image_agent"));
        assert!(greeting.received.lock().unwrap().is_empty());
        assert!(image.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classification_failure_is_folded() {
        let (manager, _, _) = manager_with(Arc::new(FailingClassifier));
        let reply = manager.handle(Envelope::user_text("hello")).await.unwrap();
        assert_eq!(reply.role(), Role::Agent);
        assert!(reply.text().starts_with("An error occurred in the ManagerAgent: "));
        assert!(reply.text().contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_folded() {
        let registry = SpecialistRegistry::new()
            .with(GREETING_AGENT, RecordingSpecialist::new(GREETING_AGENT))
            .with(IMAGE_AGENT, Arc::new(UnreachableSpecialist));
        let manager = ManagerAgent::new(Arc::new(FixedClassifier("image_agent".into())), registry);

        let reply = manager.handle(Envelope::user_text("draw a cat")).await.unwrap();
        assert!(matches!(reply.content(), Content::Text(_)));
        assert!(reply.text().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_deterministic_classifier_is_idempotent() {
        let (manager, greeting, _) =
            manager_with(Arc::new(FixedClassifier("greeting_agent".into())));
        let first = manager.handle(Envelope::user_text("same text")).await.unwrap();
        let second = manager.handle(Envelope::user_text("same text")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(greeting.received.lock().unwrap().len(), 2);
    }

    /// Image model stub returning a fixed PNG header
    struct CannedImageModel;

    #[async_trait]
    impl Generator for CannedImageModel {
        fn provider_name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-image-model"
        }
        async fn generate(&self, _prompt: &str, kind: ResponseKind) -> Result<Generated> {
            assert_eq!(kind, ResponseKind::Image);
            Ok(Generated::image("image/png", vec![137, 80, 78, 71]))
        }
    }

    #[tokio::test]
    async fn test_image_status_is_relayed_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robot.png");
        let registry = SpecialistRegistry::new()
            .with(GREETING_AGENT, RecordingSpecialist::new(GREETING_AGENT))
            .with(
                IMAGE_AGENT,
                Arc::new(ImageResponder::new(Arc::new(CannedImageModel), &path)),
            );
        let manager = ManagerAgent::new(Arc::new(FixedClassifier("image_agent".into())), registry);

        let reply = manager
            .handle(Envelope::user_text("Draw a friendly robot"))
            .await
            .unwrap();

        let expected = format!("Image generated successfully and saved to '{}'", path.display());
        assert_eq!(reply.role(), Role::Agent);
        assert_eq!(reply.content(), &Content::ImageStatus(expected));
        assert_eq!(std::fs::read(&path).unwrap(), vec![137, 80, 78, 71]);
    }

    #[test]
    fn test_registry_keeps_insertion_order() {
        let registry = SpecialistRegistry::new()
            .with("b_agent", RecordingSpecialist::new("b_agent"))
            .with("a_agent", RecordingSpecialist::new("a_agent"))
            .with("b_agent", RecordingSpecialist::new("b_agent"));
        assert_eq!(registry.names(), vec!["b_agent", "a_agent"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a_agent").is_some());
        assert!(registry.get("c_agent").is_none());
        assert!(SpecialistRegistry::new().is_empty());
    }
}
