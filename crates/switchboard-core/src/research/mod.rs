//! Research sub-pipeline: the heavier path for information-seeking requests
//!
//! The greeting responder consults [`is_research_query`] and, when a
//! pipeline was supplied at construction, hands the request to a
//! [`ResearchPipeline`]. The answer is the last message the pipeline
//! produced ([`extract_answer`]).

pub mod graph;

use async_trait::async_trait;

use crate::envelope::Role;
use crate::error::Result;

pub use graph::GraphResearchPipeline;

/// Keywords that flag a request as research-oriented
pub const RESEARCH_KEYWORDS: &[&str] = &[
    "who",
    "what",
    "when",
    "where",
    "why",
    "how",
    "latest",
    "recent",
    "current",
    "news",
    "winner",
    "champion",
    "result",
    "score",
    "statistics",
    "compare",
    "explain",
    "research",
    "find",
    "search",
];

/// Default bound on reflection loops
pub const DEFAULT_MAX_RESEARCH_LOOPS: u32 = 2;

/// Default number of queries generated before the first loop
pub const DEFAULT_INITIAL_SEARCH_QUERY_COUNT: u32 = 3;

/// Substring test: does the lowercased request contain any research keyword?
pub fn is_research_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    RESEARCH_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// One entry of the pipeline's produced message sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchMessage {
    pub role: Role,
    pub content: String,
}

impl ResearchMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }
}

/// What a pipeline invocation hands back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchOutcome {
    pub messages: Vec<ResearchMessage>,
}

/// Accumulating record owned by a single pipeline invocation
#[derive(Debug, Clone)]
pub struct ResearchState {
    pub query: String,
    pub loop_count: u32,
    pub max_loops: u32,
    /// Total search queries run so far
    pub search_query_count: u32,
    pub messages: Vec<ResearchMessage>,
    /// Per-query summaries gathered so far
    pub findings: Vec<String>,
}

impl ResearchState {
    pub fn new(query: impl Into<String>, max_loops: u32) -> Self {
        let query = query.into();
        Self {
            messages: vec![ResearchMessage::user(query.clone())],
            query,
            loop_count: 0,
            max_loops,
            search_query_count: 0,
            findings: Vec::new(),
        }
    }

    /// Whether another reflection loop is allowed
    pub fn can_loop(&self) -> bool {
        self.loop_count < self.max_loops
    }

    pub fn into_outcome(self) -> ResearchOutcome {
        ResearchOutcome {
            messages: self.messages,
        }
    }
}

/// A multi-step reasoning process that answers one query
#[async_trait]
pub trait ResearchPipeline: Send + Sync {
    async fn invoke(
        &self,
        query: &str,
        max_loops: u32,
        initial_search_count: u32,
    ) -> Result<ResearchOutcome>;
}

/// Take the final message as the answer. With one or fewer messages the
/// pipeline produced nothing beyond the question, so a placeholder is used.
pub fn extract_answer(outcome: &ResearchOutcome, query: &str) -> String {
    match outcome.messages.as_slice() {
        [] | [_] => format!(
            "Research completed but produced no answer for: '{}'",
            query
        ),
        [.., last] => last.content.clone(),
    }
}
