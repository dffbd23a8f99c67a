//! Generator-backed research graph
//!
//! ```text
//! generate queries ──> research each query ──> reflect ──┐
//!                            ^                           │ follow-ups, loops left
//!                            └───────────────────────────┘
//!                                                        │ sufficient / bound reached
//!                                                        v
//!                                                    finalize
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::providers::{Generator, ResponseKind};

use super::{ResearchMessage, ResearchOutcome, ResearchPipeline, ResearchState};

/// Reply the reflection step uses to stop looping
const SUFFICIENT_MARKER: &str = "SUFFICIENT";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reflection {
    Sufficient,
    FollowUp(Vec<String>),
}

/// Research pipeline that drives every node with the same generator.
///
/// The first search round always runs; `max_loops` counts rounds, so a bound
/// of 0 behaves like 1.
pub struct GraphResearchPipeline {
    generator: Arc<dyn Generator>,
}

impl GraphResearchPipeline {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        let generated = self.generator.generate(prompt, ResponseKind::Text).await?;
        Ok(generated.joined_text().trim().to_string())
    }

    async fn generate_queries(&self, query: &str, count: u32) -> Result<Vec<String>> {
        let prompt = format!(
            "You are preparing web research. Write {count} diverse, specific search queries \
             that together would answer the question below. Respond with one query per line \
             and nothing else.\n\nQuestion: {query}"
        );
        let reply = self.ask(&prompt).await?;
        let mut queries = parse_lines(&reply, count as usize);
        if queries.is_empty() {
            queries.push(query.to_string());
        }
        Ok(queries)
    }

    async fn research(&self, search_query: &str) -> Result<String> {
        let prompt = format!(
            "Summarize the most relevant, up-to-date facts you know for the search query \
             below. Be concise and note when information may be outdated.\n\n\
             Search query: {search_query}"
        );
        self.ask(&prompt).await
    }

    async fn reflect(&self, state: &ResearchState, max_queries: u32) -> Result<Reflection> {
        let prompt = format!(
            "You are reviewing research notes gathered to answer a question.\n\n\
             Question: {}\n\nNotes:\n{}\n\n\
             If the notes are enough to answer the question, respond with exactly \
             {SUFFICIENT_MARKER}. Otherwise respond with up to {max_queries} follow-up search \
             queries that would fill the knowledge gap, one per line and nothing else.",
            state.query,
            state.findings.join("\n\n"),
        );
        let reply = self.ask(&prompt).await?;
        Ok(parse_reflection(&reply, max_queries as usize))
    }

    async fn finalize(&self, state: &ResearchState) -> Result<String> {
        let prompt = format!(
            "Using the research notes below, write a clear, well-organized answer to the \
             question. Do not mention the notes themselves.\n\n\
             Question: {}\n\nNotes:\n{}",
            state.query,
            state.findings.join("\n\n"),
        );
        self.ask(&prompt).await
    }
}

#[async_trait]
impl ResearchPipeline for GraphResearchPipeline {
    async fn invoke(
        &self,
        query: &str,
        max_loops: u32,
        initial_search_count: u32,
    ) -> Result<ResearchOutcome> {
        let mut state = ResearchState::new(query, max_loops);
        let per_round = initial_search_count.max(1);
        let mut queries = self.generate_queries(query, per_round).await?;

        loop {
            for search_query in &queries {
                let summary = self.research(search_query).await?;
                state.findings.push(format!("{}:\n{}", search_query, summary));
                state.search_query_count += 1;
            }
            state.loop_count += 1;
            debug!(
                "Research loop {}/{} done ({} queries so far)",
                state.loop_count, state.max_loops, state.search_query_count
            );

            if !state.can_loop() {
                break;
            }
            match self.reflect(&state, per_round).await? {
                Reflection::Sufficient => break,
                Reflection::FollowUp(next) if next.is_empty() => break,
                Reflection::FollowUp(next) => queries = next,
            }
        }

        let answer = self.finalize(&state).await?;
        if !answer.is_empty() {
            state.messages.push(ResearchMessage::agent(answer));
        }
        info!(
            "Research finished after {} loop(s), {} queries",
            state.loop_count, state.search_query_count
        );
        Ok(state.into_outcome())
    }
}

/// Non-empty lines with list markers and quotes removed, capped at `limit`
fn parse_lines(reply: &str, limit: usize) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            strip_list_marker(line.trim())
                .trim_matches(|c: char| c == '"' || c == '\'')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(limit)
        .collect()
}

/// Strip "1." / "2)" numbering or a "-" / "*" bullet
fn strip_list_marker(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &line[digits..];
    let rest = if digits > 0 && (rest.starts_with('.') || rest.starts_with(')')) {
        &rest[1..]
    } else if digits == 0 {
        rest.trim_start_matches(['-', '*', '•'])
    } else {
        line
    };
    rest.trim()
}

fn parse_reflection(reply: &str, limit: usize) -> Reflection {
    if reply.trim().to_uppercase().starts_with(SUFFICIENT_MARKER) {
        Reflection::Sufficient
    } else {
        Reflection::FollowUp(parse_lines(reply, limit))
    }
}
