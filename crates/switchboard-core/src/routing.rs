//! Request classification: which specialist should answer
//!
//! The classifier model is asked for a bare specialist name. Its raw reply is
//! normalized and parsed into a closed [`RoutingDecision`]; anything that is
//! not a known name becomes [`RoutingDecision::Unknown`] instead of being
//! matched loosely.

pub const GREETING_AGENT: &str = "greeting_agent";
pub const IMAGE_AGENT: &str = "image_agent";

/// Outcome of classifying one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Informational, text, and research requests
    Greeting,
    /// Requests whose primary intent is creating visual content
    Image,
    /// The classifier named something outside the fixed specialist set
    Unknown(String),
}

impl RoutingDecision {
    /// Parse a classifier reply. Normalization is applied first.
    pub fn parse(raw: &str) -> Self {
        let name = normalize(raw);
        match name.as_str() {
            GREETING_AGENT => Self::Greeting,
            IMAGE_AGENT => Self::Image,
            _ => Self::Unknown(name),
        }
    }

    /// Registry key for this decision
    pub fn name(&self) -> &str {
        match self {
            Self::Greeting => GREETING_AGENT,
            Self::Image => IMAGE_AGENT,
            Self::Unknown(name) => name,
        }
    }
}

impl std::fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trim whitespace, lowercase, and strip surrounding quote characters
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
        .to_string()
}

/// Build the classification prompt for a request
pub fn classification_prompt(query: &str) -> String {
    format!(
        "You are an intelligent routing agent. Your job is to analyze a user's request and \
         choose the correct specialist agent to handle it. You must respond with only the \
         agent's name.\n\n\
         The available specialist agents are:\n\
         1. '{GREETING_AGENT}': The default. Select this for answering questions, explaining \
         topics, researching current events, writing text, drafting emails or messages, and \
         any other informational or conversational request.\n\
         2. '{IMAGE_AGENT}': Select this ONLY when the primary intent of the request is to \
         create visual content: drawing something, generating a picture or illustration, or \
         designing a logo. Requests that merely mention images or visuals belong to \
         '{GREETING_AGENT}'.\n\n\
         User Request: \"{query}\"\n\
         Chosen Agent:"
    )
}
