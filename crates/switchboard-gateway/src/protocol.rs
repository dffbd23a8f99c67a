//! Gateway JSON bodies

use serde::{Deserialize, Serialize};

pub const BANNER: &str = "Switchboard agent gateway is running.";

/// `POST /query` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
}

/// `POST /query` success body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Body of every gateway error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_requires_text() {
        let req: QueryRequest = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(req.text, "hi");
        assert!(serde_json::from_str::<QueryRequest>(r#"{"query":"hi"}"#).is_err());
    }

    #[test]
    fn test_error_detail_json() {
        let json = serde_json::to_string(&ErrorDetail::new("manager down")).unwrap();
        assert_eq!(json, r#"{"detail":"manager down"}"#);
    }
}
