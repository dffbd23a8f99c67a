//! Optional bearer-token check for `/query`

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use tracing::warn;

/// Token policy for the gateway. An empty token disables the check.
#[derive(Clone, Default)]
pub struct GatewayAuth {
    token: String,
}

impl std::fmt::Debug for GatewayAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayAuth")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl GatewayAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }

    /// Whether the request carries the configured `Authorization: Bearer` token
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let provided = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token);
        match provided {
            Some(token) => constant_time_eq(self.token.as_bytes(), token.as_bytes()),
            None => {
                warn!("Gateway auth: missing bearer token");
                false
            }
        }
    }
}

fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .trim()
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Compares every byte regardless of where the first mismatch is
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
