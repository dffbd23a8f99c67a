//! Gateway HTTP server (Axum)
//!
//! - POST /query: `{"text": ...}` in, `{"response": ...}` out
//! - GET  /health: liveness
//! - GET  /: banner

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use switchboard_core::{AgentEndpoint, Envelope};

use crate::auth::GatewayAuth;
use crate::protocol::{BANNER, ErrorDetail, QueryRequest, QueryResponse};

/// Shared state for all requests
#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<dyn AgentEndpoint>,
    pub auth: GatewayAuth,
    pub started_at: DateTime<Utc>,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    /// `manager` is usually a `RemoteAgent` pointing at the manager's server
    pub fn new(manager: Arc<dyn AgentEndpoint>, bind: SocketAddr, auth: GatewayAuth) -> Self {
        Self {
            state: GatewayState {
                manager,
                auth,
                started_at: Utc::now(),
            },
            bind,
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/query", post(query_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("Failed to bind gateway on {}", self.bind))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        info!(
            "Gateway listening on {} (manager: {})",
            listener.local_addr()?,
            self.state.manager.name()
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

// ── HTTP Handlers ──

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": BANNER }))
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "Gateway is running",
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

async fn query_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    if !state.auth.authorize(&headers) {
        return detail_response(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    let query = match payload {
        Ok(Json(query)) => query,
        Err(rejection) => return detail_response(rejection.status(), rejection.body_text()),
    };

    let request_id = Uuid::new_v4();
    info!(%request_id, "Gateway: forwarding query ({} chars)", query.text.len());
    match state.manager.call(Envelope::user_text(query.text)).await {
        Ok(reply) => {
            info!(%request_id, "Gateway: reply received ({} chars)", reply.text().len());
            Json(QueryResponse {
                response: reply.into_text(),
            })
            .into_response()
        }
        Err(e) => {
            error!(%request_id, "Gateway: query failed: {}", e);
            let status = if e.is_fatal() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            detail_response(status, e.to_string())
        }
    }
}

fn detail_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(ErrorDetail::new(detail))).into_response()
}
