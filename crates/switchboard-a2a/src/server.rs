//! Agent server: exposes one `AgentEndpoint` over HTTP
//!
//! Endpoints:
//! - GET  /.well-known/agent.json: agent card
//! - GET  /health: liveness
//! - POST /a2a/message: one envelope in, one envelope out

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use switchboard_core::{AgentEndpoint, DispatchError, Envelope};

use crate::protocol::{
    AGENT_CARD_PATH, AgentCard, ErrorBody, HEALTH_PATH, HealthStatus, MAX_REQUEST_BODY_SIZE,
    MESSAGE_PATH,
};

#[derive(Clone)]
struct AgentServerState {
    endpoint: Arc<dyn AgentEndpoint>,
    card: Arc<AgentCard>,
}

pub struct AgentServer {
    state: AgentServerState,
    bind: SocketAddr,
}

impl AgentServer {
    pub fn new(endpoint: Arc<dyn AgentEndpoint>, card: AgentCard, bind: SocketAddr) -> Self {
        Self {
            state: AgentServerState {
                endpoint,
                card: Arc::new(card),
            },
            bind,
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route(AGENT_CARD_PATH, get(card_handler))
            .route(HEALTH_PATH, get(health_handler))
            .route(MESSAGE_PATH, post(message_handler))
            .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until the task is dropped
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("Failed to bind {} on {}", self.state.card.name, self.bind))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!("{} listening on {}", self.state.card.name, addr);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn card_handler(State(state): State<AgentServerState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

async fn health_handler(State(state): State<AgentServerState>) -> Json<HealthStatus> {
    Json(HealthStatus::healthy(state.endpoint.name()))
}

async fn message_handler(State(state): State<AgentServerState>, body: Bytes) -> Response {
    let envelope = match Envelope::from_wire(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("{}: rejected malformed envelope: {}", state.card.name, e);
            return error_response(StatusCode::BAD_REQUEST, &e);
        }
    };

    match state.endpoint.call(envelope).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            let status = if e.is_fatal() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, &e)
        }
    }
}

fn error_response(status: StatusCode, error: &DispatchError) -> Response {
    let body = ErrorBody {
        error: error.to_string(),
    };
    (status, Json(body)).into_response()
}
