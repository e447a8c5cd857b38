//! Application routes
//!
//! `POST /chat` runs one agent turn per request. Concurrent requests run
//! concurrent turns; they share the tool registry, dataset cache and call
//! metrics through [`AppState`].

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use churn_agent::Agent;
use churn_tools::ToolsState;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::ApiError;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatBody {
    pub message: String,
}

/// Reply of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub latency_sec: f64,
    pub total_requests: u64,
}

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    let tools = churn_tools::create_router(ToolsState::new(state.agent.registry().clone()));

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .nest("/api/tools", tools)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    debug!(chars = body.message.len(), "Chat request");
    let metered = state.agent.handle(&body.message).await.map_err(|m| m.result)?;

    Ok(Json(ChatReply {
        reply: metered.result.final_output,
        latency_sec: metered.metrics.latency_sec,
        total_requests: metered.metrics.total_requests,
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let text = state
        .agent
        .metrics()
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
