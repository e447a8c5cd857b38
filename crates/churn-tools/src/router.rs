//! Tools Router - HTTP endpoints for the tool catalog
//!
//! This module exports a router that churn-http nests under `/api/tools`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::registry::ToolRegistry;

/// Tools service state
#[derive(Clone)]
pub struct ToolsState {
    pub registry: Arc<ToolRegistry>,
}

impl ToolsState {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

/// Create the tools router
///
/// ```ignore
/// let router = Router::new().nest("/api/tools", create_router(ToolsState::new(registry)));
/// ```
pub fn create_router(state: ToolsState) -> Router {
    Router::new()
        .route("/", get(list_tools_handler))
        .route("/:name", get(get_tool_handler))
        .with_state(state)
}

// === Handlers ===

async fn list_tools_handler(State(state): State<ToolsState>) -> impl IntoResponse {
    let tools = state.registry.list().await;
    Json(json!({
        "count": tools.len(),
        "tools": tools,
    }))
}

async fn get_tool_handler(
    State(state): State<ToolsState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.registry.get_definition(&name).await {
        Some(definition) => (StatusCode::OK, Json(json!(definition))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Tool not found: {}", name) })),
        ),
    }
}
