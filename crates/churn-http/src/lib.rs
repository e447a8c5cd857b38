//! churn-http: HTTP front end
//!
//! Serves the agent over a small JSON API:
//! ```text
//! GET  /health       liveness
//! POST /chat         one agent turn
//! GET  /metrics      Prometheus turn metrics
//! GET  /api/tools/*  tool catalog (churn_tools::create_router)
//! ```

pub mod middleware;
pub mod router;
pub mod server;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

// Re-export main types
pub use middleware::{apply_middleware, MiddlewareConfig, MiddlewareStack};
pub use router::{create_router, AppState, ChatBody, ChatReply};
pub use server::{HttpServer, HttpServerBuilder};

/// Error types for the HTTP server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Server binding error: {0}")]
    BindError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors returned by request handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Agent(#[from] churn_core::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Agent(e) if e.is_fatal() => StatusCode::BAD_GATEWAY,
            ApiError::Agent(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("no message".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(churn_core::Error::backend("connection refused")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(churn_core::Error::internal("oops")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
