//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `upload`: `POST /file/{file_name}`, the inbound edge of the pipeline

pub mod health;
pub mod upload;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// API version and base info
///
/// # Response
///
/// ```json
/// {
///   "name": "filegate",
///   "version": "0.1.0",
///   "rest_component": "axum",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "filegate",
        "version": env!("CARGO_PKG_VERSION"),
        "rest_component": state.config.rest_component,
        "endpoints": [
            "/file/{fileName}",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
