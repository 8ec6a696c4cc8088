//! JSON-RPC over HTTP.
//!
//! - `POST /` and `POST /mcp` take one JSON-RPC message as the body
//! - a request gets `200 OK` with the JSON-RPC response
//! - a notification gets `204 No Content`
//! - a body that is not JSON gets `400 Bad Request`

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use tracing::debug;

use crate::error::ServerError;
use crate::state::AppState;

/// Handle one JSON-RPC message.
pub async fn mcp_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ServerError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON: {e}")))?;

    match state.dispatcher.handle_value(value).await {
        Some(response) => Ok(Json(response).into_response()),
        None => {
            debug!("no response for message");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// Create the JSON-RPC routes.
pub fn mcp_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(mcp_handler))
        .route("/mcp", post(mcp_handler))
}
