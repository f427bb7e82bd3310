//! HTTP API endpoints.
//!
//! Used by the operator UI to connect the live source, and by anything that
//! wants the current round without opening a WebSocket.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::protocol::{ConnectRequest, ConnectResponse};
use crate::state::AppState;

/// Subscribe to a live stream.
///
/// POST /api/connect `{"username": "..."}`
///
/// The subscription itself is established in the background; its outcome is
/// broadcast to clients as `connectionStatus`.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectRequest>,
) -> impl IntoResponse {
    let username = request.username.trim();
    if username.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ConnectResponse {
                success: false,
                error: Some("Username is required".to_string()),
            }),
        );
    }

    match state.connect_source(username).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ConnectResponse {
                success: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to connect live source: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ConnectResponse {
                    success: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Current masked round snapshot.
///
/// GET /api/state
pub async fn game_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot().await)
}
