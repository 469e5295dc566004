// Internal HTTP routes and shared response types.

use crate::interface_adapters::protocol::StatsDto;
use crate::interface_adapters::state::AppState;
use crate::use_cases::CameraCommand;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

/// Returns current per-type camera counts and limits as JSON.
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (reply_tx, reply_rx) = oneshot::channel();
    if state
        .command_tx
        .send(CameraCommand::GetStats { reply: reply_tx })
        .await
        .is_err()
    {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "surveillance task unavailable".to_string(),
            }),
        )
            .into_response();
    }

    match reply_rx.await {
        Ok(stats) => (StatusCode::OK, Json(StatsDto::from(stats))).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "surveillance task unavailable".to_string(),
            }),
        )
            .into_response(),
    }
}
