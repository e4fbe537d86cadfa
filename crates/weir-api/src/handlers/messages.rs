//! /send and /receive handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use weir_core::NodeId;
use weir_services::SchedulerError;

use super::ApiState;

// ── /send (POST) ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendRequest {
    pub to: NodeId,
    pub payload_hex: String,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub accepted: bool,
    pub message_bytes: usize,
}

pub async fn handle_send(
    State(state): State<ApiState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, (StatusCode, String)> {
    let payload = hex::decode(&req.payload_hex)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid hex payload".to_string()))?;

    match state.router.try_add_message(req.to, &payload) {
        Ok(()) => Ok(Json(SendResponse {
            accepted: true,
            message_bytes: payload.len(),
        })),
        Err(e @ SchedulerError::QueueFull { .. }) => {
            Err((StatusCode::TOO_MANY_REQUESTS, e.to_string()))
        }
        Err(e @ SchedulerError::UnknownDestination(_)) => {
            Err((StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

// ── /receive (GET) ────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ReceiveResponse {
    pub messages: Vec<ReceivedJson>,
}

#[derive(Serialize)]
pub struct ReceivedJson {
    pub from: NodeId,
    pub payload_hex: String,
}

pub async fn handle_receive(State(state): State<ApiState>) -> Json<ReceiveResponse> {
    let messages = state
        .router
        .receive_all()
        .into_iter()
        .map(|d| ReceivedJson {
            from: d.source,
            payload_hex: hex::encode(&d.payload),
        })
        .collect();

    Json(ReceiveResponse { messages })
}
