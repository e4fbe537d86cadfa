//! /weights and /peers handlers — destination provisioning.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use weir_core::NodeId;
use weir_services::SchedulerError;

use super::{parse_node_id, ApiState};

// ── /weights (POST) ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SetWeightRequest {
    pub node: NodeId,
    pub weight: f64,
}

#[derive(Serialize)]
pub struct SetWeightResponse {
    pub node: NodeId,
    pub weight: f64,
}

pub async fn handle_set_weight(
    State(state): State<ApiState>,
    Json(req): Json<SetWeightRequest>,
) -> Result<Json<SetWeightResponse>, (StatusCode, String)> {
    state
        .router
        .set_server_weight(req.node, req.weight)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    tracing::info!(node = %req.node, weight = req.weight, "destination weight set");

    Ok(Json(SetWeightResponse {
        node: req.node,
        weight: req.weight,
    }))
}

// ── /peers/{id} (DELETE) ──────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RemovePeerResponse {
    pub node: NodeId,
    pub discarded_messages: usize,
}

pub async fn handle_remove_peer(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<RemovePeerResponse>, (StatusCode, String)> {
    let node = parse_node_id(&id)?;
    match state.router.remove_server(node) {
        Ok(discarded_messages) => {
            tracing::info!(%node, discarded_messages, "destination removed");
            Ok(Json(RemovePeerResponse {
                node,
                discarded_messages,
            }))
        }
        Err(e @ SchedulerError::UnknownDestination(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
