//! HTTP API handlers — exposes the router as JSON.

pub mod messages;
pub mod peers;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;

use weir_core::NodeId;
use weir_services::MessageRouter;

#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<MessageRouter>,
    /// Shutdown broadcast sender — signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Parse a decimal node ID from a path segment.
fn parse_node_id(text: &str) -> Result<NodeId, (StatusCode, String)> {
    text.parse::<u32>()
        .map(NodeId)
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("invalid node id: {text}")))
}

// Re-export handler functions for use in router setup.
pub use messages::{handle_receive, handle_send};
pub use peers::{handle_remove_peer, handle_set_weight};
pub use status::{handle_shutdown, handle_status};
