//! weird — weir server daemon.
//!
//! Binds the server-to-server UDP link, provisions the configured peers,
//! and runs the fair scheduler until ctrl-c or an API shutdown request.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use weir_core::config::WeirConfig;
use weir_services::{MessageRouter, RouterConfig, TracingTelemetry};

mod scheduling;
mod udp;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = WeirConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = WeirConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        WeirConfig::default()
    });
    tracing::info!(
        node = %config.node.id,
        listen = %config.node.listen,
        rate_bytes_per_sec = config.scheduler.rate_bytes_per_sec,
        renormalize_weights = config.scheduler.renormalize_weights,
        "weird starting"
    );

    // Server link
    let transport = udp::UdpTransport::bind(&config.node.listen, &config.peers).await?;
    tracing::info!(addr = %transport.local_addr()?, peers = config.peers.len(), "server link bound");

    let router = Arc::new(MessageRouter::new(
        RouterConfig::from(&config),
        Arc::new(transport),
        Arc::new(TracingTelemetry),
    ));

    for peer in &config.peers {
        match router.set_server_weight(peer.id, peer.weight) {
            Ok(()) => tracing::info!(peer = %peer.id, addr = %peer.addr, weight = peer.weight, "peer provisioned"),
            Err(e) => tracing::warn!(peer = %peer.id, error = %e, "peer not provisioned"),
        }
    }

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let scheduler_task = tokio::spawn(scheduling::scheduling_loop(
        router.clone(),
        Duration::from_millis(config.scheduler.tick_interval_ms.max(1)),
        shutdown_tx.subscribe(),
    ));

    let api_task = if config.api.enabled {
        let state = weir_api::ApiState {
            router: router.clone(),
            shutdown_tx: shutdown_tx.clone(),
        };
        let port = config.api.port;
        Some(tokio::spawn(async move {
            if let Err(e) = weir_api::serve(state, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        }))
    } else {
        None
    };

    scheduler_task.await?;
    if let Some(task) = api_task {
        task.await?;
    }

    let stats = router.stats();
    tracing::info!(
        pending_bytes = stats.pending_bytes,
        delivered = stats.delivered_messages,
        "weird stopped"
    );
    Ok(())
}
