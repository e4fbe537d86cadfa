//! weir integration test harness.
//!
//! Every test builds a small cluster of routers on one in-process
//! `MemoryNetwork` and drives their scheduling ticks by hand, so runs are
//! deterministic and need no sockets.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;

use weir_core::NodeId;
use weir_services::{Delivered, MemoryNetwork, MessageRouter, RouterConfig, SentLog};

mod delivery;
mod fairness;

// ── Harness ───────────────────────────────────────────────────────────────────

pub struct Node {
    pub router: MessageRouter,
    pub sent: Arc<SentLog>,
}

pub struct Cluster {
    pub net: MemoryNetwork,
    pub nodes: BTreeMap<NodeId, Node>,
    now: Duration,
}

impl Cluster {
    /// One router per id, all with the same rate budget and queue capacity.
    pub fn new(ids: &[u32], rate_bytes_per_sec: u64, capacity_bytes: usize) -> Self {
        let net = MemoryNetwork::new();
        let nodes = ids
            .iter()
            .map(|&id| {
                let node = NodeId(id);
                let sent = Arc::new(SentLog::new());
                let router = MessageRouter::new(
                    RouterConfig {
                        self_node: node,
                        rate_bytes_per_sec,
                        renormalize_weights: true,
                        default_queue_capacity_bytes: capacity_bytes,
                    },
                    Arc::new(net.attach(node)),
                    sent.clone(),
                );
                (node, Node { router, sent })
            })
            .collect();
        Self {
            net,
            nodes,
            now: Duration::ZERO,
        }
    }

    pub fn node(&self, id: u32) -> &Node {
        &self.nodes[&NodeId(id)]
    }

    pub fn router(&self, id: u32) -> &MessageRouter {
        &self.node(id).router
    }

    /// Give every node a queue to every other node at `weight`.
    pub fn full_mesh(&self, weight: f64) -> Result<()> {
        for (&from, node) in &self.nodes {
            for &to in self.nodes.keys().filter(|&&to| to != from) {
                node.router
                    .set_server_weight(to, weight)
                    .with_context(|| format!("provisioning {from} -> {to}"))?;
            }
        }
        Ok(())
    }

    /// Advance one second and run a service pass on every node, then a
    /// second pass so units sent this tick are drained by their receivers.
    pub fn tick(&mut self) {
        self.now += Duration::from_secs(1);
        for node in self.nodes.values() {
            node.router.service(self.now);
        }
        for node in self.nodes.values() {
            node.router.service(self.now);
        }
    }

    /// Everything waiting for `id`, oldest first.
    pub fn received(&self, id: u32) -> Vec<Delivered> {
        self.router(id).receive_all()
    }
}

pub fn payload(tag: u8, len: usize) -> Bytes {
    Bytes::from(vec![tag; len])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn cluster_harness_builds_a_mesh() -> Result<()> {
    let cluster = Cluster::new(&[1, 2, 3], 1000, 4096);
    cluster.full_mesh(1.0)?;
    for id in [1, 2, 3] {
        assert_eq!(cluster.router(id).stats().destinations.len(), 2);
    }
    Ok(())
}
