//! Transport capability — the byte-moving collaborator behind the router.
//!
//! The router treats `send` as fire-and-forget and drains `poll_next` until
//! it returns `None`. Unit boundaries must be preserved: one `send` on one
//! side is one `poll_next` on the other.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use weir_core::NodeId;

pub trait Transport: Send + Sync {
    /// Hand a framed unit to the link. Must not block the caller.
    fn send(&self, dest: NodeId, unit: Bytes);

    /// Next complete unit received for this node, if any.
    fn poll_next(&self) -> Option<Bytes>;
}

/// In-process link shared by several nodes. Each attached node gets a
/// mailbox; units sent to a node that never attached are dropped.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    mailboxes: Arc<DashMap<NodeId, VecDeque<Bytes>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the transport endpoint for `node`.
    pub fn attach(&self, node: NodeId) -> MemoryTransport {
        self.mailboxes.entry(node).or_default();
        MemoryTransport {
            node,
            network: self.clone(),
        }
    }

    /// Units delivered to `node` that it has not polled yet.
    pub fn in_flight(&self, node: NodeId) -> usize {
        self.mailboxes.get(&node).map(|m| m.len()).unwrap_or(0)
    }

    /// Place a raw unit in `node`'s mailbox, bypassing any sender.
    pub fn inject(&self, node: NodeId, unit: Bytes) {
        if let Some(mut mailbox) = self.mailboxes.get_mut(&node) {
            mailbox.push_back(unit);
        }
    }
}

pub struct MemoryTransport {
    node: NodeId,
    network: MemoryNetwork,
}

impl MemoryTransport {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl Transport for MemoryTransport {
    fn send(&self, dest: NodeId, unit: Bytes) {
        match self.network.mailboxes.get_mut(&dest) {
            Some(mut mailbox) => mailbox.push_back(unit),
            None => tracing::debug!(from = %self.node, %dest, "no such node on memory network, unit dropped"),
        }
    }

    fn poll_next(&self) -> Option<Bytes> {
        self.network.mailboxes.get_mut(&self.node)?.pop_front()
    }
}
