//! Inbound FIFO — payloads that arrived for this node, in arrival order.
//!
//! Written by the router's drain step, read by any number of caller
//! threads. Unbounded: receive bandwidth is not shaped, so callers are
//! expected to drain promptly.

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::Notify;
use weir_core::NodeId;

use crate::lock;

/// A payload delivered to this node, header already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub payload: Bytes,
    pub source: NodeId,
}

#[derive(Debug, Default)]
pub struct InboundQueue {
    entries: Mutex<VecDeque<Delivered>>,
    notify: Notify,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, payload: Bytes, source: NodeId) {
        lock(&self.entries).push_back(Delivered { payload, source });
        self.notify.notify_one();
    }

    /// Pop the oldest entry. Never blocks.
    pub fn try_pop(&self) -> Option<Delivered> {
        lock(&self.entries).pop_front()
    }

    /// Wait until an entry is available and pop it.
    pub async fn pop(&self) -> Delivered {
        loop {
            let notified = self.notify.notified();
            if let Some(entry) = self.try_pop() {
                return entry;
            }
            notified.await;
        }
    }

    /// Take everything currently queued.
    pub fn drain(&self) -> Vec<Delivered> {
        lock(&self.entries).drain(..).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
