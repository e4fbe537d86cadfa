//! Per-destination backlog — a bounded FIFO of framed messages for one peer.
//!
//! Queues are owned by the [`FairScheduler`](crate::FairScheduler). Nothing
//! outside the scheduler touches the backlog or the virtual finish time.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use weir_core::NodeId;

use crate::SchedulerError;

/// How much a destination queue may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "limit", rename_all = "lowercase")]
pub enum QueueCapacity {
    /// Total bytes of queued messages.
    Bytes(usize),
    /// Number of queued messages, regardless of size.
    Messages(usize),
}

impl fmt::Display for QueueCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueCapacity::Bytes(n) => write!(f, "{n} bytes"),
            QueueCapacity::Messages(n) => write!(f, "{n} messages"),
        }
    }
}

/// A framed message waiting for, or released by, the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Assigned by the router at enqueue time, strictly increasing.
    pub id: u64,
    pub dest: NodeId,
    /// Header and payload, exactly as they go on the wire.
    pub data: Bytes,
}

impl OutboundMessage {
    pub fn new(id: u64, dest: NodeId, data: Bytes) -> Self {
        Self { id, dest, data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug)]
pub struct DestinationQueue {
    dest: NodeId,
    weight: f64,
    capacity: QueueCapacity,
    backlog: VecDeque<OutboundMessage>,
    queued_bytes: usize,
    /// Finish tag of the last message served from this queue.
    pub(crate) virtual_finish: f64,
    pub(crate) released_messages: u64,
    pub(crate) released_bytes: u64,
    rejected_messages: u64,
}

impl DestinationQueue {
    pub fn new(dest: NodeId, capacity: QueueCapacity, weight: f64) -> Self {
        Self {
            dest,
            weight,
            capacity,
            backlog: VecDeque::new(),
            queued_bytes: 0,
            virtual_finish: 0.0,
            released_messages: 0,
            released_bytes: 0,
            rejected_messages: 0,
        }
    }

    /// Append `message` unless it would push the backlog past capacity.
    ///
    /// A rejected message is dropped; retrying is the caller's decision.
    pub fn enqueue(&mut self, message: OutboundMessage) -> Result<(), SchedulerError> {
        let fits = match self.capacity {
            QueueCapacity::Bytes(limit) => self.queued_bytes + message.size() <= limit,
            QueueCapacity::Messages(limit) => self.backlog.len() < limit,
        };
        if !fits {
            self.rejected_messages += 1;
            return Err(SchedulerError::QueueFull {
                dest: self.dest,
                size: message.size(),
                capacity: self.capacity,
            });
        }
        self.queued_bytes += message.size();
        self.backlog.push_back(message);
        Ok(())
    }

    pub fn front(&self) -> Option<&OutboundMessage> {
        self.backlog.front()
    }

    pub fn pop_front(&mut self) -> Option<OutboundMessage> {
        let message = self.backlog.pop_front()?;
        self.queued_bytes -= message.size();
        Some(message)
    }

    pub fn is_empty(&self) -> bool {
        self.backlog.is_empty()
    }

    pub fn len(&self) -> usize {
        self.backlog.len()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    pub fn dest(&self) -> NodeId {
        self.dest
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn capacity(&self) -> QueueCapacity {
        self.capacity
    }

    pub fn rejected_messages(&self) -> u64 {
        self.rejected_messages
    }
}
