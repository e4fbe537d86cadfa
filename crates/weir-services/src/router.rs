//! Message router — the service facade in front of the fair scheduler.
//!
//! Outbound: frame with (self, dest), queue on the destination's backlog,
//! release on `service`, hand to the transport in release order.
//! Inbound: drain the transport, check and strip the frame header, queue
//! the payload for `receive`.
//!
//! Producers (`add_message`, weight changes, removal) may run on any thread.
//! They share one lock with the scheduling tick. Transport sends happen
//! after that lock is released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use weir_core::config::WeirConfig;
use weir_core::{deframe, frame, NodeId, WireError};

use crate::inbound::{Delivered, InboundQueue};
use crate::queue::{OutboundMessage, QueueCapacity};
use crate::scheduler::{FairScheduler, QueueStats};
use crate::telemetry::Telemetry;
use crate::transport::Transport;
use crate::{lock, SchedulerError};

/// Construction-time settings for a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    pub self_node: NodeId,
    pub rate_bytes_per_sec: u64,
    pub renormalize_weights: bool,
    pub default_queue_capacity_bytes: usize,
}

impl From<&WeirConfig> for RouterConfig {
    fn from(config: &WeirConfig) -> Self {
        Self {
            self_node: config.node.id,
            rate_bytes_per_sec: config.scheduler.rate_bytes_per_sec,
            renormalize_weights: config.scheduler.renormalize_weights,
            default_queue_capacity_bytes: config.scheduler.default_queue_capacity_bytes,
        }
    }
}

/// What one `service` pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceReport {
    pub sent_messages: usize,
    pub sent_bytes: usize,
    pub received: usize,
    pub dropped_inbound: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterStats {
    pub node: NodeId,
    pub rate_bytes_per_sec: u64,
    pub renormalize_weights: bool,
    pub pending_bytes: usize,
    pub loopback_messages: u64,
    pub delivered_messages: u64,
    pub malformed_frames: u64,
    pub misrouted_frames: u64,
    pub inbound_waiting: usize,
    pub destinations: Vec<QueueStats>,
}

#[derive(Debug, Default)]
struct Counters {
    loopback: AtomicU64,
    delivered: AtomicU64,
    malformed: AtomicU64,
    misrouted: AtomicU64,
}

pub struct MessageRouter {
    config: RouterConfig,
    scheduler: Mutex<FairScheduler>,
    inbound: InboundQueue,
    transport: Arc<dyn Transport>,
    telemetry: Arc<dyn Telemetry>,
    next_message_id: AtomicU64,
    /// Held for the whole of `service` so passes never overlap.
    servicing: Mutex<()>,
    counters: Counters,
}

impl MessageRouter {
    pub fn new(
        config: RouterConfig,
        transport: Arc<dyn Transport>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            config,
            scheduler: Mutex::new(FairScheduler::new(
                config.rate_bytes_per_sec,
                config.renormalize_weights,
            )),
            inbound: InboundQueue::new(),
            transport,
            telemetry,
            next_message_id: AtomicU64::new(0),
            servicing: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.config.self_node
    }

    /// Queue `payload` for `dest`. Returns false on backpressure or when
    /// `dest` has not been provisioned; nothing is retried.
    pub fn add_message(&self, dest: NodeId, payload: &[u8]) -> bool {
        match self.try_add_message(dest, payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(%dest, size = payload.len(), error = %e, "message rejected");
                false
            }
        }
    }

    /// Like [`add_message`](Self::add_message) but says why a message was
    /// rejected.
    pub fn try_add_message(&self, dest: NodeId, payload: &[u8]) -> Result<(), SchedulerError> {
        let local = self.config.self_node;
        if dest == local {
            self.inbound.push(Bytes::copy_from_slice(payload), local);
            self.counters.loopback.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let message = OutboundMessage::new(id, dest, frame(local, dest, payload));
        lock(&self.scheduler).queue_message(message)
    }

    /// One scheduling pass: tick, send what was released, drain inbound.
    ///
    /// `now` is measured from the router's epoch; the scheduler derives the
    /// elapsed time from the previous pass.
    pub fn service(&self, now: Duration) -> ServiceReport {
        let _pass = lock(&self.servicing);
        let mut report = ServiceReport::default();

        let released = lock(&self.scheduler).tick(now);
        for message in released {
            let size = message.size();
            tracing::trace!(dest = %message.dest, id = message.id, size, "releasing message");
            self.transport.send(message.dest, message.data);
            self.telemetry.record_sent(now, message.dest, message.id, size);
            report.sent_messages += 1;
            report.sent_bytes += size;
        }

        while let Some(unit) = self.transport.poll_next() {
            match self.accept_inbound(unit) {
                Ok(()) => report.received += 1,
                Err(_) => report.dropped_inbound += 1,
            }
        }

        report
    }

    fn accept_inbound(&self, unit: Bytes) -> Result<(), WireError> {
        let local = self.config.self_node;
        let (header, offset) = deframe(&unit).inspect_err(|e| {
            self.counters.malformed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "dropping undecodable inbound unit");
        })?;
        header.expect_dest(local).inspect_err(|e| {
            self.counters.misrouted.fetch_add(1, Ordering::Relaxed);
            tracing::error!(source = %header.source(), error = %e, "inbound frame misrouted, dropping");
        })?;

        self.inbound.push(unit.slice(offset..), header.source());
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Oldest delivered payload with its source, or `None`. Never blocks.
    pub fn receive(&self) -> Option<Delivered> {
        self.inbound.try_pop()
    }

    /// Wait for the next delivered payload.
    pub async fn recv(&self) -> Delivered {
        self.inbound.pop().await
    }

    /// Take every delivered payload currently waiting.
    pub fn receive_all(&self) -> Vec<Delivered> {
        self.inbound.drain()
    }

    /// Provision `dest` with the default capacity, or reweight it if it
    /// already has a queue. The only way a destination becomes schedulable.
    pub fn set_server_weight(&self, dest: NodeId, weight: f64) -> Result<(), SchedulerError> {
        let mut scheduler = lock(&self.scheduler);
        if scheduler.has_queue(dest) {
            scheduler.set_weight(dest, weight)
        } else {
            let capacity = QueueCapacity::Bytes(self.config.default_queue_capacity_bytes);
            scheduler.add_queue(dest, capacity, weight)
        }
    }

    /// Forget `dest`, discarding whatever is still queued for it. Units
    /// already handed to the transport are not recalled.
    pub fn remove_server(&self, dest: NodeId) -> Result<usize, SchedulerError> {
        lock(&self.scheduler).remove_queue(dest)
    }

    pub fn has_destination(&self, dest: NodeId) -> bool {
        lock(&self.scheduler).has_queue(dest)
    }

    pub fn pending_bytes(&self) -> usize {
        lock(&self.scheduler).pending_bytes()
    }

    pub fn stats(&self) -> RouterStats {
        let scheduler = lock(&self.scheduler);
        RouterStats {
            node: self.config.self_node,
            rate_bytes_per_sec: scheduler.rate_bytes_per_sec(),
            renormalize_weights: scheduler.renormalize_weights(),
            pending_bytes: scheduler.pending_bytes(),
            loopback_messages: self.counters.loopback.load(Ordering::Relaxed),
            delivered_messages: self.counters.delivered.load(Ordering::Relaxed),
            malformed_frames: self.counters.malformed.load(Ordering::Relaxed),
            misrouted_frames: self.counters.misrouted.load(Ordering::Relaxed),
            inbound_waiting: self.inbound.len(),
            destinations: scheduler.stats(),
        }
    }
}
