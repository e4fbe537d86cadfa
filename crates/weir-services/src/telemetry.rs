//! Telemetry capability — observes every unit the router hands to the
//! transport. Purely observational.

use std::sync::Mutex;
use std::time::Duration;

use weir_core::NodeId;

use crate::lock;

pub trait Telemetry: Send + Sync {
    fn record_sent(&self, at: Duration, dest: NodeId, message_id: u64, size: usize);
}

/// Emits each send as a `tracing` event on the `weir::telemetry` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record_sent(&self, at: Duration, dest: NodeId, message_id: u64, size: usize) {
        tracing::trace!(
            target: "weir::telemetry",
            ?at,
            %dest,
            message_id,
            size,
            "message sent"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentRecord {
    pub at: Duration,
    pub dest: NodeId,
    pub message_id: u64,
    pub size: usize,
}

/// Keeps every send in memory, in order.
#[derive(Debug, Default)]
pub struct SentLog {
    records: Mutex<Vec<SentRecord>>,
}

impl SentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SentRecord> {
        lock(&self.records).clone()
    }

    pub fn total_bytes(&self, dest: NodeId) -> usize {
        lock(&self.records)
            .iter()
            .filter(|r| r.dest == dest)
            .map(|r| r.size)
            .sum()
    }
}

impl Telemetry for SentLog {
    fn record_sent(&self, at: Duration, dest: NodeId, message_id: u64, size: usize) {
        lock(&self.records).push(SentRecord {
            at,
            dest,
            message_id,
            size,
        });
    }
}
