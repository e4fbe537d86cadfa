//! Weighted fair scheduler — self-clocked fair queuing over per-destination
//! backlogs with one shared byte-rate budget.
//!
//! Each tick:
//!   1. budget = rate × elapsed time since the previous tick
//!   2. effective weights are snapshotted (renormalized over the active set,
//!      or over every provisioned destination)
//!   3. the backlogged destination with the smallest virtual finish time is
//!      served, one whole message at a time, until the budget is spent or the
//!      next head message does not fit
//!
//! Ties in virtual finish time go to the lower NodeId. Messages are never
//! split; a head that does not fit ends the tick.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use weir_core::NodeId;

use crate::queue::{DestinationQueue, OutboundMessage, QueueCapacity};
use crate::SchedulerError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Point-in-time view of one destination queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub dest: NodeId,
    pub weight: f64,
    pub capacity: QueueCapacity,
    pub queued_messages: usize,
    pub queued_bytes: usize,
    pub virtual_finish: f64,
    pub released_messages: u64,
    pub released_bytes: u64,
    pub rejected_messages: u64,
}

#[derive(Debug)]
pub struct FairScheduler {
    rate_bytes_per_sec: u64,
    renormalize_weights: bool,
    /// Ordered by NodeId so iteration, and therefore tie-breaking, is stable.
    queues: BTreeMap<NodeId, DestinationQueue>,
    /// Largest start tag served so far. Never decreases.
    global_virtual_time: f64,
    last_tick: Duration,
    /// Budget held over from a tick that could not release anything.
    carried_budget: u64,
}

impl FairScheduler {
    pub fn new(rate_bytes_per_sec: u64, renormalize_weights: bool) -> Self {
        Self {
            rate_bytes_per_sec,
            renormalize_weights,
            queues: BTreeMap::new(),
            global_virtual_time: 0.0,
            last_tick: Duration::ZERO,
            carried_budget: 0,
        }
    }

    pub fn add_queue(
        &mut self,
        dest: NodeId,
        capacity: QueueCapacity,
        weight: f64,
    ) -> Result<(), SchedulerError> {
        validate_weight(weight)?;
        if self.queues.contains_key(&dest) {
            return Err(SchedulerError::DuplicateDestination(dest));
        }
        let mut queue = DestinationQueue::new(dest, capacity, weight);
        queue.virtual_finish = self.global_virtual_time;
        self.queues.insert(dest, queue);
        tracing::debug!(%dest, weight, %capacity, "destination queue added");
        Ok(())
    }

    /// Drop the queue and everything still in it. Returns the number of
    /// discarded messages.
    pub fn remove_queue(&mut self, dest: NodeId) -> Result<usize, SchedulerError> {
        let queue = self
            .queues
            .remove(&dest)
            .ok_or(SchedulerError::UnknownDestination(dest))?;
        let dropped = queue.len();
        if dropped > 0 {
            tracing::info!(%dest, dropped, bytes = queue.queued_bytes(), "queue removed with backlog");
        } else {
            tracing::debug!(%dest, "queue removed");
        }
        Ok(dropped)
    }

    /// Change a destination's weight. Applies from the next tick.
    pub fn set_weight(&mut self, dest: NodeId, weight: f64) -> Result<(), SchedulerError> {
        validate_weight(weight)?;
        let queue = self
            .queues
            .get_mut(&dest)
            .ok_or(SchedulerError::UnknownDestination(dest))?;
        queue.set_weight(weight);
        Ok(())
    }

    pub fn has_queue(&self, dest: NodeId) -> bool {
        self.queues.contains_key(&dest)
    }

    /// Route a message to its destination's queue. Queues are never created
    /// implicitly here.
    pub fn queue_message(&mut self, message: OutboundMessage) -> Result<(), SchedulerError> {
        let dest = message.dest;
        let global = self.global_virtual_time;
        let queue = self
            .queues
            .get_mut(&dest)
            .ok_or(SchedulerError::UnknownDestination(dest))?;
        let was_idle = queue.is_empty();
        queue.enqueue(message)?;
        if was_idle {
            // No credit for time spent idle.
            queue.virtual_finish = queue.virtual_finish.max(global);
        }
        Ok(())
    }

    /// Release the messages that fit in the budget accrued since the last tick.
    pub fn tick(&mut self, now: Duration) -> Vec<OutboundMessage> {
        let elapsed = now.saturating_sub(self.last_tick);
        self.last_tick = self.last_tick.max(now);

        let fresh = (self.rate_bytes_per_sec as u128 * elapsed.as_nanos() / NANOS_PER_SEC) as u64;
        let mut budget = fresh.saturating_add(std::mem::take(&mut self.carried_budget));

        let effective = self.effective_weights();
        if effective.is_empty() {
            return Vec::new();
        }

        let mut released = Vec::new();
        let mut stalled_on = None;

        while budget > 0 {
            let Some(dest) = self.next_destination(&effective) else {
                break;
            };
            let Some(queue) = self.queues.get_mut(&dest) else {
                break;
            };
            let Some(size) = queue.front().map(OutboundMessage::size) else {
                break;
            };
            if size as u64 > budget {
                stalled_on = Some(size as u64);
                break;
            }
            let Some(message) = queue.pop_front() else {
                break;
            };
            budget -= size as u64;
            let start = queue.virtual_finish;
            queue.virtual_finish += size as f64 / effective[&dest];
            queue.released_messages += 1;
            queue.released_bytes += size as u64;
            self.global_virtual_time = self.global_virtual_time.max(start);
            released.push(message);
        }

        if released.is_empty() {
            if let Some(needed) = stalled_on {
                self.carried_budget = budget.min(needed);
            }
        }

        released
    }

    /// Snapshot effective weights for every destination that is backlogged
    /// at the start of the tick.
    fn effective_weights(&self) -> BTreeMap<NodeId, f64> {
        let active: Vec<&DestinationQueue> =
            self.queues.values().filter(|q| !q.is_empty()).collect();
        let total: f64 = if self.renormalize_weights {
            active.iter().map(|q| q.weight()).sum()
        } else {
            self.queues.values().map(DestinationQueue::weight).sum()
        };
        active
            .into_iter()
            .map(|q| (q.dest(), q.weight() / total))
            .collect()
    }

    /// Backlogged destination with the smallest finish time, lowest ID on ties.
    fn next_destination(&self, effective: &BTreeMap<NodeId, f64>) -> Option<NodeId> {
        effective
            .keys()
            .filter_map(|dest| self.queues.get(dest))
            .filter(|q| !q.is_empty())
            .min_by(|a, b| {
                a.virtual_finish
                    .total_cmp(&b.virtual_finish)
                    .then_with(|| a.dest().cmp(&b.dest()))
            })
            .map(DestinationQueue::dest)
    }

    pub fn global_virtual_time(&self) -> f64 {
        self.global_virtual_time
    }

    pub fn rate_bytes_per_sec(&self) -> u64 {
        self.rate_bytes_per_sec
    }

    pub fn renormalize_weights(&self) -> bool {
        self.renormalize_weights
    }

    /// Total bytes waiting across every destination.
    pub fn pending_bytes(&self) -> usize {
        self.queues.values().map(DestinationQueue::queued_bytes).sum()
    }

    pub fn stats(&self) -> Vec<QueueStats> {
        self.queues
            .values()
            .map(|q| QueueStats {
                dest: q.dest(),
                weight: q.weight(),
                capacity: q.capacity(),
                queued_messages: q.len(),
                queued_bytes: q.queued_bytes(),
                virtual_finish: q.virtual_finish,
                released_messages: q.released_messages,
                released_bytes: q.released_bytes,
                rejected_messages: q.rejected_messages(),
            })
            .collect()
    }
}

fn validate_weight(weight: f64) -> Result<(), SchedulerError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(SchedulerError::InvalidWeight(weight))
    }
}
