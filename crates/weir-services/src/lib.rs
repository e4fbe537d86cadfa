//! weir-services — the outbound fairness engine and the router facade
//! that connects it to a transport.

pub mod error;
pub mod inbound;
pub mod queue;
pub mod router;
pub mod scheduler;
pub mod telemetry;
pub mod transport;

pub use error::SchedulerError;
pub use inbound::{Delivered, InboundQueue};
pub use queue::{DestinationQueue, OutboundMessage, QueueCapacity};
pub use router::{MessageRouter, RouterConfig, RouterStats, ServiceReport};
pub use scheduler::{FairScheduler, QueueStats};
pub use telemetry::{SentLog, SentRecord, Telemetry, TracingTelemetry};
pub use transport::{MemoryNetwork, MemoryTransport, Transport};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every structure guarded this way is left consistent between statements,
/// so the scheduling loop keeps running after a producer thread dies.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
