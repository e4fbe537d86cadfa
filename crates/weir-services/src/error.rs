//! Scheduler error types.

use weir_core::NodeId;

/// Errors returned by queue and scheduler operations.
///
/// Every variant is local to one destination. None of them stop the
/// scheduler from serving the others.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// The destination's backlog cannot take the message. Transient.
    #[error("queue for {dest} is full: {size} byte message, capacity {capacity}")]
    QueueFull {
        dest: NodeId,
        size: usize,
        capacity: crate::QueueCapacity,
    },

    /// No queue has been provisioned for the destination.
    #[error("unknown destination {0}")]
    UnknownDestination(NodeId),

    /// A queue already exists for the destination.
    #[error("destination {0} already has a queue")]
    DuplicateDestination(NodeId),

    /// Weights must be finite and strictly positive.
    #[error("invalid weight {0}, must be finite and > 0")]
    InvalidWeight(f64),
}
