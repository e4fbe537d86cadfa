//! Scheduling loop — drives `MessageRouter::service` on a fixed cadence.
//!
//! This task is the only caller of `service`, so ticks never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use weir_services::MessageRouter;

/// How often to log a throughput summary.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(10);

pub async fn scheduling_loop(
    router: Arc<MessageRouter>,
    tick_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let epoch = Instant::now();
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_summary = epoch;
    let mut sent_messages = 0usize;
    let mut sent_bytes = 0usize;
    let mut received = 0usize;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("scheduling loop shutting down");
                return;
            }

            _ = interval.tick() => {
                let report = router.service(epoch.elapsed());
                sent_messages += report.sent_messages;
                sent_bytes += report.sent_bytes;
                received += report.received;

                if last_summary.elapsed() >= SUMMARY_INTERVAL {
                    tracing::info!(
                        sent_messages,
                        sent_bytes,
                        received,
                        pending_bytes = router.pending_bytes(),
                        "scheduler summary"
                    );
                    last_summary = Instant::now();
                    sent_messages = 0;
                    sent_bytes = 0;
                    received = 0;
                }
            }
        }
    }
}
