//! Stale-entry sweep.
//!
//! Registered identities that have not sent a frame within the threshold
//! are removed from the registry and their connections are closed.

use std::time::Duration;

use anyhow::Result;

use crate::registry::ClientRegistry;

/// One sweep: evict and close everything idle for longer than `threshold`.
/// Returns the number of entries removed.
pub fn sweep(registry: &ClientRegistry, threshold: Duration) -> usize {
    let evicted = registry.evict_stale_older_than(threshold);
    for (identity, handle) in &evicted {
        handle.close();
        tracing::info!(identity = %identity, conn = %handle.id(), "evicted idle client");
    }
    if !evicted.is_empty() {
        tracing::debug!(
            removed = evicted.len(),
            remaining = registry.len(),
            "expired registry entries"
        );
    }
    evicted.len()
}

/// Sweep the registry every `check_interval`.
///
/// Runs forever; cancel by dropping the task handle.
pub async fn expiry_loop(
    registry: ClientRegistry,
    check_interval: Duration,
    threshold: Duration,
) -> Result<()> {
    let mut interval = tokio::time::interval(check_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        sweep(&registry, threshold);
    }
}
