//! Background expiry of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::deployment::Registry;

/// Shortest accepted sweep period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn a task that sweeps expired sessions of every deployment each
/// `interval`.
///
/// Expiry is also enforced on access, so the sweep only reclaims memory
/// held by sessions whose clients never come back. Abort the returned
/// handle to stop sweeping.
pub fn spawn_sweeper(registry: Arc<Registry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match registry.sweep_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "expired sessions reclaimed"),
                Err(err) => tracing::warn!(error = %err, "session sweep failed"),
            }
        }
    })
}
