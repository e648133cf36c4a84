use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::AppState;

/// Periodically evict gateway sessions idle longer than the configured limit.
pub fn spawn_session_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let max_idle = Duration::from_secs(state.config.server.session_idle_secs);
    let period = Duration::from_secs(state.config.server.session_sweep_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = state.sessions.evict_idle(max_idle).await;
            if evicted.is_empty() {
                debug!("Session sweep: nothing idle");
            } else {
                let live = state.sessions.len().await;
                info!(count = evicted.len(), live, "Session sweep evicted idle sessions");
            }
        }
    })
}
