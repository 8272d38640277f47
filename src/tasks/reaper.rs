use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::core::state::AppState;

/// Periodic backstop for the per-session timers: force-submits sessions past
/// their deadline and evicts finished sessions after their TTL.
pub(crate) async fn run(state: AppState) {
    let interval_seconds = state.settings().session().reap_interval_seconds.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_seconds, "session reaper started");

    loop {
        ticker.tick().await;
        state.sessions().sweep().await;
    }
}
