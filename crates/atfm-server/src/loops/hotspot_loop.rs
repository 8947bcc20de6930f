//! Periodic hotspot refresh with backoff on backend failures.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::backoff::Backoff;
use crate::fetch;
use crate::state::AppState;

pub async fn run_hotspot_loop(state: Arc<AppState>) {
    let poll_s = state.config().hotspot_poll_s;
    if poll_s == 0 {
        tracing::info!("Hotspot polling disabled");
        return;
    }
    let period = Duration::from_secs(poll_s);
    let mut ticker = interval(period);
    let mut backoff = Backoff::new(period, period * 10);

    loop {
        ticker.tick().await;
        if !backoff.ready() {
            continue;
        }

        let ticket = state.session_mut().await.request_hotspots();
        match fetch::fetch_hotspots(&state, ticket).await {
            Ok(_) => backoff.reset(),
            Err(_) => {
                let delay = backoff.fail();
                tracing::warn!(
                    "Hotspot polling paused for {:?} after {} failure(s)",
                    delay,
                    backoff.failures()
                );
            }
        }
    }
}
