//! The single simulation tick loop.
//!
//! Advances the session clock by wall-clock elapsed time on every tick. When
//! the clock crosses an occupancy bin the ranked arrivals are re-requested,
//! since they are anchored at the current time.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::{interval, MissedTickBehavior};

use crate::fetch;
use crate::state::AppState;

pub async fn run_tick_loop(state: Arc<AppState>) {
    let mut ticker = interval(state.config().tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let elapsed_ms = now.duration_since(last).as_secs_f64() * 1000.0;
        last = now;

        let refresh = {
            let mut session = state.session_mut().await;
            let bin_before = session.arrival_bin();
            let update = session.tick(elapsed_ms);
            if update.time_moved && session.arrival_bin() != bin_before {
                session.refresh_arrivals()
            } else {
                None
            }
        };

        if let Some(ticket) = refresh {
            fetch::dispatch(state.clone(), vec![ticket]);
        }
    }
}
