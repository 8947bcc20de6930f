//! Backend fetches feeding the session.
//!
//! Every fetch carries the ticket the session issued for it. The session
//! lock is released while the request is in flight and taken again only to
//! apply the response, which the session drops if a newer ticket exists.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use atfm_backend::AnalyticsClient;
use atfm_core::{ArrivalSource, FetchKind, Hotspot, SimulationRequest, SimulationResult, Ticket};
use tracing::{debug, error, warn};

use crate::state::AppState;

/// Spawn one fetch per ticket.
pub fn dispatch(state: Arc<AppState>, tickets: Vec<Ticket>) {
    for ticket in tickets {
        let state = state.clone();
        tokio::spawn(async move {
            run(&state, ticket).await;
        });
    }
}

/// Run the fetch for `ticket` and apply its result. Returns whether the
/// session accepted it; a failed hotspot fetch counts as not accepted.
pub async fn run(state: &AppState, ticket: Ticket) -> bool {
    match ticket.kind {
        FetchKind::Occupancy => fetch_occupancy(state, ticket).await,
        FetchKind::Arrivals => fetch_arrivals(state, ticket).await,
        FetchKind::Hotspots => fetch_hotspots(state, ticket).await.unwrap_or(false),
        FetchKind::Simulation => {
            warn!("Simulation tickets are run by the plan endpoint");
            false
        }
    }
}

pub async fn fetch_occupancy(state: &AppState, ticket: Ticket) -> bool {
    let result = match state.cached_occupancy(&ticket.key) {
        Some(snapshot) => {
            debug!("Occupancy for {} served from cache", ticket.key);
            Ok(snapshot)
        }
        None => match state.client().occupancy(&ticket.key).await {
            Ok(snapshot) => {
                state.store_occupancy(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                error!("Occupancy fetch for {} failed: {:#}", ticket.key, e);
                Err(e.to_string())
            }
        },
    };
    state.session_mut().await.apply_occupancy(&ticket, result)
}

/// Ranked arrivals at the ticket's traffic volume, falling back to the
/// plain time-window listing when the ranking is unavailable.
pub async fn fetch_arrivals(state: &AppState, ticket: Ticket) -> bool {
    let query = state
        .session()
        .await
        .ranking_query()
        .filter(|q| q.traffic_volume_id == ticket.key);
    let Some(query) = query else {
        debug!("Arrivals for {} no longer selected", ticket.key);
        return false;
    };

    let result = match state.client().ranked_arrivals(&query).await {
        Ok(ranked) => Ok(ArrivalSource::from_ranked(&ranked)),
        Err(e) => {
            warn!(
                "Ranked arrivals for {} failed, using time windows: {:#}",
                ticket.key, e
            );
            match state.client().tv_flights(&ticket.key).await {
                Ok(windows) => Ok(ArrivalSource::TimeWindows(windows)),
                Err(e) => {
                    error!("Arrivals fetch for {} failed: {:#}", ticket.key, e);
                    Err(e.to_string())
                }
            }
        }
    };
    state.session_mut().await.apply_arrivals(&ticket, result)
}

/// Errors when the backend call failed; the failure is still applied to
/// the session so callers can tell it apart from missing data.
pub async fn fetch_hotspots(state: &AppState, ticket: Ticket) -> Result<bool> {
    let threshold = state.config().hotspot_threshold;
    match state.client().hotspots(threshold).await {
        Ok(response) => Ok(apply_hotspots(state, &ticket, Ok(response.hotspots)).await),
        Err(e) => {
            error!("Hotspot fetch failed: {:#}", e);
            apply_hotspots(state, &ticket, Err(e.to_string())).await;
            Err(e)
        }
    }
}

async fn apply_hotspots(
    state: &AppState,
    ticket: &Ticket,
    result: std::result::Result<Vec<Hotspot>, String>,
) -> bool {
    state.session_mut().await.apply_hotspots(ticket, result)
}

/// Submit a simulation request and record its outcome on the session.
pub async fn simulate_plan(
    state: &AppState,
    client: &AnalyticsClient,
    request: &SimulationRequest,
) -> Result<SimulationResult> {
    let ticket = state.session_mut().await.begin_simulation();
    let result = client.simulate_plan(request).await;
    let mut session = state.session_mut().await;
    match result {
        Ok(outcome) => {
            if !session.apply_simulation(&ticket, Ok(outcome.clone())) {
                return Err(anyhow!("Simulation superseded by a newer request"));
            }
            Ok(outcome)
        }
        Err(e) => {
            error!("Plan simulation failed: {:#}", e);
            session.apply_simulation(&ticket, Err(e.to_string()));
            Err(e)
        }
    }
}
