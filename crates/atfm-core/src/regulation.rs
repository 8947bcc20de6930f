//! The session's regulation plan.
//!
//! Regulations store display tokens frozen at commit time. Exporting the plan
//! resolves those tokens back to flight ids against the loaded flight set.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActiveWindow, ObjectiveWeights, Regulation, RegulationDraft, RegulationSpec, SimulationRequest,
};
use crate::trajectory::FlightSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegulationPlan {
    regulations: Vec<Regulation>,
}

impl RegulationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regulations(&self) -> &[Regulation] {
        &self.regulations
    }

    pub fn len(&self) -> usize {
        self.regulations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regulations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Regulation> {
        self.regulations.iter().find(|r| r.id == id)
    }

    /// Commit a regulation, snapshotting its targets as display tokens.
    pub fn add(&mut self, draft: RegulationDraft, flights: &FlightSet) -> CoreResult<String> {
        if draft.traffic_volume.trim().is_empty() {
            return Err(CoreError::NoTrafficVolume);
        }
        draft.active_window.validate()?;

        let mut tokens: Vec<String> = Vec::with_capacity(draft.target_flight_ids.len());
        for id in &draft.target_flight_ids {
            let token = flights.display_token(id);
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        if tokens.is_empty() {
            return Err(CoreError::NoTargetFlights);
        }

        let regulation = Regulation {
            id: Uuid::new_v4().to_string(),
            traffic_volume: draft.traffic_volume,
            active_window: draft.active_window,
            flight_tokens: tokens,
            rate: draft.rate,
            created_at: Utc::now(),
        };
        let id = regulation.id.clone();
        info!(
            "Regulation {} added on {} for {} flights at {}/h",
            id,
            regulation.traffic_volume,
            regulation.flight_tokens.len(),
            regulation.rate
        );
        self.regulations.push(regulation);
        Ok(id)
    }

    pub fn remove(&mut self, id: &str) -> CoreResult<Regulation> {
        let idx = self
            .regulations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CoreError::UnknownRegulation(id.to_string()))?;
        let removed = self.regulations.remove(idx);
        info!("Regulation {} removed", id);
        Ok(removed)
    }

    /// Replace a regulation. The replacement gets a new id and timestamp.
    pub fn edit(
        &mut self,
        id: &str,
        draft: RegulationDraft,
        flights: &FlightSet,
    ) -> CoreResult<String> {
        let idx = self
            .regulations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CoreError::UnknownRegulation(id.to_string()))?;
        let previous = self.remove(id)?;
        match self.add(draft, flights) {
            Ok(new_id) => Ok(new_id),
            Err(e) => {
                self.regulations.insert(idx, previous);
                Err(e)
            }
        }
    }

    /// Take a regulation out of the plan and return its fields for editing.
    pub fn begin_edit(&mut self, id: &str, flights: &FlightSet) -> CoreResult<RegulationDraft> {
        let removed = self.remove(id)?;
        Ok(RegulationDraft {
            traffic_volume: removed.traffic_volume,
            active_window: removed.active_window,
            target_flight_ids: removed
                .flight_tokens
                .iter()
                .map(|t| resolve_token(t, flights))
                .collect(),
            rate: removed.rate,
        })
    }

    /// Build the plan simulation payload.
    pub fn to_simulation_request(
        &self,
        flights: &FlightSet,
        bin_minutes: f64,
        weights: ObjectiveWeights,
        top_k: Option<usize>,
    ) -> CoreResult<SimulationRequest> {
        if self.regulations.is_empty() {
            return Err(CoreError::EmptyPlan);
        }
        let regulations = self
            .regulations
            .iter()
            .map(|r| {
                Ok(RegulationSpec {
                    location: r.traffic_volume.clone(),
                    rate: r.rate,
                    time_windows: time_window_bins(r.active_window, bin_minutes)?,
                    target_flight_ids: r
                        .flight_tokens
                        .iter()
                        .map(|t| resolve_token(t, flights))
                        .collect(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(SimulationRequest {
            regulations,
            weights,
            top_k,
        })
    }
}

/// Resolve a display token to a flight id. Unknown tokens pass through.
pub fn resolve_token(token: &str, flights: &FlightSet) -> String {
    match flights.find_by_token(token) {
        Some(t) => t.flight_id.clone(),
        None => {
            warn!("Flight token '{}' did not resolve; sending as-is", token);
            token.to_string()
        }
    }
}

/// Indices of the bins covered by `window`: `floor(from/bin) ..= ceil(to/bin) - 1`.
///
/// Always yields at least one bin. Windows longer than a day are rejected.
pub fn time_window_bins(window: ActiveWindow, bin_minutes: f64) -> CoreResult<Vec<u32>> {
    if !bin_minutes.is_finite() || bin_minutes <= 0.0 {
        return Err(CoreError::InvalidBinWidth(bin_minutes));
    }
    window.validate()?;
    let bin_s = bin_minutes * 60.0;
    let first = (window.from.max(0.0) / bin_s).floor() as u32;
    let last = ((window.to.max(0.0) / bin_s).ceil() as u32).saturating_sub(1);
    Ok((first..=last.max(first)).collect())
}
