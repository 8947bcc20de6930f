//! Core data models for the ATFM engine.
//!
//! Backend payloads keep the analytics service's snake_case field names so
//! they deserialize directly.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::time::{self, TimeBin, SECONDS_PER_DAY};

/// Set of canonical flight identifiers, ordered for stable output.
pub type FlightIdSet = BTreeSet<String>;

/// One row of source segment data for a flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSegment {
    #[serde(default)]
    pub segment_identifier: String,
    pub flight_identifier: String,
    #[serde(default)]
    pub call_sign: String,
    #[serde(default)]
    pub origin_aerodrome: String,
    #[serde(default)]
    pub destination_aerodrome: String,
    /// Compact `HMMSS` time, given either as a number or a string
    #[serde(deserialize_with = "compact_time")]
    pub time_begin_segment: String,
    #[serde(deserialize_with = "compact_time")]
    pub time_end_segment: String,
    pub latitude_begin: f64,
    pub longitude_begin: f64,
    pub latitude_end: f64,
    pub longitude_end: f64,
    #[serde(default)]
    pub flight_level_begin: f64,
    #[serde(default)]
    pub flight_level_end: f64,
    #[serde(default)]
    pub sequence: i64,
}

fn compact_time<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// Interpolated aircraft state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftPosition {
    pub flight_id: String,
    pub lon: f64,
    pub lat: f64,
    pub altitude_ft: Option<f64>,
    pub heading_deg: f64,
}

/// Sector metadata loaded alongside the flights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorInfo {
    pub traffic_volume_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub min_fl: u32,
    #[serde(default = "default_max_fl")]
    pub max_fl: u32,
}

fn default_max_fl() -> u32 {
    999
}

/// Occupancy counts and hourly capacity for one traffic volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    #[serde(default)]
    pub traffic_volume_id: String,
    #[serde(default)]
    pub occupancy_counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub hourly_capacity: BTreeMap<String, f64>,
    #[serde(default)]
    pub metadata: OccupancyMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OccupancyMetadata {
    #[serde(default)]
    pub time_bin_minutes: Option<f64>,
    #[serde(default)]
    pub total_time_windows: Option<u32>,
    #[serde(default)]
    pub total_flights_in_tv: Option<u32>,
}

/// A capacity overload reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub traffic_volume_id: String,
    pub time_bin: String,
    #[serde(default)]
    pub z_max: f64,
    #[serde(default)]
    pub z_sum: f64,
    #[serde(default)]
    pub hourly_occupancy: f64,
    #[serde(default)]
    pub hourly_capacity: f64,
    #[serde(default)]
    pub is_overloaded: bool,
}

impl Hotspot {
    pub fn bin(&self) -> Option<TimeBin> {
        TimeBin::parse(&self.time_bin)
    }

    /// Whether the hotspot's time bin covers `t`. Malformed bins never do.
    pub fn is_active_at(&self, t: f64) -> bool {
        self.bin().is_some_and(|bin| bin.contains(t))
    }
}

/// Per-flight detail from the ordered arrivals endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalDetail {
    pub flight_id: String,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub arrival_seconds: Option<f64>,
    #[serde(default)]
    pub delta_seconds: Option<f64>,
    #[serde(default)]
    pub time_window: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub component_scores: Option<HashMap<String, f64>>,
}

/// A flight entry from the ranking endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedFlight {
    pub flight_id: String,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub time_window: Option<String>,
    #[serde(default)]
    pub delta_seconds: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub components: Option<HashMap<String, f64>>,
}

impl RankedFlight {
    pub fn arrival_seconds(&self) -> Option<f64> {
        self.arrival_time
            .as_deref()
            .and_then(time::parse_clock)
            .map(f64::from)
    }
}

/// Response of the ordered/ranked arrivals endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankedArrivals {
    #[serde(default)]
    pub traffic_volume_id: String,
    #[serde(default)]
    pub ref_time_str: Option<String>,
    #[serde(default)]
    pub ordered_flights: Vec<String>,
    #[serde(default)]
    pub details: Vec<ArrivalDetail>,
    #[serde(default)]
    pub ranked_flights: Vec<RankedFlight>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Query parameters for the ranked arrivals endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingQuery {
    pub traffic_volume_id: String,
    /// Compact `HHMMSS`
    pub ref_time_str: String,
    #[serde(default)]
    pub seed_flight_ids: Vec<String>,
    #[serde(default)]
    pub duration_min: Option<u32>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlackSign {
    #[default]
    Minus,
    Plus,
}

impl SlackSign {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minus => "minus",
            Self::Plus => "plus",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackEntry {
    pub traffic_volume_id: String,
    #[serde(default)]
    pub time_window: String,
    #[serde(default)]
    pub slack: f64,
    #[serde(default)]
    pub occupancy: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackDistribution {
    #[serde(default)]
    pub results: Vec<SlackEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowQuery {
    pub traffic_volume_id: String,
    pub ref_time_str: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub resolution: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub flight_ids: Vec<String>,
}

/// Flow communities: flight -> community and community -> flights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowExtraction {
    #[serde(default)]
    pub communities: HashMap<String, i64>,
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,
}

/// A committed regulation in the session plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    pub id: String,
    pub traffic_volume: String,
    pub active_window: ActiveWindow,
    /// Display tokens (callsign when known, else flight id) frozen at commit
    pub flight_tokens: Vec<String>,
    /// Flights per hour
    pub rate: f64,
    pub created_at: DateTime<Utc>,
}

/// Fields a caller supplies to create or replace a regulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationDraft {
    pub traffic_volume: String,
    pub active_window: ActiveWindow,
    pub target_flight_ids: Vec<String>,
    pub rate: f64,
}

/// Closed time window `[from, to]` in seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub from: f64,
    pub to: f64,
}

impl ActiveWindow {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Window starting at `floor(t)` and lasting `duration_s`.
    pub fn anchored(t: f64, duration_s: u32) -> Self {
        let from = t.floor();
        Self {
            from,
            to: from + f64::from(duration_s),
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.from && t <= self.to
    }

    pub fn duration_s(&self) -> f64 {
        self.to - self.from
    }

    /// Finite, ordered and no longer than one day.
    pub fn validate(&self) -> CoreResult<()> {
        let ok = self.from.is_finite()
            && self.to.is_finite()
            && self.to >= self.from
            && self.duration_s() <= f64::from(SECONDS_PER_DAY);
        if ok {
            Ok(())
        } else {
            Err(CoreError::InvalidWindow {
                from: self.from,
                to: self.to,
            })
        }
    }
}

/// One regulation as sent to the plan simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationSpec {
    pub location: String,
    pub rate: f64,
    pub time_windows: Vec<u32>,
    pub target_flight_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.0,
            gamma: 0.0,
            delta: 0.0,
        }
    }
}

/// Payload of the regulation plan simulation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub regulations: Vec<RegulationSpec>,
    #[serde(default)]
    pub weights: ObjectiveWeights,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelayStats {
    #[serde(default)]
    pub total_delay_seconds: f64,
    #[serde(default)]
    pub mean_delay_seconds: f64,
    #[serde(default)]
    pub max_delay_seconds: f64,
    #[serde(default)]
    pub min_delay_seconds: f64,
    #[serde(default)]
    pub delayed_flights_count: u32,
    #[serde(default)]
    pub num_flights: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollingTrafficVolume {
    pub traffic_volume_id: String,
    #[serde(default)]
    pub pre_rolling_counts: Vec<f64>,
    #[serde(default)]
    pub post_rolling_counts: Vec<f64>,
    #[serde(default)]
    pub capacity_per_bin: Vec<f64>,
}

impl RollingTrafficVolume {
    /// Post minus pre per bin, over the common length.
    pub fn diff(&self) -> Vec<f64> {
        self.pre_rolling_counts
            .iter()
            .zip(&self.post_rolling_counts)
            .map(|(pre, post)| post - pre)
            .collect()
    }
}

/// Result of the regulation plan simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(default)]
    pub delays_by_flight: HashMap<String, f64>,
    #[serde(default)]
    pub delay_stats: DelayStats,
    #[serde(default)]
    pub objective: Option<f64>,
    #[serde(default)]
    pub objective_components: HashMap<String, f64>,
    #[serde(default)]
    pub rolling_top_tvs: Vec<RollingTrafficVolume>,
}
