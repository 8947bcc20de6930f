//! Piecewise-linear trajectories and position interpolation.
//!
//! A trajectory is a time-ordered list of samples. Positions between samples
//! are interpolated linearly; the heading is the great-circle bearing of the
//! segment being flown and does not vary within a segment.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{AircraftPosition, FlightIdSet, FlightSegment};
use crate::spatial::bearing_deg;
use crate::time::parse_compact_hms;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub lon: f64,
    pub lat: f64,
    pub altitude_ft: Option<f64>,
    /// Seconds since midnight
    pub time_s: f64,
}

impl TrajectorySample {
    fn is_finite(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && self.time_s.is_finite()
            && self.altitude_ft.map_or(true, f64::is_finite)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub flight_id: String,
    #[serde(default)]
    pub call_sign: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    samples: Vec<TrajectorySample>,
}

impl Trajectory {
    /// Build a trajectory, dropping non-finite samples and ordering by time.
    pub fn new(flight_id: impl Into<String>, mut samples: Vec<TrajectorySample>) -> Self {
        samples.retain(TrajectorySample::is_finite);
        samples.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        samples.dedup();
        Self {
            flight_id: flight_id.into(),
            call_sign: None,
            origin: None,
            destination: None,
            samples,
        }
    }

    pub fn with_call_sign(mut self, call_sign: impl Into<String>) -> Self {
        let call_sign = call_sign.into();
        if !call_sign.is_empty() {
            self.call_sign = Some(call_sign);
        }
        self
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    /// `(t0, t1)`, or `None` for an empty trajectory.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.time_s, self.samples.last()?.time_s))
    }

    pub fn is_active(&self, t: f64) -> bool {
        self.bounds().is_some_and(|(t0, t1)| t >= t0 && t <= t1)
    }

    /// First bracketing segment index and fractional progress `u` along it.
    pub fn segment_progress(&self, t: f64) -> Option<(usize, f64)> {
        self.samples.windows(2).enumerate().find_map(|(i, pair)| {
            let (a, b) = (pair[0].time_s, pair[1].time_s);
            if a <= t && t <= b {
                let u = if b == a { 0.0 } else { (t - a) / (b - a) };
                Some((i, u))
            } else {
                None
            }
        })
    }

    /// Interpolated position at `t`, or `None` when the flight is inactive.
    pub fn position_at(&self, t: f64) -> Option<AircraftPosition> {
        if !t.is_finite() || !self.is_active(t) {
            return None;
        }

        let n = self.samples.len();
        if n == 1 {
            return Some(self.place(&self.samples[0], 0.0));
        }

        let last = &self.samples[n - 1];
        if t == last.time_s {
            let heading = segment_heading(&self.samples[n - 2], last);
            return Some(self.place(last, heading));
        }

        let (i, u) = self.segment_progress(t)?;
        let (a, b) = (&self.samples[i], &self.samples[i + 1]);
        let altitude_ft = match (a.altitude_ft, b.altitude_ft) {
            (Some(x), Some(y)) => Some(lerp(x, y, u)),
            (x, y) => x.or(y),
        };

        Some(AircraftPosition {
            flight_id: self.flight_id.clone(),
            lon: lerp(a.lon, b.lon, u),
            lat: lerp(a.lat, b.lat, u),
            altitude_ft,
            heading_deg: segment_heading(a, b),
        })
    }

    fn place(&self, sample: &TrajectorySample, heading_deg: f64) -> AircraftPosition {
        AircraftPosition {
            flight_id: self.flight_id.clone(),
            lon: sample.lon,
            lat: sample.lat,
            altitude_ft: sample.altitude_ft,
            heading_deg,
        }
    }

    /// Group segment rows into one trajectory per flight.
    ///
    /// Rows are ordered by `sequence`. Each row contributes its begin and end
    /// points; the begin point is skipped when it repeats the previous
    /// position. Altitudes are flight level x 100 ft.
    pub fn from_segments<I>(rows: I) -> Vec<Trajectory>
    where
        I: IntoIterator<Item = FlightSegment>,
    {
        let mut by_flight: BTreeMap<String, Vec<FlightSegment>> = BTreeMap::new();
        for row in rows {
            if row.flight_identifier.is_empty() {
                continue;
            }
            by_flight
                .entry(row.flight_identifier.clone())
                .or_default()
                .push(row);
        }

        let mut trajectories = Vec::with_capacity(by_flight.len());
        for (flight_id, mut segs) in by_flight {
            segs.sort_by_key(|s| s.sequence);

            let mut samples: Vec<TrajectorySample> = Vec::with_capacity(segs.len() + 1);
            for seg in &segs {
                let (Some(t0), Some(t1)) = (
                    parse_compact_hms(&seg.time_begin_segment),
                    parse_compact_hms(&seg.time_end_segment),
                ) else {
                    warn!(
                        "Skipping segment {} of {}: bad time '{}'-'{}'",
                        seg.sequence, flight_id, seg.time_begin_segment, seg.time_end_segment
                    );
                    continue;
                };

                let repeats_previous = samples
                    .last()
                    .is_some_and(|p| p.lon == seg.longitude_begin && p.lat == seg.latitude_begin);
                if !repeats_previous {
                    samples.push(TrajectorySample {
                        lon: seg.longitude_begin,
                        lat: seg.latitude_begin,
                        altitude_ft: Some(seg.flight_level_begin * 100.0),
                        time_s: f64::from(t0),
                    });
                }
                samples.push(TrajectorySample {
                    lon: seg.longitude_end,
                    lat: seg.latitude_end,
                    altitude_ft: Some(seg.flight_level_end * 100.0),
                    time_s: f64::from(t1),
                });
            }

            let first = &segs[0];
            let mut trajectory =
                Trajectory::new(flight_id, samples).with_call_sign(first.call_sign.clone());
            trajectory.origin = non_empty(&first.origin_aerodrome);
            trajectory.destination = non_empty(&first.destination_aerodrome);
            trajectories.push(trajectory);
        }

        debug!("Built {} trajectories from segments", trajectories.len());
        trajectories
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn segment_heading(a: &TrajectorySample, b: &TrajectorySample) -> f64 {
    bearing_deg(a.lat, a.lon, b.lat, b.lon)
}

fn lerp(a: f64, b: f64, u: f64) -> f64 {
    if u >= 1.0 {
        b
    } else {
        a + (b - a) * u
    }
}

/// The session's loaded flights, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct FlightSet {
    trajectories: Vec<Trajectory>,
    by_id: HashMap<String, usize>,
}

impl FlightSet {
    pub fn new(trajectories: Vec<Trajectory>) -> Self {
        let mut by_id = HashMap::with_capacity(trajectories.len());
        for (i, t) in trajectories.iter().enumerate() {
            by_id.entry(t.flight_id.clone()).or_insert(i);
        }
        Self {
            trajectories,
            by_id,
        }
    }

    pub fn from_segments<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = FlightSegment>,
    {
        Self::new(Trajectory::from_segments(rows))
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    pub fn get(&self, flight_id: &str) -> Option<&Trajectory> {
        self.by_id.get(flight_id).map(|&i| &self.trajectories[i])
    }

    /// Earliest start and latest end over all flights.
    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        self.trajectories
            .iter()
            .filter_map(Trajectory::bounds)
            .fold(None, |acc, (t0, t1)| match acc {
                None => Some((t0, t1)),
                Some((lo, hi)) => Some((lo.min(t0), hi.max(t1))),
            })
    }

    pub fn active_flight_ids(&self, t: f64) -> FlightIdSet {
        self.trajectories
            .iter()
            .filter(|tr| tr.is_active(t))
            .map(|tr| tr.flight_id.clone())
            .collect()
    }

    pub fn positions_at(&self, t: f64) -> Vec<AircraftPosition> {
        self.trajectories
            .iter()
            .filter_map(|tr| tr.position_at(t))
            .collect()
    }

    /// Resolve a flight id or callsign to a trajectory.
    ///
    /// An exact id match wins; otherwise ids and callsigns are compared
    /// case-insensitively.
    pub fn find_by_token(&self, token: &str) -> Option<&Trajectory> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if let Some(t) = self.get(token) {
            return Some(t);
        }
        self.trajectories.iter().find(|tr| {
            tr.flight_id.eq_ignore_ascii_case(token)
                || tr
                    .call_sign
                    .as_deref()
                    .is_some_and(|cs| cs.eq_ignore_ascii_case(token))
        })
    }

    /// Flights whose id or callsign contains `query`, case-insensitively.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Trajectory> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.trajectories
            .iter()
            .filter(|tr| {
                tr.flight_id.to_lowercase().contains(&needle)
                    || tr
                        .call_sign
                        .as_deref()
                        .is_some_and(|cs| cs.to_lowercase().contains(&needle))
            })
            .take(limit)
            .collect()
    }

    /// Stable display token for a flight: its callsign when known.
    pub fn display_token(&self, flight_id: &str) -> String {
        self.get(flight_id)
            .and_then(|t| t.call_sign.clone())
            .unwrap_or_else(|| flight_id.to_string())
    }
}
