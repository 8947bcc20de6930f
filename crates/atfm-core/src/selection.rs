//! Time-scoped selection sets derived from the clock and fetched data.
//!
//! Every set is re-derived from scratch whenever one of its inputs changes.
//! A derived set only replaces the previous one when its contents differ, so
//! consumers can watch revisions instead of comparing sets themselves.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{ActiveWindow, ArrivalDetail, FlightIdSet, Hotspot, RankedArrivals, RankedFlight, SectorInfo};
use crate::settings::FlightLevelBand;
use crate::time::parse_clock;

/// Where arrival times at the selected traffic volume come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ArrivalSource {
    /// Ordered arrivals with `arrival_seconds`
    Ranked(Vec<ArrivalDetail>),
    /// Ranked flights with `arrival_time` strings
    RankedFlights(Vec<RankedFlight>),
    /// Time-window label -> flight ids; the window start is the arrival time
    TimeWindows(BTreeMap<String, Vec<String>>),
}

impl ArrivalSource {
    /// Pick the richest source present in a ranking response.
    pub fn from_ranked(response: &RankedArrivals) -> Self {
        if response.details.is_empty() && !response.ranked_flights.is_empty() {
            Self::RankedFlights(response.ranked_flights.clone())
        } else {
            Self::Ranked(response.details.clone())
        }
    }

    /// `(flight_id, arrival_seconds)` for every flight with a usable time.
    pub fn arrival_times(&self) -> Vec<(String, f64)> {
        match self {
            Self::Ranked(details) => details
                .iter()
                .filter_map(|d| {
                    let t = d.arrival_seconds.filter(|s| s.is_finite()).or_else(|| {
                        d.arrival_time.as_deref().and_then(parse_clock).map(f64::from)
                    })?;
                    Some((d.flight_id.clone(), t))
                })
                .collect(),
            Self::RankedFlights(flights) => flights
                .iter()
                .filter_map(|f| Some((f.flight_id.clone(), f.arrival_seconds()?)))
                .collect(),
            Self::TimeWindows(windows) => windows
                .iter()
                .filter_map(|(label, ids)| {
                    let start = label.split('-').next().and_then(parse_clock)?;
                    Some(ids.iter().map(move |id| (id.clone(), f64::from(start))))
                })
                .flatten()
                .collect(),
        }
    }
}

/// Flights arriving within `[t, t + window_s]`.
pub fn focus_flight_ids(t: f64, window_s: f64, arrivals: &[(String, f64)]) -> FlightIdSet {
    flights_arriving_in(ActiveWindow::new(t, t + window_s), arrivals)
}

/// Flights arriving within the closed regulation window.
pub fn regulation_candidates(window: ActiveWindow, arrivals: &[(String, f64)]) -> FlightIdSet {
    flights_arriving_in(window, arrivals)
}

fn flights_arriving_in(window: ActiveWindow, arrivals: &[(String, f64)]) -> FlightIdSet {
    arrivals
        .iter()
        .filter(|(_, at)| window.contains(*at))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Hotspots whose time bin covers `t` and whose sector overlaps the band.
///
/// Sectors missing from `sectors` are not filtered by flight level.
pub fn active_hotspots(
    t: f64,
    hotspots: &[Hotspot],
    sectors: &HashMap<String, SectorInfo>,
    band: FlightLevelBand,
) -> Vec<Hotspot> {
    hotspots
        .iter()
        .filter(|h| h.is_active_at(t))
        .filter(|h| {
            sectors
                .get(&h.traffic_volume_id)
                .map_or(true, |s| band.overlaps(s.min_fl, s.max_fl))
        })
        .cloned()
        .collect()
}

/// A derived value plus a revision bumped only on content changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tracked<T> {
    value: T,
    revision: u64,
}

impl<T: PartialEq> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self { value, revision: 0 }
    }

    /// Replace the value if it differs. Returns whether it changed.
    pub fn update(&mut self, next: T) -> bool {
        if self.value == next {
            return false;
        }
        self.value = next;
        self.revision += 1;
        true
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Which sets changed in one recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChanges {
    pub focus: bool,
    pub hotspots: bool,
    pub candidates: bool,
}

impl SelectionChanges {
    pub fn any(&self) -> bool {
        self.focus || self.hotspots || self.candidates
    }
}

/// Inputs shared by one recomputation pass.
pub struct SelectionInputs<'a> {
    pub t: f64,
    /// `None` while arrivals are not available
    pub arrivals: Option<&'a [(String, f64)]>,
    pub hotspots: Option<&'a [Hotspot]>,
    pub sectors: &'a HashMap<String, SectorInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionManager {
    pub focus_enabled: bool,
    pub focus_window_s: f64,
    pub hotspots_enabled: bool,
    pub flight_level_band: FlightLevelBand,
    pub active_window: ActiveWindow,
    focus: Tracked<FlightIdSet>,
    hotspots: Tracked<Vec<Hotspot>>,
    candidates: Tracked<FlightIdSet>,
    targets: Tracked<FlightIdSet>,
}

impl SelectionManager {
    pub fn new(focus_window_s: f64, flight_level_band: FlightLevelBand) -> Self {
        Self {
            focus_enabled: false,
            focus_window_s,
            hotspots_enabled: false,
            flight_level_band,
            active_window: ActiveWindow::default(),
            focus: Tracked::default(),
            hotspots: Tracked::default(),
            candidates: Tracked::default(),
            targets: Tracked::default(),
        }
    }

    /// Re-derive all three sets.
    pub fn recompute(&mut self, inputs: &SelectionInputs<'_>) -> SelectionChanges {
        let arrivals = inputs.arrivals.unwrap_or(&[]);

        let focus = if self.focus_enabled {
            focus_flight_ids(inputs.t, self.focus_window_s, arrivals)
        } else {
            FlightIdSet::new()
        };

        let hotspots = match inputs.hotspots {
            Some(list) if self.hotspots_enabled => {
                active_hotspots(inputs.t, list, inputs.sectors, self.flight_level_band)
            }
            _ => Vec::new(),
        };

        let candidates = regulation_candidates(self.active_window, arrivals);

        let changes = SelectionChanges {
            focus: self.focus.update(focus),
            hotspots: self.hotspots.update(hotspots),
            candidates: self.candidates.update(candidates),
        };
        if changes.any() {
            debug!(
                "Selection changed at t={:.0}: focus={} hotspots={} candidates={}",
                inputs.t,
                self.focus.get().len(),
                self.hotspots.get().len(),
                self.candidates.get().len()
            );
        }
        changes
    }

    pub fn focus(&self) -> &Tracked<FlightIdSet> {
        &self.focus
    }

    pub fn active_hotspots(&self) -> &Tracked<Vec<Hotspot>> {
        &self.hotspots
    }

    pub fn candidates(&self) -> &Tracked<FlightIdSet> {
        &self.candidates
    }

    pub fn targets(&self) -> &Tracked<FlightIdSet> {
        &self.targets
    }

    pub fn add_target(&mut self, flight_id: impl Into<String>) -> bool {
        let mut next = self.targets.get().clone();
        next.insert(flight_id.into());
        self.targets.update(next)
    }

    pub fn remove_target(&mut self, flight_id: &str) -> bool {
        let mut next = self.targets.get().clone();
        next.remove(flight_id);
        self.targets.update(next)
    }

    pub fn clear_targets(&mut self) -> bool {
        self.targets.update(FlightIdSet::new())
    }

    pub fn set_targets<I>(&mut self, flight_ids: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        self.targets.update(flight_ids.into_iter().collect())
    }

    /// Add every current regulation candidate to the targets.
    pub fn add_all_candidates(&mut self) -> bool {
        let mut next = self.targets.get().clone();
        next.extend(self.candidates.get().iter().cloned());
        self.targets.update(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrivals() -> Vec<(String, f64)> {
        vec![
            ("A".to_string(), 100.0),
            ("B".to_string(), 200.0),
            ("C".to_string(), 400.0),
        ]
    }

    fn hotspot(tv: &str, bin: &str) -> Hotspot {
        Hotspot {
            traffic_volume_id: tv.into(),
            time_bin: bin.into(),
            z_max: 1.0,
            z_sum: 1.0,
            hourly_occupancy: 10.0,
            hourly_capacity: 5.0,
            is_overloaded: true,
        }
    }

    #[test]
    fn focus_window_is_closed() {
        let ids = focus_flight_ids(100.0, 100.0, &arrivals());
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn missing_arrivals_are_excluded() {
        let source = ArrivalSource::Ranked(vec![
            ArrivalDetail {
                flight_id: "A".into(),
                arrival_time: None,
                arrival_seconds: Some(50.0),
                delta_seconds: None,
                time_window: None,
                score: None,
                component_scores: None,
            },
            ArrivalDetail {
                flight_id: "B".into(),
                arrival_time: Some("not a time".into()),
                arrival_seconds: None,
                delta_seconds: None,
                time_window: None,
                score: None,
                component_scores: None,
            },
        ]);
        assert_eq!(source.arrival_times(), vec![("A".to_string(), 50.0)]);
    }

    #[test]
    fn time_window_source_uses_window_start() {
        let source = ArrivalSource::TimeWindows(BTreeMap::from([
            ("06:00-06:15".to_string(), vec!["X".to_string(), "Y".to_string()]),
            ("junk".to_string(), vec!["Z".to_string()]),
        ]));
        let times = source.arrival_times();
        assert_eq!(times.len(), 2);
        assert!(times.iter().all(|(_, t)| *t == 21_600.0));
    }

    #[test]
    fn hotspots_filtered_by_band() {
        let sectors = HashMap::from([(
            "HIGH".to_string(),
            SectorInfo {
                traffic_volume_id: "HIGH".into(),
                name: None,
                min_fl: 350,
                max_fl: 460,
            },
        )]);
        let list = vec![hotspot("HIGH", "06:00-07:00"), hotspot("UNKNOWN", "06:00-07:00")];
        let band = FlightLevelBand { lower: 0, upper: 300 };
        let active = active_hotspots(6.5 * 3600.0, &list, &sectors, band);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].traffic_volume_id, "UNKNOWN");
    }

    #[test]
    fn disabled_sets_are_empty() {
        let mut manager = SelectionManager::new(3600.0, FlightLevelBand::default());
        let arr = arrivals();
        let hs = vec![hotspot("TV", "00:00-01:00")];
        let sectors = HashMap::new();
        let inputs = SelectionInputs {
            t: 0.0,
            arrivals: Some(&arr),
            hotspots: Some(&hs),
            sectors: &sectors,
        };
        let changes = manager.recompute(&inputs);
        assert!(!changes.focus && !changes.hotspots);
        assert!(manager.focus().get().is_empty());

        manager.hotspots_enabled = true;
        assert!(manager.recompute(&inputs).hotspots);
        assert_eq!(manager.active_hotspots().get().len(), 1);
    }

    #[test]
    fn targets_track_revisions() {
        let mut manager = SelectionManager::new(3600.0, FlightLevelBand::default());
        assert!(manager.add_target("A"));
        assert!(!manager.add_target("A"));
        assert_eq!(manager.targets().revision(), 1);
        assert!(manager.remove_target("A"));
        assert!(!manager.clear_targets());

        manager.active_window = ActiveWindow::new(150.0, 450.0);
        let arr = arrivals();
        let sectors = HashMap::new();
        manager.recompute(&SelectionInputs {
            t: 0.0,
            arrivals: Some(&arr),
            hotspots: None,
            sectors: &sectors,
        });
        assert!(manager.add_all_candidates());
        assert_eq!(manager.targets().get().len(), 2);
    }
}
