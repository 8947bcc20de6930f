//! One simulation session: the clock, the loaded data and everything derived
//! from them.
//!
//! The session is the single owner of session state. Mutations that change an
//! input of a derived set trigger an explicit recomputation; the tick applies
//! the clock advance before recomputing so positions and selections read the
//! same time within a frame.
//!
//! External data arrives through `apply_*` methods that take the ticket the
//! request was issued with. Responses for superseded tickets are dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::SimulationClock;
use crate::error::{CoreError, CoreResult};
use crate::fetch::{DataState, FetchKind, RequestGate, Ticket};
use crate::models::{
    ActiveWindow, AircraftPosition, FlightIdSet, Hotspot, ObjectiveWeights, OccupancySnapshot,
    RankingQuery, Regulation, RegulationDraft, SectorInfo, SimulationRequest, SimulationResult,
};
use crate::occupancy::{RollingBin, RollingOccupancy};
use crate::regulation::RegulationPlan;
use crate::selection::{ArrivalSource, SelectionChanges, SelectionInputs, SelectionManager, Tracked};
use crate::settings::{EngineSettings, FlightLevelBand};
use crate::time::{format_reference_time, parse_duration_preset, preset_for_window};
use crate::trajectory::FlightSet;

/// What one mutation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub time_moved: bool,
    pub active_flights: bool,
    pub selection: SelectionChanges,
}

#[derive(Debug, Clone)]
pub struct SimulationSession {
    settings: EngineSettings,
    clock: SimulationClock,
    flights: FlightSet,
    sectors: HashMap<String, SectorInfo>,
    selected_tv: Option<String>,
    occupancy: DataState<RollingOccupancy>,
    arrivals: DataState<Vec<(String, f64)>>,
    hotspots: DataState<Vec<Hotspot>>,
    simulation: DataState<SimulationResult>,
    gate: RequestGate,
    selection: SelectionManager,
    active_flights: Tracked<FlightIdSet>,
    plan: RegulationPlan,
    preset: String,
    rate: Option<f64>,
    /// Set while a regulation taken out of the plan is being edited
    editing: bool,
}

impl SimulationSession {
    pub fn new(settings: EngineSettings) -> Self {
        let mut clock = SimulationClock::new(settings.wrap_mode);
        clock.set_speed(settings.default_speed);
        let selection = SelectionManager::new(settings.focus_window_s, settings.flight_level_band);
        Self {
            preset: settings.default_preset.clone(),
            settings,
            clock,
            flights: FlightSet::default(),
            sectors: HashMap::new(),
            selected_tv: None,
            occupancy: DataState::Idle,
            arrivals: DataState::Idle,
            hotspots: DataState::Idle,
            simulation: DataState::Idle,
            gate: RequestGate::new(),
            selection,
            active_flights: Tracked::default(),
            plan: RegulationPlan::new(),
            rate: None,
            editing: false,
        }
    }

    // ---- accessors ----

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn time(&self) -> f64 {
        self.clock.current_time
    }

    pub fn flights(&self) -> &FlightSet {
        &self.flights
    }

    pub fn sectors(&self) -> &HashMap<String, SectorInfo> {
        &self.sectors
    }

    pub fn selected_traffic_volume(&self) -> Option<&str> {
        self.selected_tv.as_deref()
    }

    pub fn occupancy(&self) -> &DataState<RollingOccupancy> {
        &self.occupancy
    }

    pub fn arrivals(&self) -> &DataState<Vec<(String, f64)>> {
        &self.arrivals
    }

    pub fn hotspots(&self) -> &DataState<Vec<Hotspot>> {
        &self.hotspots
    }

    pub fn simulation(&self) -> &DataState<SimulationResult> {
        &self.simulation
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn active_flights(&self) -> &Tracked<FlightIdSet> {
        &self.active_flights
    }

    pub fn plan(&self) -> &RegulationPlan {
        &self.plan
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Interpolated positions of every active flight at the current time.
    pub fn positions(&self) -> Vec<AircraftPosition> {
        self.flights.positions_at(self.time())
    }

    /// Rolling occupancy bin covering the current time.
    pub fn current_occupancy(&self) -> Option<&RollingBin> {
        self.occupancy.ready()?.current_value_at(self.time())
    }

    /// Index of the occupancy bin containing the current time.
    ///
    /// Changes when the clock crosses a bin boundary, which is when ranked
    /// arrivals anchored at the current time go stale.
    pub fn arrival_bin(&self) -> Option<i64> {
        let minutes = self
            .occupancy
            .ready()
            .map(|o| o.bin_minutes)
            .unwrap_or(self.settings.default_bin_minutes);
        let t = self.time();
        (t.is_finite() && minutes > 0.0).then(|| (t / (minutes * 60.0)).floor() as i64)
    }

    // ---- data loading ----

    /// Replace the flight set and reset the clock bounds to its time span.
    pub fn load_flights(&mut self, flights: FlightSet) -> CoreResult<SessionUpdate> {
        if let Some((min, max)) = flights.time_bounds() {
            self.clock.set_bounds(min, max, Some(min))?;
        }
        info!(
            "Loaded {} flights, clock bounds {:?}",
            flights.len(),
            self.clock.bounds()
        );
        self.flights = flights;
        Ok(self.recompute(true))
    }

    pub fn load_sectors<I>(&mut self, sectors: I) -> SessionUpdate
    where
        I: IntoIterator<Item = SectorInfo>,
    {
        self.sectors = sectors
            .into_iter()
            .map(|s| (s.traffic_volume_id.clone(), s))
            .collect();
        self.recompute(false)
    }

    // ---- clock ----

    /// Advance the clock, then recompute everything that depends on time.
    pub fn tick(&mut self, elapsed_ms: f64) -> SessionUpdate {
        if !self.clock.advance(elapsed_ms) {
            return SessionUpdate::default();
        }
        self.recompute(true)
    }

    pub fn play(&mut self) {
        self.clock.set_playing(true);
    }

    pub fn pause(&mut self) {
        self.clock.set_playing(false);
    }

    pub fn set_speed(&mut self, speed: f64) -> bool {
        self.clock.set_speed(speed)
    }

    /// Jump to `t` without clamping.
    ///
    /// Returns a fresh arrivals ticket when the jump leaves the current
    /// bin; the outstanding arrivals request is superseded by it.
    pub fn set_time(&mut self, t: f64) -> (SessionUpdate, Option<Ticket>) {
        self.move_clock(|clock| clock.set_time(t))
    }

    /// Scrub to `t`, clamped to the clock bounds. Same ticket rule as
    /// [`Self::set_time`].
    pub fn seek(&mut self, t: f64) -> (SessionUpdate, Option<Ticket>) {
        self.move_clock(|clock| clock.seek_clamped(t))
    }

    fn move_clock(
        &mut self,
        apply: impl FnOnce(&mut SimulationClock),
    ) -> (SessionUpdate, Option<Ticket>) {
        let bin_before = self.arrival_bin();
        apply(&mut self.clock);
        let update = self.recompute(true);
        let refresh = if self.arrival_bin() != bin_before {
            self.refresh_arrivals()
        } else {
            None
        };
        (update, refresh)
    }

    /// Jump to a flight's first sample time.
    pub fn jump_to_flight(&mut self, token: &str) -> CoreResult<(f64, Option<Ticket>)> {
        let t0 = self
            .flights
            .find_by_token(token)
            .and_then(|f| f.bounds())
            .map(|(t0, _)| t0)
            .ok_or_else(|| CoreError::UnknownFlight(token.to_string()))?;
        let (_, refresh) = self.set_time(t0);
        Ok((t0, refresh))
    }

    // ---- traffic volume and fetches ----

    /// Select a traffic volume, or clear the selection with `None`.
    ///
    /// Outstanding occupancy and arrival requests for the previous volume
    /// are superseded. Returns the tickets to fetch the new volume's data.
    pub fn select_traffic_volume(&mut self, tv: Option<String>) -> Vec<Ticket> {
        let keep_targets = self.editing;
        self.select_traffic_volume_inner(tv, keep_targets)
    }

    fn select_traffic_volume_inner(&mut self, tv: Option<String>, keep_targets: bool) -> Vec<Ticket> {
        let tv = tv.filter(|s| !s.trim().is_empty());
        if !keep_targets {
            self.selection.clear_targets();
        }

        let tickets = match &tv {
            Some(id) => {
                info!("Traffic volume {} selected", id);
                self.occupancy = DataState::Loading;
                self.arrivals = DataState::Loading;
                self.selection.focus_enabled = true;
                if !keep_targets {
                    self.selection.active_window = self.anchored_window();
                }
                vec![
                    self.gate.issue(FetchKind::Occupancy, id.clone()),
                    self.gate.issue(FetchKind::Arrivals, id.clone()),
                ]
            }
            None => {
                info!("Traffic volume selection cleared");
                self.gate.invalidate(FetchKind::Occupancy);
                self.gate.invalidate(FetchKind::Arrivals);
                self.occupancy = DataState::Idle;
                self.arrivals = DataState::Idle;
                self.selection.focus_enabled = false;
                Vec::new()
            }
        };
        self.selected_tv = tv;
        self.recompute(false);
        tickets
    }

    /// Re-request arrivals for the selected volume, keeping current data
    /// visible until the response lands.
    pub fn refresh_arrivals(&mut self) -> Option<Ticket> {
        let tv = self.selected_tv.clone()?;
        if self.arrivals.ready().is_none() {
            self.arrivals = DataState::Loading;
        }
        Some(self.gate.issue(FetchKind::Arrivals, tv))
    }

    pub fn request_hotspots(&mut self) -> Ticket {
        if self.hotspots.ready().is_none() {
            self.hotspots = DataState::Loading;
        }
        self.gate.issue(FetchKind::Hotspots, "all")
    }

    /// Ranked-arrivals query for the selected volume at the current time.
    pub fn ranking_query(&self) -> Option<RankingQuery> {
        let tv = self.selected_tv.clone()?;
        let window = self.selection.active_window;
        Some(RankingQuery {
            traffic_volume_id: tv,
            ref_time_str: format_reference_time(self.time()),
            seed_flight_ids: self.selection.targets().get().iter().cloned().collect(),
            duration_min: Some((window.duration_s().max(0.0) / 60.0).round() as u32),
            top_k: Some(self.settings.ranking_top_k),
        })
    }

    fn accept(&mut self, ticket: &Ticket) -> bool {
        let accepted = self.gate.accept(ticket);
        if !accepted {
            warn!(
                "Discarding stale {:?} response for '{}' (#{})",
                ticket.kind, ticket.key, ticket.seq
            );
        }
        accepted
    }

    pub fn apply_occupancy(
        &mut self,
        ticket: &Ticket,
        result: Result<OccupancySnapshot, String>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.occupancy = match result {
            Ok(snapshot) => {
                let occupancy = RollingOccupancy::from_snapshot(&snapshot);
                if !self.editing {
                    self.rate = occupancy.capacity_at(self.time());
                }
                DataState::Ready(occupancy)
            }
            Err(e) => DataState::Failed(e),
        };
        self.recompute(false);
        true
    }

    pub fn apply_arrivals(
        &mut self,
        ticket: &Ticket,
        result: Result<ArrivalSource, String>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.arrivals = match result {
            Ok(source) => DataState::Ready(source.arrival_times()),
            Err(e) => DataState::Failed(e),
        };
        self.recompute(false);
        true
    }

    /// Hotspots are kept sorted by `z_max`, highest first.
    pub fn apply_hotspots(&mut self, ticket: &Ticket, result: Result<Vec<Hotspot>, String>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.hotspots = match result {
            Ok(mut list) => {
                list.sort_by(|a, b| b.z_max.total_cmp(&a.z_max));
                DataState::Ready(list)
            }
            Err(e) => DataState::Failed(e),
        };
        self.recompute(false);
        true
    }

    // ---- selection controls ----

    pub fn set_focus(&mut self, enabled: bool, window_s: Option<f64>) -> SessionUpdate {
        self.selection.focus_enabled = enabled;
        if let Some(w) = window_s.filter(|w| w.is_finite() && *w > 0.0) {
            self.selection.focus_window_s = w;
        }
        self.recompute(false)
    }

    pub fn set_hotspots_enabled(&mut self, enabled: bool) -> SessionUpdate {
        self.selection.hotspots_enabled = enabled;
        self.recompute(false)
    }

    pub fn set_flight_level_band(&mut self, band: FlightLevelBand) -> SessionUpdate {
        self.selection.flight_level_band = band;
        self.recompute(false)
    }

    /// Re-anchor the regulation window at the current time.
    pub fn apply_preset(&mut self, preset: &str) -> CoreResult<ActiveWindow> {
        if parse_duration_preset(preset) == 0 {
            return Err(CoreError::InvalidPreset(preset.to_string()));
        }
        self.preset = preset.trim().to_string();
        let window = self.anchored_window();
        self.selection.active_window = window;
        debug!("Active window {:?} from preset {}", window, self.preset);
        self.recompute(false);
        Ok(window)
    }

    pub fn set_active_window(&mut self, window: ActiveWindow) -> CoreResult<SessionUpdate> {
        window.validate()?;
        self.selection.active_window = window;
        self.preset = preset_for_window(window.from, window.to).to_string();
        Ok(self.recompute(false))
    }

    fn anchored_window(&self) -> ActiveWindow {
        ActiveWindow::anchored(self.time(), parse_duration_preset(&self.preset))
    }

    /// Move the clock to a hotspot's bin start and select its volume.
    pub fn jump_to_hotspot(&mut self, index: usize) -> CoreResult<Vec<Ticket>> {
        let hotspot = self
            .hotspots
            .ready()
            .and_then(|list| list.get(index))
            .cloned()
            .ok_or(CoreError::UnknownHotspot(index))?;
        let bin = hotspot
            .bin()
            .ok_or_else(|| CoreError::InvalidTimeLabel(hotspot.time_bin.clone()))?;

        self.clock.set_time(f64::from(bin.start_s));
        info!(
            "Jumped to hotspot {} at {}",
            hotspot.traffic_volume_id, hotspot.time_bin
        );
        let tickets = self.select_traffic_volume(Some(hotspot.traffic_volume_id));
        self.recompute(true);
        Ok(tickets)
    }

    // ---- regulation targets ----

    /// Add a target by flight id or callsign. Returns the resolved id.
    pub fn add_target(&mut self, token: &str) -> CoreResult<String> {
        let id = self
            .flights
            .find_by_token(token)
            .map(|f| f.flight_id.clone())
            .ok_or_else(|| CoreError::UnknownFlight(token.to_string()))?;
        self.selection.add_target(id.clone());
        Ok(id)
    }

    pub fn remove_target(&mut self, flight_id: &str) -> bool {
        self.selection.remove_target(flight_id)
    }

    pub fn clear_targets(&mut self) -> bool {
        self.selection.clear_targets()
    }

    pub fn add_all_candidates(&mut self) -> bool {
        self.selection.add_all_candidates()
    }

    pub fn set_rate(&mut self, rate: f64) -> bool {
        if rate.is_finite() && rate >= 0.0 {
            self.rate = Some(rate);
            true
        } else {
            false
        }
    }

    // ---- plan ----

    fn current_draft(&self) -> CoreResult<RegulationDraft> {
        let tv = self.selected_tv.clone().ok_or(CoreError::NoTrafficVolume)?;
        Ok(RegulationDraft {
            traffic_volume: tv,
            active_window: self.selection.active_window,
            target_flight_ids: self.selection.targets().get().iter().cloned().collect(),
            rate: self.rate.unwrap_or(0.0),
        })
    }

    /// Commit the current selection as a regulation.
    pub fn commit_regulation(&mut self) -> CoreResult<String> {
        let draft = self.current_draft()?;
        let id = self.plan.add(draft, &self.flights)?;
        self.editing = false;
        self.selection.clear_targets();
        Ok(id)
    }

    /// Replace a regulation with a caller-supplied payload.
    pub fn replace_regulation(&mut self, id: &str, draft: RegulationDraft) -> CoreResult<String> {
        self.plan.edit(id, draft, &self.flights)
    }

    pub fn remove_regulation(&mut self, id: &str) -> CoreResult<Regulation> {
        self.plan.remove(id)
    }

    /// Take a regulation out of the plan and load it into the selection.
    ///
    /// Committing afterwards creates a new regulation with a new id.
    pub fn edit_regulation(&mut self, id: &str) -> CoreResult<(RegulationDraft, Vec<Ticket>)> {
        let draft = self.plan.begin_edit(id, &self.flights)?;
        self.editing = true;
        let tickets = self.select_traffic_volume_inner(Some(draft.traffic_volume.clone()), true);
        self.selection.set_targets(draft.target_flight_ids.iter().cloned());
        self.rate = Some(draft.rate);
        self.set_active_window(draft.active_window)?;
        Ok((draft, tickets))
    }

    pub fn simulation_request(
        &self,
        weights: ObjectiveWeights,
        top_k: Option<usize>,
    ) -> CoreResult<SimulationRequest> {
        let bin_minutes = self
            .occupancy
            .ready()
            .map(|o| o.bin_minutes)
            .unwrap_or(self.settings.default_bin_minutes);
        self.plan
            .to_simulation_request(&self.flights, bin_minutes, weights, top_k)
    }

    pub fn begin_simulation(&mut self) -> Ticket {
        self.simulation = DataState::Loading;
        self.gate.issue(FetchKind::Simulation, "plan")
    }

    pub fn apply_simulation(
        &mut self,
        ticket: &Ticket,
        result: Result<SimulationResult, String>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.simulation = match result {
            Ok(r) => DataState::Ready(r),
            Err(e) => DataState::Failed(e),
        };
        true
    }

    // ---- recomputation ----

    fn recompute(&mut self, time_moved: bool) -> SessionUpdate {
        let t = self.time();
        let active_flights = if time_moved {
            self.active_flights.update(self.flights.active_flight_ids(t))
        } else {
            false
        };

        let inputs = SelectionInputs {
            t,
            arrivals: self.arrivals.ready().map(Vec::as_slice),
            hotspots: self.hotspots.ready().map(Vec::as_slice),
            sectors: &self.sectors,
        };
        let selection = self.selection.recompute(&inputs);

        SessionUpdate {
            time_moved,
            active_flights,
            selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::ArrivalDetail;
    use crate::trajectory::{Trajectory, TrajectorySample};

    fn flight(id: &str, call_sign: &str, t0: f64, t1: f64) -> Trajectory {
        Trajectory::new(
            id,
            vec![
                TrajectorySample { lon: 0.0, lat: 0.0, altitude_ft: None, time_s: t0 },
                TrajectorySample { lon: 1.0, lat: 1.0, altitude_ft: None, time_s: t1 },
            ],
        )
        .with_call_sign(call_sign)
    }

    fn detail(id: &str, at: f64) -> ArrivalDetail {
        ArrivalDetail {
            flight_id: id.into(),
            arrival_time: None,
            arrival_seconds: Some(at),
            delta_seconds: None,
            time_window: None,
            score: None,
            component_scores: None,
        }
    }

    fn session() -> SimulationSession {
        let mut s = SimulationSession::new(EngineSettings::default());
        s.load_flights(FlightSet::new(vec![
            flight("F1", "AFR1", 21_600.0, 25_200.0),
            flight("F2", "BAW2", 22_000.0, 30_000.0),
            flight("F3", "", 40_000.0, 50_000.0),
        ]))
        .unwrap();
        s
    }

    fn snapshot() -> OccupancySnapshot {
        OccupancySnapshot {
            traffic_volume_id: "TV1".into(),
            occupancy_counts: BTreeMap::from([
                ("06:00-06:15".to_string(), 4),
                ("06:15-06:30".to_string(), 6),
            ]),
            hourly_capacity: BTreeMap::from([("06:00-07:00".to_string(), 12.0)]),
            ..Default::default()
        }
    }

    #[test]
    fn loading_flights_sets_bounds() {
        let s = session();
        assert_eq!(s.clock().bounds(), (21_600.0, 50_000.0));
        assert_eq!(s.time(), 21_600.0);
        assert_eq!(s.active_flights().get().len(), 1);
    }

    #[test]
    fn tick_advances_before_recomputing() {
        let mut s = session();
        assert_eq!(s.tick(1000.0), SessionUpdate::default());
        s.play();
        s.set_speed(400.0);
        let update = s.tick(1000.0);
        assert!(update.time_moved);
        assert!(update.active_flights);
        assert_eq!(s.time(), 22_000.0);
        assert_eq!(s.active_flights().get().len(), 2);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut s = session();
        let first = s.select_traffic_volume(Some("TV1".into()));
        let second = s.select_traffic_volume(Some("TV2".into()));
        assert!(!s.apply_occupancy(&first[0], Ok(snapshot())));
        assert!(s.occupancy().is_loading());
        assert!(s.apply_occupancy(&second[0], Err("backend down".into())));
        assert_eq!(s.occupancy().error(), Some("backend down"));
        assert!(s.current_occupancy().is_none());
    }

    #[test]
    fn scrubbing_supersedes_outstanding_arrivals() {
        let mut s = session();
        let tickets = s.select_traffic_volume(Some("TV1".into()));

        let (_, same_bin) = s.seek(21_700.0);
        assert!(same_bin.is_none());

        let (update, refresh) = s.seek(50_000.0);
        assert!(update.time_moved);
        let refresh = refresh.expect("new bin needs new arrivals");
        assert_eq!(s.ranking_query().unwrap().ref_time_str, "135320");
        assert!(!s.apply_arrivals(&tickets[1], Ok(ArrivalSource::Ranked(vec![detail("F1", 0.0)]))));
        assert!(s.apply_arrivals(&refresh, Ok(ArrivalSource::Ranked(vec![detail("F3", 50_100.0)]))));
        assert!(s.selection().focus().get().contains("F3"));

        let (t0, jump) = s.jump_to_flight("AFR1").unwrap();
        assert_eq!(t0, 21_600.0);
        assert!(jump.is_some());
    }

    #[test]
    fn occupancy_sets_default_rate() {
        let mut s = session();
        let tickets = s.select_traffic_volume(Some("TV1".into()));
        assert!(s.apply_occupancy(&tickets[0], Ok(snapshot())));
        assert_eq!(s.rate(), Some(12.0));
        assert_eq!(s.current_occupancy().unwrap().rolling_count, 10);
    }

    #[test]
    fn arrivals_drive_focus_and_candidates() {
        let mut s = session();
        let tickets = s.select_traffic_volume(Some("TV1".into()));
        assert_eq!(s.selection().active_window, ActiveWindow::new(21_600.0, 25_200.0));
        s.apply_arrivals(
            &tickets[1],
            Ok(ArrivalSource::Ranked(vec![
                detail("F1", 22_000.0),
                detail("F2", 26_000.0),
            ])),
        );
        assert_eq!(s.selection().focus().get().len(), 1);
        assert_eq!(s.selection().candidates().get().len(), 1);

        s.apply_preset("2h").unwrap();
        assert_eq!(s.selection().candidates().get().len(), 2);
        assert!(s.apply_preset("never").is_err());
    }

    #[test]
    fn selecting_a_new_volume_clears_targets() {
        let mut s = session();
        s.select_traffic_volume(Some("TV1".into()));
        assert_eq!(s.add_target("baw2").unwrap(), "F2");
        assert!(s.add_target("ZZZ").is_err());
        s.select_traffic_volume(Some("TV2".into()));
        assert!(s.selection().targets().get().is_empty());
    }

    #[test]
    fn commit_then_edit_round_trip() {
        let mut s = session();
        s.select_traffic_volume(Some("TV1".into()));
        s.add_target("F1").unwrap();
        s.set_rate(8.0);
        let id = s.commit_regulation().unwrap();
        assert!(s.selection().targets().get().is_empty());
        assert_eq!(s.plan().get(&id).unwrap().flight_tokens, vec!["AFR1"]);

        let (draft, tickets) = s.edit_regulation(&id).unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(s.is_editing());
        assert!(s.plan().is_empty());
        assert_eq!(draft.target_flight_ids, vec!["F1"]);
        assert!(s.selection().targets().get().contains("F1"));
        assert_eq!(s.rate(), Some(8.0));

        let new_id = s.commit_regulation().unwrap();
        assert_ne!(id, new_id);
        assert!(!s.is_editing());
    }

    #[test]
    fn hotspot_jump_moves_clock_and_selects() {
        let mut s = session();
        let ticket = s.request_hotspots();
        s.apply_hotspots(
            &ticket,
            Ok(vec![
                Hotspot {
                    traffic_volume_id: "LOW".into(),
                    time_bin: "09:00-10:00".into(),
                    z_max: 1.0,
                    z_sum: 1.0,
                    hourly_occupancy: 1.0,
                    hourly_capacity: 1.0,
                    is_overloaded: false,
                },
                Hotspot {
                    traffic_volume_id: "HIGH".into(),
                    time_bin: "07:00-08:00".into(),
                    z_max: 9.0,
                    z_sum: 9.0,
                    hourly_occupancy: 1.0,
                    hourly_capacity: 1.0,
                    is_overloaded: true,
                },
            ]),
        );
        let tickets = s.jump_to_hotspot(0).unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(s.time(), 25_200.0);
        assert_eq!(s.selected_traffic_volume(), Some("HIGH"));
        assert_eq!(s.active_flights().get(), &s.flights().active_flight_ids(s.time()));
        assert!(matches!(s.jump_to_hotspot(5), Err(CoreError::UnknownHotspot(5))));
    }

    #[test]
    fn simulation_request_needs_a_plan() {
        let mut s = session();
        assert_eq!(
            s.simulation_request(ObjectiveWeights::default(), None),
            Err(CoreError::EmptyPlan)
        );
        s.select_traffic_volume(Some("TV1".into()));
        s.add_target("F3").unwrap();
        s.commit_regulation().unwrap();
        let request = s.simulation_request(ObjectiveWeights::default(), None).unwrap();
        assert_eq!(request.regulations[0].target_flight_ids, vec!["F3"]);
        assert_eq!(request.regulations[0].time_windows, vec![6]);
    }
}
