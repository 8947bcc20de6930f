//! REST API routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::request_id::{self, RequestId};
use crate::fetch;
use crate::state::AppState;
use atfm_backend::AnalyticsClient;
use atfm_core::models::{ActiveWindow, FlowQuery, ObjectiveWeights, RegulationDraft, SlackSign};
use atfm_core::time::{format_hhmmss, format_reference_time, parse_clock};
use atfm_core::{CoreError, FlightLevelBand, SessionUpdate, SimulationSession};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    let clock_routes = Router::new()
        .route("/v1/clock", get(get_clock))
        .route("/v1/clock/play", post(play))
        .route("/v1/clock/pause", post(pause))
        .route("/v1/clock/speed", post(set_speed))
        .route("/v1/clock/seek", post(seek))
        .route("/v1/clock/time", post(set_time));

    let flight_routes = Router::new()
        .route("/v1/positions", get(get_positions))
        .route("/v1/flights/search", get(search_flights))
        .route("/v1/flights/:token/jump", post(jump_to_flight));

    let selection_routes = Router::new()
        .route("/v1/selection", get(get_selection))
        .route("/v1/traffic-volume", post(select_traffic_volume))
        .route("/v1/window", post(set_window))
        .route("/v1/window/preset", post(apply_preset))
        .route("/v1/focus", post(set_focus))
        .route("/v1/flight-level-band", post(set_flight_level_band))
        .route("/v1/hotspots", get(get_hotspots))
        .route("/v1/hotspots/refresh", post(refresh_hotspots))
        .route("/v1/hotspots/toggle", post(toggle_hotspots))
        .route("/v1/hotspots/:index/jump", post(jump_to_hotspot))
        .route("/v1/targets", post(add_target).delete(clear_targets))
        .route("/v1/targets/candidates", post(add_all_candidates))
        .route("/v1/targets/:id", delete(remove_target))
        .route("/v1/rate", post(set_rate))
        .route("/v1/occupancy", get(get_occupancy));

    let plan_routes = Router::new()
        .route("/v1/regulations", get(list_regulations).post(commit_regulation))
        .route(
            "/v1/regulations/:id",
            delete(remove_regulation).put(replace_regulation),
        )
        .route("/v1/regulations/:id/edit", post(edit_regulation))
        .route("/v1/plan/simulate", post(simulate_plan))
        .route("/v1/plan/simulation", get(get_simulation));

    let analysis_routes = Router::new()
        .route("/v1/slack", get(get_slack))
        .route("/v1/flows", get(get_flows));

    clock_routes
        .merge(flight_routes)
        .merge(selection_routes)
        .merge(plan_routes)
        .merge(analysis_routes)
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

// === Errors ===

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("backend request failed: {0:#}")]
    Backend(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Core(
                CoreError::UnknownFlight(_)
                | CoreError::UnknownHotspot(_)
                | CoreError::UnknownRegulation(_),
            ) => StatusCode::NOT_FOUND,
            ApiError::Core(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// Client that forwards the caller's request id to the backend.
fn backend_client(state: &AppState, request_id: Option<&RequestId>) -> AnalyticsClient {
    let mut client = state.client().clone();
    client.set_request_id(request_id.map(|id| id.as_str().to_string()));
    client
}

// === Request types ===

#[derive(Debug, Deserialize)]
pub struct SpeedRequest {
    pub speed: f64,
}

/// A time given either in seconds since midnight or as `HH:MM[:SS]`.
#[derive(Debug, Deserialize)]
pub struct TimeRequest {
    pub time_s: Option<f64>,
    pub clock: Option<String>,
}

impl TimeRequest {
    fn seconds(&self) -> Result<f64, ApiError> {
        if let Some(t) = self.time_s.filter(|t| t.is_finite()) {
            return Ok(t);
        }
        match self.clock.as_deref() {
            Some(raw) => parse_clock(raw)
                .map(f64::from)
                .ok_or_else(|| CoreError::InvalidTimeLabel(raw.to_string()).into()),
            None => Err(ApiError::BadRequest("time_s or clock is required".into())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TrafficVolumeRequest {
    pub traffic_volume_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PresetRequest {
    pub preset: String,
}

#[derive(Debug, Deserialize)]
pub struct FocusRequest {
    pub enabled: bool,
    pub window_s: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    /// Explicit state; flips the current one when absent
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    /// Flight id or callsign
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    /// Half-width of the chart window around the current time
    pub window_s: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SimulateRequest {
    #[serde(default)]
    pub weights: ObjectiveWeights,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SlackQuery {
    #[serde(default)]
    pub sign: SlackSign,
    pub delta_min: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FlowsQuery {
    pub threshold: Option<f64>,
    pub resolution: Option<f64>,
    pub seed: Option<u64>,
    pub limit: Option<usize>,
}

// === Views ===

fn clock_view(session: &SimulationSession) -> Value {
    let clock = session.clock();
    json!({
        "time_s": clock.current_time,
        "time": format_hhmmss(clock.current_time),
        "min_time": clock.min_time,
        "max_time": clock.max_time,
        "speed": clock.speed,
        "playing": clock.playing,
        "wrap_mode": clock.wrap_mode,
        "speed_options": session.settings().speed_options,
    })
}

fn selection_view(session: &SimulationSession) -> Value {
    let selection = session.selection();
    json!({
        "time_s": session.time(),
        "traffic_volume_id": session.selected_traffic_volume(),
        "focus_enabled": selection.focus_enabled,
        "focus_window_s": selection.focus_window_s,
        "hotspots_enabled": selection.hotspots_enabled,
        "flight_level_band": selection.flight_level_band,
        "active_window": selection.active_window,
        "preset": session.preset(),
        "rate": session.rate(),
        "editing": session.is_editing(),
        "occupancy": session.occupancy().label(),
        "arrivals": session.arrivals().label(),
        "focus": {
            "revision": selection.focus().revision(),
            "flight_ids": selection.focus().get(),
        },
        "candidates": {
            "revision": selection.candidates().revision(),
            "flight_ids": selection.candidates().get(),
        },
        "targets": {
            "revision": selection.targets().revision(),
            "flight_ids": selection.targets().get(),
        },
        "active_hotspots": {
            "revision": selection.active_hotspots().revision(),
            "hotspots": selection.active_hotspots().get(),
        },
        "active_flights": {
            "revision": session.active_flights().revision(),
            "count": session.active_flights().get().len(),
        },
    })
}

fn update_view(update: SessionUpdate, session: &SimulationSession) -> Value {
    json!({
        "update": update,
        "selection": selection_view(session),
    })
}

// === Clock ===

async fn get_clock(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(clock_view(&*state.session().await))
}

async fn play(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut session = state.session_mut().await;
    session.play();
    Json(clock_view(&session))
}

async fn pause(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut session = state.session_mut().await;
    session.pause();
    Json(clock_view(&session))
}

async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpeedRequest>,
) -> ApiResult {
    let mut session = state.session_mut().await;
    if !session.set_speed(req.speed) {
        return Err(ApiError::BadRequest(format!(
            "speed must be a positive number, got {}",
            req.speed
        )));
    }
    Ok(Json(clock_view(&session)))
}

/// Scrub: the target is clamped to the clock bounds.
async fn seek(State(state): State<Arc<AppState>>, Json(req): Json<TimeRequest>) -> ApiResult {
    let t = req.seconds()?;
    let (refresh, view) = {
        let mut session = state.session_mut().await;
        let (_, refresh) = session.seek(t);
        (refresh, clock_view(&session))
    };
    fetch::dispatch(state.clone(), refresh.into_iter().collect());
    Ok(Json(view))
}

/// Programmatic jump: the target is applied as given.
async fn set_time(State(state): State<Arc<AppState>>, Json(req): Json<TimeRequest>) -> ApiResult {
    let t = req.seconds()?;
    let (refresh, view) = {
        let mut session = state.session_mut().await;
        let (_, refresh) = session.set_time(t);
        (refresh, clock_view(&session))
    };
    fetch::dispatch(state.clone(), refresh.into_iter().collect());
    Ok(Json(view))
}

// === Flights ===

async fn get_positions(State(state): State<Arc<AppState>>) -> Json<Value> {
    let session = state.session().await;
    let positions = session.positions();
    Json(json!({
        "time_s": session.time(),
        "count": positions.len(),
        "positions": positions,
    }))
}

async fn search_flights(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Value> {
    let session = state.session().await;
    let results: Vec<Value> = session
        .flights()
        .search(&query.q, query.limit.unwrap_or(20))
        .into_iter()
        .map(|tr| {
            json!({
                "flight_id": tr.flight_id,
                "call_sign": tr.call_sign,
                "origin": tr.origin,
                "destination": tr.destination,
                "bounds": tr.bounds(),
            })
        })
        .collect();
    Json(json!({ "count": results.len(), "flights": results }))
}

async fn jump_to_flight(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> ApiResult {
    let (refresh, view) = {
        let mut session = state.session_mut().await;
        let (_, refresh) = session.jump_to_flight(&token)?;
        (refresh, clock_view(&session))
    };
    fetch::dispatch(state.clone(), refresh.into_iter().collect());
    Ok(Json(view))
}

// === Selection ===

async fn get_selection(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(selection_view(&*state.session().await))
}

async fn select_traffic_volume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrafficVolumeRequest>,
) -> impl IntoResponse {
    let (tickets, view) = {
        let mut session = state.session_mut().await;
        let tickets = session.select_traffic_volume(req.traffic_volume_id);
        (tickets, selection_view(&session))
    };
    let pending: Vec<_> = tickets.iter().map(|t| t.kind).collect();
    fetch::dispatch(state.clone(), tickets);
    (
        StatusCode::ACCEPTED,
        Json(json!({ "pending": pending, "selection": view })),
    )
}

async fn set_window(
    State(state): State<Arc<AppState>>,
    Json(window): Json<ActiveWindow>,
) -> ApiResult {
    let mut session = state.session_mut().await;
    let update = session.set_active_window(window)?;
    Ok(Json(update_view(update, &session)))
}

async fn apply_preset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PresetRequest>,
) -> ApiResult {
    let mut session = state.session_mut().await;
    session.apply_preset(&req.preset)?;
    Ok(Json(selection_view(&session)))
}

async fn set_focus(State(state): State<Arc<AppState>>, Json(req): Json<FocusRequest>) -> Json<Value> {
    let mut session = state.session_mut().await;
    let update = session.set_focus(req.enabled, req.window_s);
    Json(update_view(update, &session))
}

async fn set_flight_level_band(
    State(state): State<Arc<AppState>>,
    Json(band): Json<FlightLevelBand>,
) -> ApiResult {
    if band.lower > band.upper {
        return Err(ApiError::BadRequest(format!(
            "lower flight level {} is above upper {}",
            band.lower, band.upper
        )));
    }
    let mut session = state.session_mut().await;
    let update = session.set_flight_level_band(band);
    Ok(Json(update_view(update, &session)))
}

async fn get_hotspots(State(state): State<Arc<AppState>>) -> Json<Value> {
    let session = state.session().await;
    Json(json!({
        "state": session.hotspots().label(),
        "error": session.hotspots().error(),
        "hotspots": session.hotspots().ready(),
    }))
}

async fn refresh_hotspots(State(state): State<Arc<AppState>>) -> ApiResult {
    let ticket = state.session_mut().await.request_hotspots();
    fetch::fetch_hotspots(&state, ticket)
        .await
        .map_err(ApiError::Backend)?;
    Ok(get_hotspots(State(state)).await)
}

async fn toggle_hotspots(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ToggleRequest>>,
) -> Json<Value> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mut session = state.session_mut().await;
    let enabled = req
        .enabled
        .unwrap_or(!session.selection().hotspots_enabled);
    let update = session.set_hotspots_enabled(enabled);
    Json(update_view(update, &session))
}

async fn jump_to_hotspot(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult {
    let (tickets, view) = {
        let mut session = state.session_mut().await;
        let tickets = session.jump_to_hotspot(index)?;
        (tickets, json!({ "clock": clock_view(&session), "selection": selection_view(&session) }))
    };
    fetch::dispatch(state.clone(), tickets);
    Ok(Json(view))
}

async fn add_target(State(state): State<Arc<AppState>>, Json(req): Json<TargetRequest>) -> ApiResult {
    let mut session = state.session_mut().await;
    let flight_id = session.add_target(&req.token)?;
    Ok(Json(json!({
        "flight_id": flight_id,
        "targets": session.selection().targets().get(),
    })))
}

async fn add_all_candidates(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut session = state.session_mut().await;
    let changed = session.add_all_candidates();
    Json(json!({
        "changed": changed,
        "targets": session.selection().targets().get(),
    }))
}

async fn remove_target(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let mut session = state.session_mut().await;
    if !session.remove_target(&id) {
        return Err(CoreError::UnknownFlight(id).into());
    }
    Ok(Json(json!({ "targets": session.selection().targets().get() })))
}

async fn clear_targets(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut session = state.session_mut().await;
    let changed = session.clear_targets();
    Json(json!({ "changed": changed }))
}

async fn set_rate(State(state): State<Arc<AppState>>, Json(req): Json<RateRequest>) -> ApiResult {
    let mut session = state.session_mut().await;
    if !session.set_rate(req.rate) {
        return Err(ApiError::BadRequest(format!(
            "rate must be a non-negative number, got {}",
            req.rate
        )));
    }
    Ok(Json(json!({ "rate": session.rate() })))
}

async fn get_occupancy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OccupancyQuery>,
) -> Json<Value> {
    let session = state.session().await;
    let t = session.time();
    let occupancy = session.occupancy();
    let Some(ready) = occupancy.ready() else {
        return Json(json!({
            "traffic_volume_id": session.selected_traffic_volume(),
            "state": occupancy.label(),
            "error": occupancy.error(),
        }));
    };

    let window_s = query
        .window_s
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(session.selection().focus_window_s);
    Json(json!({
        "traffic_volume_id": ready.traffic_volume_id,
        "state": occupancy.label(),
        "bin_minutes": ready.bin_minutes,
        "total_flights": ready.total_flights,
        "current": session.current_occupancy(),
        "marker": ready.nearest_bin_at(t),
        "capacity": ready.capacity_at(t),
        "window": ready.display_window(t, window_s),
        "overloaded": ready.overloaded_bins().count(),
    }))
}

// === Plan ===

async fn list_regulations(State(state): State<Arc<AppState>>) -> Json<Value> {
    let session = state.session().await;
    Json(json!({
        "count": session.plan().len(),
        "regulations": session.plan().regulations(),
    }))
}

async fn commit_regulation(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut session = state.session_mut().await;
    match session.commit_regulation() {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({ "id": id, "regulation": session.plan().get(&id) })),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn replace_regulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<RegulationDraft>,
) -> ApiResult {
    let mut session = state.session_mut().await;
    let new_id = session.replace_regulation(&id, draft)?;
    Ok(Json(json!({ "id": new_id, "regulation": session.plan().get(&new_id) })))
}

async fn remove_regulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let removed = state.session_mut().await.remove_regulation(&id)?;
    Ok(Json(json!({ "removed": removed })))
}

async fn edit_regulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let (draft, tickets, view) = {
        let mut session = state.session_mut().await;
        let (draft, tickets) = session.edit_regulation(&id)?;
        (draft, tickets, selection_view(&session))
    };
    fetch::dispatch(state.clone(), tickets);
    Ok(Json(json!({ "draft": draft, "selection": view })))
}

async fn simulate_plan(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    body: Option<Json<SimulateRequest>>,
) -> ApiResult {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let request = state
        .session()
        .await
        .simulation_request(req.weights, req.top_k)?;
    let client = backend_client(&state, request_id.as_ref().map(|Extension(id)| id));
    let result = fetch::simulate_plan(&state, &client, &request)
        .await
        .map_err(ApiError::Backend)?;
    let rolling_changes: Vec<Value> = result
        .rolling_top_tvs
        .iter()
        .map(|tv| json!({ "traffic_volume_id": tv.traffic_volume_id, "diff": tv.diff() }))
        .collect();
    Ok(Json(json!({
        "request": request,
        "result": result,
        "rolling_changes": rolling_changes,
    })))
}

async fn get_simulation(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.session().await.simulation()))
}

// === Analysis proxies ===

/// Traffic volume and reference time for an analysis query.
async fn analysis_anchor(state: &AppState) -> Result<(String, String), ApiError> {
    let session = state.session().await;
    let tv = session
        .selected_traffic_volume()
        .ok_or(CoreError::NoTrafficVolume)?
        .to_string();
    Ok((tv, format_reference_time(session.time())))
}

async fn get_slack(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    Query(query): Query<SlackQuery>,
) -> ApiResult {
    let (tv, ref_time) = analysis_anchor(&state).await?;
    let client = backend_client(&state, request_id.as_ref().map(|Extension(id)| id));
    let slack = client
        .slack_distribution(&tv, &ref_time, query.sign, query.delta_min)
        .await
        .map_err(ApiError::Backend)?;
    Ok(Json(json!({
        "traffic_volume_id": tv,
        "ref_time_str": ref_time,
        "results": slack.results,
    })))
}

async fn get_flows(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    Query(query): Query<FlowsQuery>,
) -> ApiResult {
    let (tv, ref_time) = analysis_anchor(&state).await?;
    let flight_ids: Vec<String> = state
        .session()
        .await
        .selection()
        .candidates()
        .get()
        .iter()
        .cloned()
        .collect();
    let client = backend_client(&state, request_id.as_ref().map(|Extension(id)| id));
    let flows = client
        .flow_extraction(&FlowQuery {
            traffic_volume_id: tv,
            ref_time_str: ref_time,
            threshold: query.threshold,
            resolution: query.resolution,
            seed: query.seed,
            limit: query.limit,
            flight_ids,
        })
        .await
        .map_err(ApiError::Backend)?;
    Ok(Json(json!(flows)))
}
