use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::{api, config::Config, state::AppState};
use atfm_backend::AnalyticsClient;
use atfm_core::{FlightSet, Trajectory, TrajectorySample};

fn sample(lon: f64, lat: f64, time_s: f64) -> TrajectorySample {
    TrajectorySample {
        lon,
        lat,
        altitude_ft: Some(30_000.0),
        time_s,
    }
}

fn flights() -> FlightSet {
    FlightSet::new(vec![
        Trajectory::new("F1", vec![sample(2.0, 48.0, 21_600.0), sample(3.0, 48.0, 25_200.0)])
            .with_call_sign("AFR12"),
        Trajectory::new("F2", vec![sample(2.0, 49.0, 22_000.0), sample(2.5, 49.5, 24_000.0)])
            .with_call_sign("BAW34"),
    ])
}

/// Analytics backend stand-in serving one traffic volume.
fn mock_backend() -> Router {
    Router::new()
        .route(
            "/tv_count_with_capacity",
            get(|| async {
                Json(json!({
                    "traffic_volume_id": "TV1",
                    "occupancy_counts": {
                        "06:00-06:15": 4,
                        "06:15-06:30": 6,
                        "06:30-06:45": 2,
                        "06:45-07:00": 3
                    },
                    "hourly_capacity": { "06:00-07:00": 12 },
                    "metadata": { "time_bin_minutes": 15 }
                }))
            }),
        )
        .route(
            "/regulation_ranking_tv_flights_ordered",
            get(|| async {
                Json(json!({
                    "traffic_volume_id": "TV1",
                    "ordered_flights": ["F1", "F2"],
                    "details": [
                        {"flight_id": "F1", "arrival_seconds": 22500.0},
                        {"flight_id": "F2", "arrival_seconds": 23000.0}
                    ]
                }))
            }),
        )
        .route(
            "/regulation_plan_simulation",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["regulations"][0]["location"], "TV1");
                Json(json!({
                    "delays_by_flight": {"F1": 300.0},
                    "delay_stats": {"total_delay_seconds": 300.0, "num_flights": 1}
                }))
            }),
        )
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn setup_app(backend_url: &str) -> (Router, Arc<AppState>) {
    let mut config = Config::from_env();
    config.backend_url = backend_url.to_string();
    config.backend_token = String::new();
    let client = AnalyticsClient::new(config.backend_url.clone(), "").unwrap();
    let state = Arc::new(AppState::with_client(config, client));
    state
        .session_mut()
        .await
        .load_flights(flights())
        .expect("load flights");

    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn offline_app() -> (Router, Arc<AppState>) {
    setup_app("http://127.0.0.1:9").await
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

/// Poll the selection until both traffic volume fetches have landed.
async fn wait_for_data(app: &Router) -> Value {
    for _ in 0..100 {
        let (_, selection) = call(app, "GET", "/v1/selection", None).await;
        if selection["arrivals"] != "loading" && selection["occupancy"] != "loading" {
            return selection;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("traffic volume data never arrived");
}

#[tokio::test]
async fn seek_clamps_but_time_jump_does_not() {
    let (app, _state) = offline_app().await;

    let (status, clock) = call(&app, "GET", "/v1/clock", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clock["min_time"], 21_600.0);
    assert_eq!(clock["max_time"], 25_200.0);
    assert_eq!(clock["time"], "06:00:00");

    let (_, clock) = call(&app, "POST", "/v1/clock/seek", Some(json!({"time_s": 90_000.0}))).await;
    assert_eq!(clock["time_s"], 25_200.0);

    let (_, clock) = call(&app, "POST", "/v1/clock/time", Some(json!({"clock": "23:00"}))).await;
    assert_eq!(clock["time_s"], 82_800.0);

    let (status, _) = call(&app, "POST", "/v1/clock/seek", Some(json!({"clock": "nope"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn speed_and_playback() {
    let (app, _state) = offline_app().await;

    let (status, _) = call(&app, "POST", "/v1/clock/speed", Some(json!({"speed": 0.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, clock) = call(&app, "POST", "/v1/clock/speed", Some(json!({"speed": 5.0}))).await;
    assert_eq!(clock["speed"], 5.0);

    let (_, clock) = call(&app, "POST", "/v1/clock/play", None).await;
    assert_eq!(clock["playing"], true);
    let (_, clock) = call(&app, "POST", "/v1/clock/pause", None).await;
    assert_eq!(clock["playing"], false);
}

#[tokio::test]
async fn positions_follow_the_clock() {
    let (app, _state) = offline_app().await;

    let (_, positions) = call(&app, "GET", "/v1/positions", None).await;
    assert_eq!(positions["count"], 1);
    assert_eq!(positions["positions"][0]["flight_id"], "F1");

    call(&app, "POST", "/v1/clock/seek", Some(json!({"clock": "06:30"}))).await;
    let (_, positions) = call(&app, "GET", "/v1/positions", None).await;
    assert_eq!(positions["count"], 2);

    let (status, clock) = call(&app, "POST", "/v1/flights/baw34/jump", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clock["time_s"], 22_000.0);

    let (status, _) = call(&app, "POST", "/v1/flights/XYZ/jump", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn flight_search_matches_callsigns() {
    let (app, _state) = offline_app().await;
    let (_, found) = call(&app, "GET", "/v1/flights/search?q=afr", None).await;
    assert_eq!(found["count"], 1);
    assert_eq!(found["flights"][0]["flight_id"], "F1");
}

#[tokio::test]
async fn window_and_targets_validation() {
    let (app, _state) = offline_app().await;

    let (status, _) = call(&app, "POST", "/v1/window/preset", Some(json!({"preset": "soon"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, selection) =
        call(&app, "POST", "/v1/window/preset", Some(json!({"preset": "1h30"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(selection["active_window"]["from"], 21_600.0);
    assert_eq!(selection["active_window"]["to"], 27_000.0);

    let (status, added) = call(&app, "POST", "/v1/targets", Some(json!({"token": "afr12"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added["flight_id"], "F1");

    let (status, _) = call(&app, "POST", "/v1/targets", Some(json!({"token": "ZZZ"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "DELETE", "/v1/targets/F1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "DELETE", "/v1/targets/F1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", "/v1/rate", Some(json!({"rate": -1.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "POST", "/v1/window", Some(json!({"from": 0.0, "to": 1e12}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/v1/window", Some(json!({"from": 100.0, "to": 50.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn commit_without_traffic_volume_fails() {
    let (app, _state) = offline_app().await;
    let (status, body) = call(&app, "POST", "/v1/regulations", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("traffic volume"));

    let (status, _) = call(&app, "POST", "/v1/plan/simulate", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "DELETE", "/v1/regulations/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_backend_marks_data_failed() {
    let (app, _state) = offline_app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/v1/traffic-volume",
        Some(json!({"traffic_volume_id": "TV1"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["selection"]["focus_enabled"], true);

    let selection = wait_for_data(&app).await;
    assert_eq!(selection["arrivals"], "failed");
    assert_eq!(selection["occupancy"], "failed");
    assert_eq!(selection["focus"]["flight_ids"], json!([]));
    assert_eq!(selection["candidates"]["flight_ids"], json!([]));
}

#[tokio::test]
async fn regulation_round_trip_against_backend() {
    let backend = serve(mock_backend()).await;
    let (app, state) = setup_app(&backend).await;

    let (status, _) = call(
        &app,
        "POST",
        "/v1/traffic-volume",
        Some(json!({"traffic_volume_id": "TV1"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let selection = wait_for_data(&app).await;
    assert_eq!(selection["arrivals"], "ready");
    assert_eq!(selection["candidates"]["flight_ids"], json!(["F1", "F2"]));

    let (_, occupancy) = call(&app, "GET", "/v1/occupancy", None).await;
    assert_eq!(occupancy["state"], "ready");
    assert_eq!(occupancy["current"]["label"], "06:00-06:15");
    assert_eq!(occupancy["current"]["rolling_count"], 15);
    assert_eq!(occupancy["capacity"], 12.0);
    assert_eq!(state.occupancy_cache_len(), 1);
    assert_eq!(state.session().await.rate(), Some(12.0));

    let (_, targets) = call(&app, "POST", "/v1/targets/candidates", None).await;
    assert_eq!(targets["targets"], json!(["F1", "F2"]));

    let (status, created) = call(&app, "POST", "/v1/regulations", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["regulation"]["flight_tokens"], json!(["AFR12", "BAW34"]));

    let (_, selection) = call(&app, "GET", "/v1/selection", None).await;
    assert_eq!(selection["targets"]["flight_ids"], json!([]));

    let (status, simulated) = call(&app, "POST", "/v1/plan/simulate", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(simulated["request"]["regulations"][0]["time_windows"], json!([24, 25, 26, 27]));
    assert_eq!(simulated["result"]["delay_stats"]["total_delay_seconds"], 300.0);

    let (_, stored) = call(&app, "GET", "/v1/plan/simulation", None).await;
    assert_eq!(stored["state"], "ready");

    let (status, _) = call(&app, "DELETE", &format!("/v1/regulations/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = call(&app, "GET", "/v1/regulations", None).await;
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn edit_restores_regulation_into_selection() {
    let backend = serve(mock_backend()).await;
    let (app, _state) = setup_app(&backend).await;

    call(&app, "POST", "/v1/traffic-volume", Some(json!({"traffic_volume_id": "TV1"}))).await;
    wait_for_data(&app).await;
    call(&app, "POST", "/v1/targets", Some(json!({"token": "F2"}))).await;
    call(&app, "POST", "/v1/rate", Some(json!({"rate": 8.0}))).await;
    let (_, created) = call(&app, "POST", "/v1/regulations", None).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, edited) = call(&app, "POST", &format!("/v1/regulations/{}/edit", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["draft"]["target_flight_ids"], json!(["F2"]));
    assert_eq!(edited["selection"]["editing"], true);
    assert_eq!(edited["selection"]["rate"], 8.0);
    assert_eq!(edited["selection"]["targets"]["flight_ids"], json!(["F2"]));

    let (_, listed) = call(&app, "GET", "/v1/regulations", None).await;
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let (app, _state) = offline_app().await;
    let request = Request::builder()
        .uri("/v1/clock")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "trace-me"
    );

    let request = Request::builder().uri("/v1/clock").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().get("x-request-id").is_some());
}
