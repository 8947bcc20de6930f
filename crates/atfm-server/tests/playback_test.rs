//! Playback integration tests against a running session server.
//!
//! Run with: cargo test --test playback_test -- --ignored
//! Requires a running atfm-server with flights loaded.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

fn base_url() -> String {
    std::env::var("ATFM_TEST_URL").unwrap_or_else(|_| "http://localhost:3100".to_string())
}

async fn get_json(client: &Client, path: &str) -> Value {
    client
        .get(format!("{}{}", base_url(), path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn post_json(client: &Client, path: &str, body: Value) -> Value {
    client
        .post(format!("{}{}", base_url(), path))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// The tick loop advances the clock while playing and stops when paused.
#[tokio::test]
#[ignore]
async fn test_clock_advances_while_playing() {
    let client = Client::new();

    let clock = get_json(&client, "/v1/clock").await;
    let min = clock["min_time"].as_f64().unwrap();
    post_json(&client, "/v1/clock/seek", json!({ "time_s": min })).await;
    post_json(&client, "/v1/clock/speed", json!({ "speed": 10.0 })).await;
    post_json(&client, "/v1/clock/play", json!({})).await;

    sleep(Duration::from_millis(500)).await;
    let paused = post_json(&client, "/v1/clock/pause", json!({})).await;
    let t = paused["time_s"].as_f64().unwrap();
    assert!(t > min, "clock did not advance: {} <= {}", t, min);

    sleep(Duration::from_millis(200)).await;
    let still = get_json(&client, "/v1/clock").await;
    assert_eq!(still["time_s"].as_f64().unwrap(), t);
}

/// Positions reported by the server are all inside their flights' bounds.
#[tokio::test]
#[ignore]
async fn test_positions_are_reported_for_active_flights() {
    let client = Client::new();
    let clock = get_json(&client, "/v1/clock").await;
    let mid = (clock["min_time"].as_f64().unwrap() + clock["max_time"].as_f64().unwrap()) / 2.0;
    post_json(&client, "/v1/clock/seek", json!({ "time_s": mid })).await;

    let positions = get_json(&client, "/v1/positions").await;
    let selection = get_json(&client, "/v1/selection").await;
    assert_eq!(
        positions["count"].as_u64().unwrap(),
        selection["active_flights"]["count"].as_u64().unwrap()
    );
    for p in positions["positions"].as_array().unwrap() {
        let heading = p["heading_deg"].as_f64().unwrap();
        assert!((0.0..360.0).contains(&heading));
    }
}
