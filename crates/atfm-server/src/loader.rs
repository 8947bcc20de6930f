//! Start-up data files.

use std::path::Path;

use anyhow::{Context, Result};
use atfm_core::{FlightSegment, FlightSet, SectorInfo};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::state::AppState;

async fn read_json_rows<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {} file {}", what, path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} file {}", what, path.display()))
}

/// Flights from a JSON array of source segments.
pub async fn load_flights(path: impl AsRef<Path>) -> Result<FlightSet> {
    let rows: Vec<FlightSegment> = read_json_rows(path.as_ref(), "flights").await?;
    Ok(FlightSet::from_segments(rows))
}

pub async fn load_sectors(path: impl AsRef<Path>) -> Result<Vec<SectorInfo>> {
    read_json_rows(path.as_ref(), "sectors").await
}

/// Load the configured data files into the session.
pub async fn load_configured(state: &AppState, config: &Config) -> Result<()> {
    if let Some(path) = config.flights_path.as_deref() {
        let flights = load_flights(path).await?;
        state.session_mut().await.load_flights(flights)?;
    } else {
        tracing::info!("ATFM_FLIGHTS_PATH not set; starting without flights");
    }

    if let Some(path) = config.sectors_path.as_deref() {
        let sectors = load_sectors(path).await?;
        tracing::info!("Loaded {} sectors", sectors.len());
        state.session_mut().await.load_sectors(sectors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flights_file_builds_trajectories() {
        let path = std::env::temp_dir().join(format!("atfm-flights-{}.json", uuid::Uuid::new_v4()));
        let rows = serde_json::json!([
            {
                "flight_identifier": "F1",
                "call_sign": "AFR12",
                "time_begin_segment": 60000,
                "time_end_segment": "61000",
                "latitude_begin": 48.0,
                "longitude_begin": 2.0,
                "latitude_end": 48.5,
                "longitude_end": 2.5,
                "flight_level_begin": 100,
                "flight_level_end": 200,
                "sequence": 1
            }
        ]);
        tokio::fs::write(&path, rows.to_string()).await.unwrap();

        let flights = load_flights(&path).await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(flights.len(), 1);
        assert_eq!(flights.time_bounds(), Some((21_600.0, 22_200.0)));
        assert!(flights.find_by_token("afr12").is_some());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = load_sectors("/nonexistent/sectors.json").await.unwrap_err();
        assert!(err.to_string().contains("sectors"));
    }
}
