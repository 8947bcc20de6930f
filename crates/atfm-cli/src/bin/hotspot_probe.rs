//! List hotspots active at a given time, filtered by flight-level band.

use std::collections::HashMap;

use anyhow::{Context, Result};
use atfm_backend::AnalyticsClient;
use atfm_cli::{init_tracing, parse_time_arg, report};
use atfm_core::{active_hotspots, FlightLevelBand, SectorInfo};
use clap::Parser;
use tracing::debug;

/// Show hotspots whose time bin covers the given time
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Analytics backend URL
    #[arg(long, default_value = "http://localhost:8000", env = "ATFM_BACKEND_URL")]
    url: String,

    /// Bearer token for the backend
    #[arg(long, default_value = "", env = "ATFM_BACKEND_TOKEN")]
    token: String,

    /// Minimum hotspot score
    #[arg(long, default_value_t = 0.0)]
    threshold: f64,

    /// Time of interest (seconds or HH:MM[:SS]); all hotspots when omitted
    #[arg(long)]
    at: Option<String>,

    /// Lower flight level of the display band
    #[arg(long, default_value_t = 0)]
    lower: u32,

    /// Upper flight level of the display band
    #[arg(long, default_value_t = 500)]
    upper: u32,

    /// JSON file of sector metadata used for the band filter
    #[arg(long)]
    sectors: Option<String>,
}

fn read_sectors(path: &str) -> Result<HashMap<String, SectorInfo>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sectors file {}", path))?;
    let sectors: Vec<SectorInfo> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse sectors file {}", path))?;
    Ok(sectors
        .into_iter()
        .map(|s| (s.traffic_volume_id.clone(), s))
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let at = args.at.as_deref().map(parse_time_arg).transpose()?;
    let sectors = match args.sectors.as_deref() {
        Some(path) => read_sectors(path)?,
        None => HashMap::new(),
    };
    debug!("{} sectors loaded for the flight-level filter", sectors.len());
    let band = FlightLevelBand {
        lower: args.lower,
        upper: args.upper,
    };

    let client = AnalyticsClient::new(&args.url, &args.token)?;
    let response = client.hotspots(args.threshold).await?;
    println!("{} hotspots above {}", response.count, args.threshold);

    let shown = match at {
        Some(t) => {
            let active = active_hotspots(t, &response.hotspots, &sectors, band);
            println!(
                "{} active at {}",
                active.len(),
                atfm_core::time::format_hhmmss(t)
            );
            active
        }
        None => response.hotspots,
    };
    for hotspot in &shown {
        println!("{}", report::hotspot_line(hotspot));
    }
    Ok(())
}
