//! Print rolling-hour occupancy for one or more traffic volumes.

use anyhow::Result;
use atfm_backend::AnalyticsClient;
use atfm_cli::{init_tracing, parse_time_arg, report};
use atfm_core::RollingOccupancy;
use clap::Parser;
use futures::future::try_join_all;
use tracing::debug;

/// Fetch occupancy counts and show the rolling-hour aggregation
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Analytics backend URL
    #[arg(long, default_value = "http://localhost:8000", env = "ATFM_BACKEND_URL")]
    url: String,

    /// Bearer token for the backend
    #[arg(long, default_value = "", env = "ATFM_BACKEND_TOKEN")]
    token: String,

    /// Traffic volume id; repeat for several
    #[arg(long = "tv", required = true)]
    traffic_volumes: Vec<String>,

    /// Mark the bin covering this time (seconds or HH:MM[:SS])
    #[arg(long)]
    at: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let at = args.at.as_deref().map(parse_time_arg).transpose()?;

    let client = AnalyticsClient::new(&args.url, &args.token)?;
    debug!("Fetching occupancy for {:?} from {}", args.traffic_volumes, client.base_url());
    let snapshots = try_join_all(args.traffic_volumes.iter().map(|tv| client.occupancy(tv))).await?;

    for snapshot in &snapshots {
        let occupancy = RollingOccupancy::from_snapshot(snapshot);
        for line in report::occupancy_lines(&occupancy, at) {
            println!("{}", line);
        }
        if let Some(t) = at {
            match occupancy.current_value_at(t) {
                Some(bin) => println!(
                    "  at {}: rolling {} / capacity {}",
                    atfm_core::time::format_hhmmss(t),
                    bin.rolling_count,
                    occupancy
                        .capacity_at(t)
                        .map_or_else(|| "-".to_string(), |c| format!("{:.0}", c))
                ),
                None => println!("  no bins"),
            }
        }
        println!();
    }
    Ok(())
}
