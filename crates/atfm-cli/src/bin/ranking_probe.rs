//! Show ranked arrivals at a traffic volume and which fall in a regulation window.

use anyhow::{bail, Result};
use atfm_backend::AnalyticsClient;
use atfm_cli::{init_tracing, parse_time_arg, report};
use atfm_core::models::{ActiveWindow, RankingQuery};
use atfm_core::time::{format_reference_time, parse_duration_preset};
use atfm_core::{regulation_candidates, ArrivalSource};
use clap::Parser;

/// Query the ordered-arrivals ranking anchored at a reference time
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Analytics backend URL
    #[arg(long, default_value = "http://localhost:8000", env = "ATFM_BACKEND_URL")]
    url: String,

    /// Bearer token for the backend
    #[arg(long, default_value = "", env = "ATFM_BACKEND_TOKEN")]
    token: String,

    /// Traffic volume id
    #[arg(long)]
    tv: String,

    /// Reference time (seconds or HH:MM[:SS])
    #[arg(long)]
    at: String,

    /// Regulation window length, e.g. 45, 1h, 1h30
    #[arg(long, default_value = "1h")]
    duration: String,

    /// Seed flight ids, comma separated
    #[arg(long, value_delimiter = ',')]
    seeds: Vec<String>,

    /// Number of ranked flights to request
    #[arg(long, default_value_t = 50)]
    top_k: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let t = parse_time_arg(&args.at)?;
    let duration_s = parse_duration_preset(&args.duration);
    if duration_s == 0 {
        bail!("unrecognised duration '{}'", args.duration);
    }
    let window = ActiveWindow::anchored(t, duration_s);

    let query = RankingQuery {
        traffic_volume_id: args.tv.clone(),
        ref_time_str: format_reference_time(t),
        seed_flight_ids: args.seeds,
        duration_min: Some(duration_s / 60),
        top_k: Some(args.top_k),
    };
    let client = AnalyticsClient::new(&args.url, &args.token)?;
    let ranked = client.ranked_arrivals(&query).await?;

    let arrivals = ArrivalSource::from_ranked(&ranked).arrival_times();
    let candidates = regulation_candidates(window, &arrivals);
    println!(
        "{} at {}: {} ranked, {} with arrival times, {} in window",
        args.tv,
        query.ref_time_str,
        ranked.ordered_flights.len(),
        arrivals.len(),
        candidates.len()
    );
    for line in report::arrival_lines(&arrivals, window) {
        println!("{}", line);
    }
    Ok(())
}
