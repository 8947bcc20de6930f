//! Offline playback of a flights file through the simulation clock.

use anyhow::{Context, Result};
use atfm_cli::{init_tracing, parse_time_arg, report};
use atfm_core::{FlightSegment, FlightSet, SimulationClock, WrapMode};
use clap::Parser;

/// Step the clock over a flights file and print interpolated positions
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON array of flight segments
    #[arg(long)]
    flights: String,

    /// Start time (seconds or HH:MM[:SS]); defaults to the first sample
    #[arg(long)]
    start: Option<String>,

    /// Simulated seconds per frame
    #[arg(long, default_value_t = 60.0)]
    step: f64,

    /// Number of frames to print
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// What happens past the last sample: carry or restart
    #[arg(long, default_value = "carry")]
    wrap: WrapMode,

    /// Print every position, not just the count
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.flights)
        .with_context(|| format!("Failed to read flights file {}", args.flights))?;
    let rows: Vec<FlightSegment> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse flights file {}", args.flights))?;
    let flights = FlightSet::from_segments(rows);
    let Some((min, max)) = flights.time_bounds() else {
        println!("No flights with usable samples");
        return Ok(());
    };

    let start = args.start.as_deref().map(parse_time_arg).transpose()?;
    let mut clock = SimulationClock::new(args.wrap);
    clock.set_bounds(min, max, Some(start.unwrap_or(min)))?;
    clock.set_speed(1.0);
    clock.set_playing(true);
    println!(
        "{} flights, {} to {}",
        flights.len(),
        atfm_core::time::format_hhmmss(min),
        atfm_core::time::format_hhmmss(max)
    );

    for frame in 0..args.frames {
        if frame > 0 {
            clock.advance(args.step * 1000.0);
        }
        let t = clock.current_time;
        let positions = flights.positions_at(t);
        println!(
            "[{:3}] {}  {} airborne",
            frame,
            atfm_core::time::format_hhmmss(t),
            positions.len()
        );
        if args.verbose {
            for position in &positions {
                println!("      {}", report::position_line(position));
            }
        }
    }
    Ok(())
}
