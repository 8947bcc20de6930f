//! ATFM CLI - probe tools for the analytics backend and the time engine.
//!
//! Binaries:
//! - occupancy_probe: rolling occupancy for one or more traffic volumes
//! - hotspot_probe: hotspots active at a given time
//! - ranking_probe: ranked arrivals and regulation candidates
//! - replay_flights: offline playback of a flights file

pub mod args;
pub mod report;

pub use args::{init_tracing, parse_time_arg};
