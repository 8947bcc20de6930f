//! Argument helpers shared by the probe binaries.

use anyhow::{bail, Result};
use atfm_core::time::parse_clock;

/// Parse a time given as seconds since midnight or `HH:MM[:SS]`.
pub fn parse_time_arg(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<f64>() {
        if seconds.is_finite() && seconds >= 0.0 {
            return Ok(seconds);
        }
        bail!("time must be a non-negative number of seconds, got {}", raw);
    }
    match parse_clock(raw) {
        Some(seconds) => Ok(f64::from(seconds)),
        None => bail!("unrecognised time '{}', expected seconds or HH:MM[:SS]", raw),
    }
}

/// Log to stderr, honouring `RUST_LOG`; warnings only by default.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
