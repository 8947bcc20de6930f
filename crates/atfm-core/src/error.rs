//! Error types for the ATFM core.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid time label '{0}'")]
    InvalidTimeLabel(String),

    #[error("invalid clock bounds: min {min} must not exceed max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("invalid duration preset '{0}'")]
    InvalidPreset(String),

    #[error("unknown flight '{0}'")]
    UnknownFlight(String),

    #[error("no hotspot at index {0}")]
    UnknownHotspot(usize),

    #[error("unknown regulation '{0}'")]
    UnknownRegulation(String),

    #[error("regulation plan is empty")]
    EmptyPlan,

    #[error("no traffic volume selected")]
    NoTrafficVolume,

    #[error("no target flights selected")]
    NoTargetFlights,

    #[error("invalid active window {from}..{to}: must be ordered and span at most one day")]
    InvalidWindow { from: f64, to: f64 },

    #[error("bin width must be positive, got {0}")]
    InvalidBinWidth(f64),
}

pub type CoreResult<T> = Result<T, CoreError>;
