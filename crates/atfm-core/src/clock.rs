//! The session's simulation clock.
//!
//! One clock per session. It is advanced by the tick loop while playing and
//! moved directly by scrubs and jumps.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::settings::WrapMode;
use crate::time::SECONDS_PER_DAY;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    /// Seconds since local midnight
    pub current_time: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub speed: f64,
    pub playing: bool,
    #[serde(default)]
    pub wrap_mode: WrapMode,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            min_time: 0.0,
            max_time: f64::from(SECONDS_PER_DAY),
            speed: 1.0,
            playing: false,
            wrap_mode: WrapMode::Carry,
        }
    }
}

impl SimulationClock {
    pub fn new(wrap_mode: WrapMode) -> Self {
        Self {
            wrap_mode,
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min_time, self.max_time)
    }

    /// Advance by wall-clock `elapsed_ms` scaled by the speed.
    ///
    /// Returns true if the current time moved. Passing the upper bound loops
    /// back to the lower bound according to the wrap mode.
    pub fn advance(&mut self, elapsed_ms: f64) -> bool {
        if !self.playing || !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return false;
        }

        let delta = (elapsed_ms / 1000.0) * self.speed;
        let next = self.current_time + delta;
        self.current_time = if next > self.max_time {
            self.wrapped(next)
        } else {
            next
        };
        true
    }

    fn wrapped(&self, next: f64) -> f64 {
        let span = self.max_time - self.min_time;
        match self.wrap_mode {
            WrapMode::Restart => self.min_time,
            WrapMode::Carry if span > 0.0 => self.min_time + (next - self.max_time) % span,
            WrapMode::Carry => self.min_time,
        }
    }

    /// Set the time directly. Jumps are not clamped to the bounds.
    pub fn set_time(&mut self, t: f64) {
        if t.is_finite() {
            self.current_time = t;
        }
    }

    /// Set the time clamped into `[min_time, max_time]`. Used for scrubbing.
    pub fn seek_clamped(&mut self, t: f64) {
        if t.is_finite() {
            self.current_time = t.clamp(self.min_time, self.max_time);
        }
    }

    /// Establish the playable window, optionally resetting the current time.
    pub fn set_bounds(&mut self, min: f64, max: f64, initial: Option<f64>) -> CoreResult<()> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(CoreError::InvalidBounds { min, max });
        }
        self.min_time = min;
        self.max_time = max;
        if let Some(t) = initial {
            self.set_time(t);
        }
        Ok(())
    }

    /// Only finite, positive speeds are accepted.
    pub fn set_speed(&mut self, speed: f64) -> bool {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
            true
        } else {
            false
        }
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn in_bounds(&self) -> bool {
        self.current_time >= self.min_time && self.current_time <= self.max_time
    }
}
