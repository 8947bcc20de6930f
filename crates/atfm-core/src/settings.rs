//! Engine tunables for the simulation session.

use serde::{Deserialize, Serialize};

/// What happens to the overflow when the clock advances past its upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    /// Loop to the lower bound and keep the overflow (95 + 10 in [0, 100] -> 5).
    #[default]
    Carry,
    /// Loop to the lower bound and drop the overflow.
    Restart,
}

impl std::str::FromStr for WrapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "carry" => Ok(Self::Carry),
            "restart" => Ok(Self::Restart),
            other => Err(format!("unknown wrap mode '{}'", other)),
        }
    }
}

/// Configuration for the time engine and derived selections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub wrap_mode: WrapMode,
    /// Playback multiplier applied when a session starts
    pub default_speed: f64,
    /// Speeds offered by the playback control
    pub speed_options: Vec<f64>,
    /// Focus-mode interest window in seconds
    pub focus_window_s: f64,
    /// Preset used to anchor a fresh regulation active window
    pub default_preset: String,
    /// Bin width used when exporting a plan and the occupancy gives none
    pub default_bin_minutes: f64,
    /// Number of ranked arrivals requested per traffic volume
    pub ranking_top_k: usize,
    /// Flight-level band used to filter the hotspot display
    pub flight_level_band: FlightLevelBand,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            wrap_mode: WrapMode::Carry,
            default_speed: 1.0,
            speed_options: vec![0.5, 1.0, 2.0, 5.0, 10.0],
            focus_window_s: 3600.0,
            default_preset: "1h".into(),
            default_bin_minutes: 60.0,
            ranking_top_k: 50,
            flight_level_band: FlightLevelBand::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightLevelBand {
    pub lower: u32,
    pub upper: u32,
}

impl Default for FlightLevelBand {
    fn default() -> Self {
        Self { lower: 0, upper: 500 }
    }
}

impl FlightLevelBand {
    /// Whether `[min_fl, max_fl]` overlaps this band.
    pub fn overlaps(&self, min_fl: u32, max_fl: u32) -> bool {
        min_fl <= self.upper && max_fl >= self.lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_mode_parses_case_insensitively() {
        assert_eq!("Carry".parse::<WrapMode>(), Ok(WrapMode::Carry));
        assert_eq!("restart".parse::<WrapMode>(), Ok(WrapMode::Restart));
        assert!("clamp".parse::<WrapMode>().is_err());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"wrap_mode":"restart","ranking_top_k":10}"#).unwrap();
        assert_eq!(settings.wrap_mode, WrapMode::Restart);
        assert_eq!(settings.ranking_top_k, 10);
        assert_eq!(settings.focus_window_s, 3600.0);
    }

    #[test]
    fn band_overlap_is_inclusive() {
        let band = FlightLevelBand { lower: 200, upper: 300 };
        assert!(band.overlaps(300, 400));
        assert!(band.overlaps(100, 200));
        assert!(!band.overlaps(310, 400));
    }
}
