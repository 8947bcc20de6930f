//! Time-of-day labels used by segment data, occupancy bins and the backend.
//!
//! All times are seconds since local midnight. Bin labels look like
//! `"HH:MM-HH:MM"` and may wrap past midnight (`"23:30-00:15"`).

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

pub const SECONDS_PER_DAY: u32 = 86_400;
pub const SECONDS_PER_HOUR: u32 = 3_600;

/// Duration presets offered for the regulation active window, in minutes.
pub const DURATION_PRESETS: [(&str, u32); 12] = [
    ("15", 15),
    ("30", 30),
    ("45", 45),
    ("1h", 60),
    ("1h15", 75),
    ("1h30", 90),
    ("1h45", 105),
    ("2h", 120),
    ("2h30", 150),
    ("3h", 180),
    ("3h30", 210),
    ("4h", 240),
];

/// Parse a compact `HMMSS` time as found in segment rows.
///
/// The last two digits are seconds, the two before are minutes and whatever
/// remains is hours: `"754"` is 00:07:54 and `"50007"` is 05:00:07.
pub fn parse_compact_hms(raw: &str) -> Option<u32> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let len = digits.len();
    let sec_start = len.saturating_sub(2);
    let min_start = len.saturating_sub(4);

    let field = |s: &str| -> Option<u32> {
        if s.is_empty() {
            Some(0)
        } else {
            s.parse().ok()
        }
    };

    let secs = field(&digits[sec_start..])?;
    let mins = field(&digits[min_start..sec_start])?;
    let hours = field(&digits[..min_start])?;
    hours
        .checked_mul(SECONDS_PER_HOUR)?
        .checked_add(mins * 60)?
        .checked_add(secs)
}

/// Parse `"HH:MM"` or `"HH:MM:SS"` into seconds of day.
///
/// `"24:00"` is accepted so that a bin can end at midnight.
pub fn parse_clock(raw: &str) -> Option<u32> {
    let mut parts = raw.trim().split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = parts.next()?.trim().parse().ok()?;
    let seconds: u32 = match parts.next() {
        Some(s) => s.trim().parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 || hours > 24 {
        return None;
    }
    if hours == 24 && (minutes > 0 || seconds > 0) {
        return None;
    }
    Some(hours * SECONDS_PER_HOUR + minutes * 60 + seconds)
}

/// A fixed-width interval of the day, `[start_s, end_s)`.
///
/// `end_s` is normalized so that it is always greater than `start_s`; a label
/// whose end precedes its start spans midnight and gets `+24h` on the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBin {
    pub start_s: u32,
    pub end_s: u32,
}

impl TimeBin {
    pub fn new(start_s: u32, end_s: u32) -> Option<Self> {
        let end_s = if end_s < start_s {
            end_s + SECONDS_PER_DAY
        } else {
            end_s
        };
        if end_s == start_s {
            return None;
        }
        Some(Self { start_s, end_s })
    }

    /// Parse a `"HH:MM-HH:MM"` label. Malformed labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        let (start, end) = label.split_once('-')?;
        Self::new(parse_clock(start)?, parse_clock(end)?)
    }

    pub fn width_s(&self) -> u32 {
        self.end_s - self.start_s
    }

    pub fn width_minutes(&self) -> f64 {
        f64::from(self.width_s()) / 60.0
    }

    /// Start of the bin in fractional hours (06:15 -> 6.25).
    pub fn start_hour(&self) -> f64 {
        f64::from(self.start_s) / f64::from(SECONDS_PER_HOUR)
    }

    /// Whole hour containing the bin start.
    pub fn hour(&self) -> u32 {
        self.start_s / SECONDS_PER_HOUR
    }

    /// Whether the time-of-day of `t` falls in this bin, midnight-wrap aware.
    pub fn contains(&self, t: f64) -> bool {
        if !t.is_finite() {
            return false;
        }
        let day = f64::from(SECONDS_PER_DAY);
        let tod = t.rem_euclid(day);
        let start = f64::from(self.start_s);
        let end = f64::from(self.end_s);
        (tod >= start && tod < end) || (tod + day >= start && tod + day < end)
    }

    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            format_hhmm(f64::from(self.start_s)),
            format_hhmm(f64::from(self.end_s))
        )
    }
}

impl FromStr for TimeBin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::InvalidTimeLabel(s.to_string()))
    }
}

impl fmt::Display for TimeBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Capacity key for the hour starting at `hour`: `"06:00-07:00"`.
pub fn hour_label(hour: u32) -> String {
    format!("{:02}:00-{:02}:00", hour, hour + 1)
}

/// Format seconds of day as `HH:MM` (hours wrap at 24).
pub fn format_hhmm(seconds: f64) -> String {
    let s = whole_seconds(seconds);
    let h = (s / SECONDS_PER_HOUR) % 24;
    let m = (s % SECONDS_PER_HOUR) / 60;
    format!("{:02}:{:02}", h, m)
}

/// Format seconds of day as `HH:MM:SS` (hours are not wrapped).
pub fn format_hhmmss(seconds: f64) -> String {
    let s = whole_seconds(seconds);
    format!(
        "{:02}:{:02}:{:02}",
        s / SECONDS_PER_HOUR,
        (s % SECONDS_PER_HOUR) / 60,
        s % 60
    )
}

/// Compact `HHMMSS` reference time expected by the analytics backend.
pub fn format_reference_time(seconds: f64) -> String {
    let s = whole_seconds(seconds);
    format!(
        "{:02}{:02}{:02}",
        s / SECONDS_PER_HOUR,
        (s % SECONDS_PER_HOUR) / 60,
        s % 60
    )
}

fn whole_seconds(seconds: f64) -> u32 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Parse a duration preset (`"45"`, `"1h"`, `"1h30"`) into seconds.
///
/// Anything unparseable counts as zero.
pub fn parse_duration_preset(preset: &str) -> u32 {
    let s = preset.trim().to_ascii_lowercase();
    let leading = |part: &str| -> u32 {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap_or(0)
    };
    match s.split_once('h') {
        Some((hours, minutes)) => (leading(hours) * 60 + leading(minutes)) * 60,
        None => leading(&s) * 60,
    }
}

/// Preset label matching a window length, or the nearest preset.
pub fn preset_for_window(from_s: f64, to_s: f64) -> &'static str {
    let minutes = ((to_s - from_s) / 60.0).round().max(0.0);
    let mut best = DURATION_PRESETS[0];
    let mut best_diff = f64::MAX;
    for preset in DURATION_PRESETS {
        let diff = (minutes - f64::from(preset.1)).abs();
        if diff < best_diff {
            best = preset;
            best_diff = diff;
        }
    }
    best.0
}
