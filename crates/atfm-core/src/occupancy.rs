//! Rolling one-hour occupancy built from discrete time-bin counts.
//!
//! The rolling value of a bin is the sum of the counts of the `bins_per_hour`
//! bins starting at it. The window looks forward and stops at the end of the
//! series; it never wraps into bins that were not fetched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::OccupancySnapshot;
use crate::time::{hour_label, TimeBin, SECONDS_PER_DAY, SECONDS_PER_HOUR};

const DEFAULT_BIN_MINUTES: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingBin {
    pub label: String,
    #[serde(skip)]
    pub bin: Option<TimeBin>,
    /// Entrances in this bin alone
    pub count: u32,
    /// Entrances in the hour starting at this bin
    pub rolling_count: u32,
    /// Capacity of the hour containing the bin start
    pub capacity: Option<f64>,
}

impl RollingBin {
    pub fn start_s(&self) -> f64 {
        self.bin.map_or(0.0, |b| f64::from(b.start_s))
    }

    pub fn is_overloaded(&self) -> bool {
        self.capacity
            .is_some_and(|cap| f64::from(self.rolling_count) > cap)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollingOccupancy {
    pub traffic_volume_id: String,
    pub bin_minutes: f64,
    pub bins_per_hour: usize,
    pub bins: Vec<RollingBin>,
    pub hourly_capacity: BTreeMap<String, f64>,
    pub total_flights: Option<u32>,
}

impl RollingOccupancy {
    /// Aggregate `(label, count)` pairs.
    ///
    /// The bin width is `bin_minutes` when positive, else the span of the
    /// earliest bin, else one hour. Malformed labels are skipped.
    pub fn from_counts<I, S>(
        counts: I,
        hourly_capacity: BTreeMap<String, f64>,
        bin_minutes: Option<f64>,
    ) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut parsed: Vec<(String, TimeBin, u32)> = Vec::new();
        for (label, count) in counts {
            let label = label.as_ref();
            match TimeBin::parse(label) {
                Some(bin) => parsed.push((label.to_string(), bin, count)),
                None => warn!("Skipping malformed occupancy bin '{}'", label),
            }
        }
        parsed.sort_by_key(|(_, bin, _)| bin.start_s);

        let bin_minutes = bin_minutes
            .filter(|m| m.is_finite() && *m > 0.0)
            .or_else(|| parsed.first().map(|(_, bin, _)| bin.width_minutes().max(1.0)))
            .unwrap_or(DEFAULT_BIN_MINUTES);
        let bins_per_hour = ((60.0 / bin_minutes).round() as usize).max(1);

        let raw: Vec<u32> = parsed.iter().map(|(_, _, c)| *c).collect();
        let rolling = rolling_sums(&raw, bins_per_hour);

        let bins = parsed
            .into_iter()
            .zip(rolling)
            .map(|((label, bin, count), rolling_count)| RollingBin {
                capacity: hourly_capacity.get(&hour_label(bin.hour())).copied(),
                label,
                bin: Some(bin),
                count,
                rolling_count,
            })
            .collect::<Vec<_>>();

        debug!(
            "Rolling occupancy: {} bins, {} min wide, {} per hour",
            bins.len(),
            bin_minutes,
            bins_per_hour
        );

        Self {
            traffic_volume_id: String::new(),
            bin_minutes,
            bins_per_hour,
            bins,
            hourly_capacity,
            total_flights: None,
        }
    }

    pub fn from_snapshot(snapshot: &OccupancySnapshot) -> Self {
        let mut occupancy = Self::from_counts(
            snapshot
                .occupancy_counts
                .iter()
                .map(|(label, count)| (label.as_str(), *count)),
            snapshot.hourly_capacity.clone(),
            snapshot.metadata.time_bin_minutes,
        );
        occupancy.traffic_volume_id = snapshot.traffic_volume_id.clone();
        occupancy.total_flights = snapshot.metadata.total_flights_in_tv;
        occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn rolling_counts(&self) -> Vec<u32> {
        self.bins.iter().map(|b| b.rolling_count).collect()
    }

    /// The bin covering `t` (midnight-aware), else the clamped-forward bin.
    pub fn current_value_at(&self, t: f64) -> Option<&RollingBin> {
        self.bins
            .iter()
            .find(|b| b.bin.is_some_and(|bin| bin.contains(t)))
            .or_else(|| self.nearest_bin_at(t))
    }

    /// First bin starting at or after `t`, else the last bin.
    pub fn nearest_bin_at(&self, t: f64) -> Option<&RollingBin> {
        self.bins
            .iter()
            .find(|b| b.start_s() >= t)
            .or_else(|| self.bins.last())
    }

    /// Capacity of the hour containing `t`.
    pub fn capacity_at(&self, t: f64) -> Option<f64> {
        if !t.is_finite() {
            return None;
        }
        let tod = t.rem_euclid(f64::from(SECONDS_PER_DAY));
        let hour = (tod / f64::from(SECONDS_PER_HOUR)).floor() as u32;
        self.hourly_capacity.get(&hour_label(hour)).copied()
    }

    /// Bins starting within `window_s` either side of `t`.
    pub fn display_window(&self, t: f64, window_s: f64) -> Vec<&RollingBin> {
        let (lo, hi) = (t - window_s, t + window_s);
        self.bins
            .iter()
            .filter(|b| {
                let start = b.start_s();
                start >= lo && start <= hi
            })
            .collect()
    }

    pub fn overloaded_bins(&self) -> impl Iterator<Item = &RollingBin> {
        self.bins.iter().filter(|b| b.is_overloaded())
    }
}

/// Forward rolling sums: `out[i] = sum(counts[i..min(i + width, len)])`.
pub fn rolling_sums(counts: &[u32], width: usize) -> Vec<u32> {
    let width = width.max(1);
    (0..counts.len())
        .map(|i| {
            let end = (i + width).min(counts.len());
            counts[i..end].iter().fold(0u32, |acc, &c| acc.saturating_add(c))
        })
        .collect()
}
