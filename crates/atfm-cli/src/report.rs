//! Plain-text renderings of engine outputs.

use atfm_core::models::{ActiveWindow, AircraftPosition, Hotspot};
use atfm_core::time::format_hhmmss;
use atfm_core::RollingOccupancy;

/// One line per rolling bin. The bin covering `at` is marked with `>` and
/// overloaded bins with `!`.
pub fn occupancy_lines(occupancy: &RollingOccupancy, at: Option<f64>) -> Vec<String> {
    let current = at
        .and_then(|t| occupancy.current_value_at(t))
        .map(|bin| bin.label.clone());

    let mut lines = vec![format!(
        "{}: {} bins of {} min, {} flights",
        occupancy.traffic_volume_id,
        occupancy.bins.len(),
        occupancy.bin_minutes,
        occupancy
            .total_flights
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
    )];

    for bin in &occupancy.bins {
        let marker = if current.as_deref() == Some(bin.label.as_str()) { '>' } else { ' ' };
        let capacity = bin
            .capacity
            .map_or_else(|| "-".to_string(), |c| format!("{:.0}", c));
        lines.push(format!(
            "{} {}  count {:>4}  rolling {:>4}  capacity {:>4}{}",
            marker,
            bin.label,
            bin.count,
            bin.rolling_count,
            capacity,
            if bin.is_overloaded() { " !" } else { "" }
        ));
    }
    lines
}

pub fn hotspot_line(hotspot: &Hotspot) -> String {
    format!(
        "{:<12} {}  z_max {:>6.2}  occupancy {:>5.0}/{:<5.0}{}",
        hotspot.traffic_volume_id,
        hotspot.time_bin,
        hotspot.z_max,
        hotspot.hourly_occupancy,
        hotspot.hourly_capacity,
        if hotspot.is_overloaded { "  overloaded" } else { "" }
    )
}

/// Arrivals in time order; those inside `window` are marked with `*`.
pub fn arrival_lines(arrivals: &[(String, f64)], window: ActiveWindow) -> Vec<String> {
    let mut sorted: Vec<&(String, f64)> = arrivals.iter().collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    sorted
        .into_iter()
        .map(|(id, t)| {
            let mark = if window.contains(*t) { '*' } else { ' ' };
            format!("{} {}  {}", mark, format_hhmmss(*t), id)
        })
        .collect()
}

pub fn position_line(position: &AircraftPosition) -> String {
    let altitude = position
        .altitude_ft
        .map_or_else(|| "-".to_string(), |a| format!("{:.0} ft", a));
    format!(
        "{:<10} {:>9.4} {:>8.4}  {:>9}  hdg {:>5.1}",
        position.flight_id, position.lon, position.lat, altitude, position.heading_deg
    )
}
