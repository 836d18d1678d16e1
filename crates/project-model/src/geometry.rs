//! Timeline geometry: time ↔ horizontal offset and track lanes.
//!
//! Used by the timeline model for positioning and by whatever draws the
//! timeline. The canvas itself is not part of this crate.

/// Pixels per second at zoom 1.0.
pub const BASE_PIXELS_PER_SECOND: f64 = 100.0;

/// Height of one track lane in pixels.
pub const TRACK_HEIGHT: f64 = 80.0;

/// Vertical gap between lanes in pixels.
pub const TRACK_GAP: f64 = 10.0;

/// Number of parallel tracks (main + overlay).
pub const TRACK_COUNT: usize = 2;

/// Spacing of ruler markers in seconds.
pub const MARKER_INTERVAL_SECS: f64 = 5.0;

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Horizontal offset of `seconds` at the given zoom.
pub fn time_to_offset(seconds: f64, zoom: f64) -> f64 {
    finite_or_zero(seconds) * BASE_PIXELS_PER_SECOND * zoom
}

/// Inverse of [`time_to_offset`]. A non-positive zoom maps everything to 0.
pub fn offset_to_time(offset: f64, zoom: f64) -> f64 {
    if zoom <= 0.0 || !zoom.is_finite() {
        return 0.0;
    }
    finite_or_zero(offset) / (BASE_PIXELS_PER_SECOND * zoom)
}

/// Clamp a zoom factor into the supported range.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

/// Lane index for a vertical offset, clamped to the valid tracks.
pub fn track_index(vertical_offset: f64) -> usize {
    let lane = (finite_or_zero(vertical_offset) / (TRACK_HEIGHT + TRACK_GAP)).floor();
    if lane <= 0.0 {
        0
    } else {
        (lane as usize).min(TRACK_COUNT - 1)
    }
}

/// Top edge of a lane.
pub fn track_offset(track_index: usize) -> f64 {
    track_index as f64 * (TRACK_HEIGHT + TRACK_GAP)
}

/// Ruler markers `[0, 5, 10, ...]` up to and including `total_duration`.
pub fn generate_markers(total_duration: f64) -> Vec<f64> {
    let total = finite_or_zero(total_duration);
    if total < 0.0 {
        return Vec::new();
    }
    let count = (total / MARKER_INTERVAL_SECS).floor() as usize;
    (0..=count)
        .map(|i| i as f64 * MARKER_INTERVAL_SECS)
        .collect()
}

/// Format seconds as `M:SS` for ruler labels and clip badges.
pub fn format_time(seconds: f64) -> String {
    let seconds = finite_or_zero(seconds).max(0.0);
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{mins}:{secs:02}")
}
