//! Progress parsing for ffmpeg's stderr stream.

use serde::Serialize;

/// Export progress report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportProgress {
    /// Whole percent, clamped to `0..=100`.
    pub percentage: u8,

    /// Seconds of output written so far.
    pub current_time: f64,

    /// Seconds of output expected in total.
    pub total_duration: f64,
}

impl ExportProgress {
    pub fn new(current_time: f64, total_duration: f64) -> Self {
        Self {
            percentage: compute_percentage(current_time, total_duration),
            current_time,
            total_duration,
        }
    }

    pub fn complete(total_duration: f64) -> Self {
        Self {
            percentage: 100,
            current_time: total_duration,
            total_duration,
        }
    }
}

/// Extract the `time=HH:MM:SS.ss` stamp from a status line, in seconds.
///
/// Returns `None` when the line carries no stamp or the stamp is `N/A`.
pub fn parse_progress_time(line: &str) -> Option<f64> {
    let (_, rest) = line.split_once("time=")?;
    let stamp = rest.split_whitespace().next()?;

    let mut parts = stamp.splitn(3, ':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Whole-percent completion, rounded and clamped. Zero when `total` is not positive.
pub fn compute_percentage(current: f64, total: f64) -> u8 {
    if !total.is_finite() || total <= 0.0 || !current.is_finite() {
        return 0;
    }
    (current / total * 100.0).round().clamp(0.0, 100.0) as u8
}
