//! Trim arithmetic.
//!
//! Pure functions over an in-point/out-point pair and the source duration.
//! Comparisons use the input precision as-is; rounding is a display concern.

/// Reasons a trim pair is rejected.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TrimError {
    #[error("Trim in-point cannot be negative (got {trim_start})")]
    NegativeTrimStart { trim_start: f64 },

    #[error("Trim out-point {trim_end} exceeds clip duration {duration}")]
    TrimExceedsDuration { trim_end: f64, duration: f64 },

    #[error("Trim in-point {trim_start} must be before out-point {trim_end}")]
    TrimOrderInvalid { trim_start: f64, trim_end: f64 },
}

/// Validate trim points against the clip's source duration.
///
/// Checks run in order: negative in-point, out-point past the end, then
/// in-point not strictly before out-point.
pub fn validate_trim(trim_start: f64, trim_end: f64, duration: f64) -> Result<(), TrimError> {
    if trim_start < 0.0 {
        return Err(TrimError::NegativeTrimStart { trim_start });
    }
    if trim_end > duration {
        return Err(TrimError::TrimExceedsDuration { trim_end, duration });
    }
    if trim_start >= trim_end {
        return Err(TrimError::TrimOrderInvalid {
            trim_start,
            trim_end,
        });
    }
    Ok(())
}

/// Whether the trim pair is valid, without the reason.
pub fn is_valid_trim(trim_start: f64, trim_end: f64, duration: f64) -> bool {
    validate_trim(trim_start, trim_end, duration).is_ok()
}

/// Clamp `value` into `[min, max]`.
///
/// Unlike `f64::clamp` this never panics: when `min > max` the result is `min`.
pub fn constrain(value: f64, min: f64, max: f64) -> f64 {
    min.max(max.min(value))
}

/// Length of the kept range, never negative.
pub fn effective_duration(trim_start: f64, trim_end: f64) -> f64 {
    (trim_end - trim_start).max(0.0)
}

/// Percentage of the source that survives the trim.
pub fn trim_percentage(trim_start: f64, trim_end: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        effective_duration(trim_start, trim_end) / duration * 100.0
    } else {
        0.0
    }
}

/// Snap a trim point to the nearest whole second.
pub fn snap_to_second(value: f64) -> f64 {
    value.round()
}
