//! Caption cues and their mapping onto the timeline clock.

use serde::{Deserialize, Serialize};

use crate::clip::PlacedClip;

/// One subtitle cue, in seconds.
///
/// Times are source-local when stored on a [`SourceClip`](crate::SourceClip)
/// and global once adjusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Caption {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Re-base every cue of the placed clip onto the global clock.
///
/// `t_global = start_time + (t_local - trim_start)`. Cues that fall outside the
/// trimmed window are translated too; see [`visible_captions`] for filtering.
pub fn adjust_captions(placed: &PlacedClip) -> Vec<Caption> {
    let offset = placed.start_time - placed.trim_start;
    placed
        .source
        .captions
        .iter()
        .map(|cue| Caption {
            start: cue.start + offset,
            end: cue.end + offset,
            text: cue.text.clone(),
        })
        .collect()
}

/// Adjusted cues that actually play, clamped to the clip's window.
pub fn visible_captions(placed: &PlacedClip) -> Vec<Caption> {
    let window_start = placed.start_time;
    let window_end = placed.end_time();
    adjust_captions(placed)
        .into_iter()
        .filter(|cue| cue.end > window_start && cue.start < window_end)
        .map(|cue| Caption {
            start: cue.start.max(window_start),
            end: cue.end.min(window_end),
            text: cue.text,
        })
        .collect()
}
