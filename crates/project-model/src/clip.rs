//! Source clips and their timeline placements.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::caption::Caption;
use crate::geometry::{self, TRACK_COUNT};
use crate::trim;

/// Stable identifier for a source clip or a placement.
///
/// A first placement reuses its source's id; split halves get derived ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(String);

impl ClipId {
    /// Fresh random (v4) id.
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClipId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ClipId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Probe results for a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub file_size_bytes: u64,
}

/// An imported media file.
///
/// Immutable after import except for caption attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceClip {
    pub id: ClipId,

    /// Absolute path to the media file.
    pub file_path: PathBuf,

    /// Display name.
    pub filename: String,

    /// Source duration in seconds. Upper bound for every trim.
    pub duration: f64,

    #[serde(default)]
    pub metadata: Option<MediaMetadata>,

    /// Opaque preview image (e.g. a data URL).
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Cues local to the source, ordered by start.
    #[serde(default)]
    pub captions: Vec<Caption>,
}

impl SourceClip {
    /// Build a source clip from probe results.
    pub fn new(
        file_path: impl AsRef<Path>,
        duration: f64,
        metadata: Option<MediaMetadata>,
    ) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let filename = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.display().to_string());
        Self {
            id: ClipId::new_v4(),
            file_path,
            filename,
            duration: duration.max(0.0),
            metadata,
            thumbnail: None,
            captions: Vec::new(),
        }
    }

    /// Replace the caption list, keeping it ordered by start.
    pub fn set_captions(&mut self, mut captions: Vec<Caption>) {
        captions.sort_by(|a, b| a.start.total_cmp(&b.start));
        self.captions = captions;
    }
}

/// Timeline lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    #[default]
    Main,
    Overlay,
}

impl Track {
    pub const ALL: [Track; TRACK_COUNT] = [Track::Main, Track::Overlay];

    /// Lane for an index, clamped to the valid range.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(TRACK_COUNT - 1)]
    }

    /// Lane under a vertical canvas offset.
    pub fn from_offset(vertical_offset: f64) -> Self {
        Self::from_index(geometry::track_index(vertical_offset))
    }

    pub fn index(self) -> usize {
        match self {
            Track::Main => 0,
            Track::Overlay => 1,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Main => f.write_str("main"),
            Track::Overlay => f.write_str("overlay"),
        }
    }
}

/// Preview-only transform for overlay clips. Export ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

/// A source clip placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedClip {
    /// Placement id.
    pub id: ClipId,

    pub source: SourceClip,

    /// Position on the global clock, seconds.
    pub start_time: f64,

    /// Source-local in-point.
    pub trim_start: f64,

    /// Source-local out-point.
    pub trim_end: f64,

    pub track: Track,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayTransform>,
}

impl PlacedClip {
    /// Placement covering the whole source.
    pub fn full(source: SourceClip, start_time: f64, track: Track) -> Self {
        let overlay = (track == Track::Overlay).then(OverlayTransform::default);
        Self {
            id: source.id.clone(),
            trim_start: 0.0,
            trim_end: source.duration,
            source,
            start_time,
            track,
            overlay,
        }
    }

    pub fn effective_duration(&self) -> f64 {
        trim::effective_duration(self.trim_start, self.trim_end)
    }

    /// Global time at which this clip stops playing.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.effective_duration()
    }

    /// Whether either end has been pulled in from the source bounds.
    pub fn is_trimmed(&self) -> bool {
        self.trim_start > 0.0 || self.trim_end < self.source.duration
    }

    /// Whether `t` falls in `[start_time, end_time)`.
    pub fn contains_time(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time()
    }

    pub fn validate_trim(&self) -> Result<(), trim::TrimError> {
        trim::validate_trim(self.trim_start, self.trim_end, self.source.duration)
    }
}
