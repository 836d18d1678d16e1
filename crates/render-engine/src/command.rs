//! ffmpeg argument builders.
//!
//! Every function here is pure: the binary path is not included and nothing
//! touches the filesystem. Numbers are written with `Display`, so `5.0`
//! becomes `5` and `2.5` stays `2.5`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use clipforge_common::EncoderSettings;
use clipforge_project_model::PlacedClip;
use serde::{Deserialize, Serialize};

/// Target output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep each input's native size.
    #[default]
    Source,
    /// Letter/pillarbox into a fixed frame.
    Fixed { width: u32, height: u32 },
}

impl Resolution {
    pub const UHD_4K: Resolution = Resolution::Fixed {
        width: 3840,
        height: 2160,
    };
    pub const FHD_1080P: Resolution = Resolution::Fixed {
        width: 1920,
        height: 1080,
    };
    pub const HD_720P: Resolution = Resolution::Fixed {
        width: 1280,
        height: 720,
    };
    pub const SD_480P: Resolution = Resolution::Fixed {
        width: 854,
        height: 480,
    };

    /// Output frame size, rounded down to even sides (yuv420p needs both even).
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Resolution::Source => None,
            Resolution::Fixed { width, height } => Some((even(width), even(height))),
        }
    }
}

/// Round down to the nearest even value, never below 2.
pub(crate) fn even(value: u32) -> u32 {
    (value & !1).max(2)
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Source => f.write_str("source"),
            Resolution::Fixed { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resolution '{0}' (expected source, 4k, 1080p, 720p, 480p, or WxH)")]
pub struct ParseResolutionError(String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let preset = match s.trim().to_ascii_lowercase().as_str() {
            "source" => Some(Resolution::Source),
            "4k" | "2160p" => Some(Resolution::UHD_4K),
            "1080p" => Some(Resolution::FHD_1080P),
            "720p" => Some(Resolution::HD_720P),
            "480p" => Some(Resolution::SD_480P),
            _ => None,
        };
        if let Some(preset) = preset {
            return Ok(preset);
        }

        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ParseResolutionError(s.to_string()))?;
        match (w.parse::<u32>(), h.parse::<u32>()) {
            (Ok(width), Ok(height)) if width > 0 && height > 0 => Ok(Resolution::Fixed {
                width: even(width),
                height: even(height),
            }),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}

/// Scale-to-fit then pad to exactly `width`x`height`, centered.
pub fn fit_filter(width: u32, height: u32) -> String {
    format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
    )
}

/// Codec and quality arguments appended to every encode.
pub fn codec_args(encoder: &EncoderSettings) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        encoder.video_codec.clone(),
        "-preset".to_string(),
        encoder.preset.clone(),
        "-crf".to_string(),
        encoder.crf.to_string(),
        "-c:a".to_string(),
        encoder.audio_codec.clone(),
    ]
}

/// Arguments to encode one placed clip into `output`.
///
/// Seeks with `-ss` before the input when trimmed at the head, and bounds the
/// read with `-t` when trimmed at the tail.
pub fn build_clip_args(
    clip: &PlacedClip,
    output: &Path,
    resolution: Resolution,
    encoder: &EncoderSettings,
) -> Vec<String> {
    let mut args = Vec::new();

    if clip.trim_start > 0.0 {
        args.push("-ss".to_string());
        args.push(clip.trim_start.to_string());
    }

    args.push("-i".to_string());
    args.push(clip.source.file_path.display().to_string());

    if clip.trim_end < clip.source.duration {
        args.push("-t".to_string());
        args.push(clip.effective_duration().to_string());
    }

    if let Some((width, height)) = resolution.dimensions() {
        args.push("-vf".to_string());
        args.push(fit_filter(width, height));
    }

    args.extend(codec_args(encoder));
    args.push("-y".to_string());
    args.push(output.display().to_string());
    args
}

/// Grab one frame at `at` seconds into a high-quality JPEG.
pub fn build_thumbnail_args(input: &Path, at: f64, output: &Path) -> Vec<String> {
    let mut args = Vec::new();
    if at > 0.0 {
        args.push("-ss".to_string());
        args.push(at.to_string());
    }
    args.extend([
        "-i".to_string(),
        input.display().to_string(),
        "-vframes".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        "-y".to_string(),
        output.display().to_string(),
    ]);
    args
}

/// Concat-demuxer manifest: one `file '<path>'` line per input.
pub fn concat_manifest<P: AsRef<Path>>(paths: &[P]) -> String {
    paths
        .iter()
        .map(|path| {
            let escaped = path.as_ref().display().to_string().replace('\'', r"'\''");
            format!("file '{escaped}'")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Arguments to concatenate the files listed in `manifest` into `output`.
pub fn build_concat_args(
    manifest: &Path,
    output: &Path,
    resolution: Resolution,
    encoder: &EncoderSettings,
) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        manifest.display().to_string(),
    ];

    if let Some((width, height)) = resolution.dimensions() {
        args.push("-vf".to_string());
        args.push(fit_filter(width, height));
    }

    args.extend(codec_args(encoder));
    args.push("-y".to_string());
    args.push(output.display().to_string());
    args
}
