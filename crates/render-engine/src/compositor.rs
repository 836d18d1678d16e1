//! Picture-in-picture compositor.
//!
//! Lowers a two-track arrangement into a single ffmpeg `-filter_complex`
//! graph:
//!
//! ```text
//! main clips ── trim/fit ── concat ──┐
//!                                    ├── overlay (bottom-right, gated) ── subtitles ── [vout]
//! overlay clips ── trim/shift/scale ─┘
//!
//! main audio ──────────────┐
//!                          ├── amix ── [aout]
//! overlay audio ── adelay ─┘
//! ```
//!
//! Main clips play back to back, so their output positions are the running
//! sum of effective durations. Overlay clips keep their timeline `start_time`.

use std::path::{Path, PathBuf};

use clipforge_common::EncoderSettings;
use clipforge_project_model::{visible_captions, Caption, PlacedClip, Track};

use crate::command::{codec_args, even, fit_filter, Resolution};

/// Canvas used when neither a target resolution nor probe data is available.
pub const FALLBACK_CANVAS: Canvas = Canvas {
    width: 1920,
    height: 1080,
};

/// PiP width relative to the canvas width.
const PIP_WIDTH_RATIO: f64 = 0.22;

/// PiP margin relative to the canvas dimensions.
const PIP_MARGIN_RATIO: f64 = 0.03;

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Target resolution, else the first main clip's probed size, else 1080p.
    /// Both sides are forced even.
    pub fn resolve(resolution: Resolution, first_main: Option<&PlacedClip>) -> Self {
        let (width, height) = resolution
            .dimensions()
            .or_else(|| {
                first_main
                    .and_then(|clip| clip.source.metadata.as_ref())
                    .filter(|meta| meta.width > 0 && meta.height > 0)
                    .map(|meta| (meta.width, meta.height))
            })
            .unwrap_or((FALLBACK_CANVAS.width, FALLBACK_CANVAS.height));
        Self {
            width: even(width),
            height: even(height),
        }
    }
}

/// Size and corner margins of the overlay box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipBox {
    pub width: u32,
    pub height: u32,
    pub margin_x: u32,
    pub margin_y: u32,
}

impl PipBox {
    /// 22% of the canvas width at 16:9, bottom-right.
    pub fn for_canvas(canvas: Canvas) -> Self {
        let width = even((canvas.width as f64 * PIP_WIDTH_RATIO).round() as u32);
        let height = even((width as f64 * 9.0 / 16.0).round() as u32);
        Self {
            width,
            height,
            margin_x: (canvas.width as f64 * PIP_MARGIN_RATIO).round() as u32,
            margin_y: (canvas.height as f64 * PIP_MARGIN_RATIO).round() as u32,
        }
    }
}

/// Subtitle files to burn, at most one per track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleFiles {
    pub main: Option<PathBuf>,
    pub overlay: Option<PathBuf>,
}

/// A two-track arrangement laid out for compositing.
#[derive(Debug, Clone)]
pub struct CompositeLayout {
    /// Main clips in playback order, `start_time` re-based to the concat output.
    pub main: Vec<PlacedClip>,

    /// Overlay clips sorted by `start_time`.
    pub overlay: Vec<PlacedClip>,

    pub canvas: Canvas,
    pub pip: PipBox,

    /// Mix overlay audio into the main bed. When false the main audio passes through.
    pub mix_overlay_audio: bool,
}

impl CompositeLayout {
    pub fn new(clips: &[PlacedClip], resolution: Resolution) -> Self {
        let mut main: Vec<PlacedClip> = clips
            .iter()
            .filter(|clip| clip.track == Track::Main)
            .cloned()
            .collect();
        let mut overlay: Vec<PlacedClip> = clips
            .iter()
            .filter(|clip| clip.track == Track::Overlay)
            .cloned()
            .collect();
        main.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        overlay.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut cursor = 0.0;
        for clip in &mut main {
            clip.start_time = cursor;
            cursor += clip.effective_duration();
        }

        let canvas = Canvas::resolve(resolution, main.first());
        Self {
            main,
            overlay,
            canvas,
            pip: PipBox::for_canvas(canvas),
            mix_overlay_audio: true,
        }
    }

    /// Output length: latest end of any segment.
    pub fn total_duration(&self) -> f64 {
        self.main
            .iter()
            .chain(&self.overlay)
            .map(PlacedClip::end_time)
            .fold(0.0, f64::max)
    }

    /// Visible main-track cues on the output clock.
    pub fn main_captions(&self) -> Vec<Caption> {
        self.main.iter().flat_map(visible_captions).collect()
    }

    /// Visible overlay-track cues on the output clock.
    pub fn overlay_captions(&self) -> Vec<Caption> {
        self.overlay.iter().flat_map(visible_captions).collect()
    }

    /// Build the `-filter_complex` graph. Outputs are labelled `[vout]` and `[aout]`.
    pub fn filter_graph(&self, subtitles: &SubtitleFiles) -> String {
        let mut chains: Vec<String> = Vec::new();
        let fit = fit_filter(self.canvas.width, self.canvas.height);

        for (i, clip) in self.main.iter().enumerate() {
            let (start, end) = (clip.trim_start, clip.trim_end);
            chains.push(format!(
                "[{i}:v]trim=start={start}:end={end},setpts=PTS-STARTPTS,{fit},setsar=1[mv{i}]"
            ));
            chains.push(format!(
                "[{i}:a]atrim=start={start}:end={end},asetpts=PTS-STARTPTS[ma{i}]"
            ));
        }

        if self.main.len() == 1 {
            chains.push("[mv0]null[mainv]".to_string());
            chains.push("[ma0]anull[maina]".to_string());
        } else {
            let pads: String = (0..self.main.len())
                .map(|i| format!("[mv{i}][ma{i}]"))
                .collect();
            chains.push(format!(
                "{pads}concat=n={}:v=1:a=1[mainv][maina]",
                self.main.len()
            ));
        }

        let base = self.main.len();
        let pip = self.pip;
        let mut video = "mainv".to_string();
        let mut overlay_audio = Vec::new();

        for (j, clip) in self.overlay.iter().enumerate() {
            let input = base + j;
            let (trim_start, trim_end) = (clip.trim_start, clip.trim_end);
            let (at, until) = (clip.start_time, clip.end_time());

            chains.push(format!(
                "[{input}:v]trim=start={trim_start}:end={trim_end},setpts=PTS-STARTPTS+{at}/TB,{},setsar=1[ov{j}]",
                fit_filter(pip.width, pip.height)
            ));
            chains.push(format!(
                "[{video}][ov{j}]overlay=x=W-w-{mx}:y=H-h-{my}:enable='between(t,{at},{until})':eof_action=pass[vo{j}]",
                mx = pip.margin_x,
                my = pip.margin_y,
            ));
            video = format!("vo{j}");

            if self.mix_overlay_audio {
                let delay_ms = (at * 1000.0).round() as u64;
                chains.push(format!(
                    "[{input}:a]atrim=start={trim_start}:end={trim_end},asetpts=PTS-STARTPTS,adelay={delay_ms}|{delay_ms}[oa{j}]"
                ));
                overlay_audio.push(format!("oa{j}"));
            }
        }

        // Overlay captions sit at the top so they never collide with main captions.
        if let Some(path) = &subtitles.overlay {
            chains.push(format!(
                "[{video}]subtitles='{}':force_style='Alignment=8'[vsubo]",
                escape_filter_path(path)
            ));
            video = "vsubo".to_string();
        }
        if let Some(path) = &subtitles.main {
            chains.push(format!(
                "[{video}]subtitles='{}':force_style='Alignment=2'[vsubm]",
                escape_filter_path(path)
            ));
            video = "vsubm".to_string();
        }
        chains.push(format!("[{video}]format=yuv420p[vout]"));

        match overlay_audio.len() {
            0 => chains.push("[maina]anull[aout]".to_string()),
            n => {
                let bed = if n == 1 {
                    overlay_audio[0].clone()
                } else {
                    let pads: String = overlay_audio.iter().map(|l| format!("[{l}]")).collect();
                    chains.push(format!("{pads}amix=inputs={n}:duration=longest[ovla]"));
                    "ovla".to_string()
                };
                chains.push(format!("[maina][{bed}]amix=inputs=2:duration=longest[aout]"));
            }
        }

        chains.join(";")
    }

    /// Full argument vector for the single composite invocation.
    pub fn build_args(
        &self,
        subtitles: &SubtitleFiles,
        output: &Path,
        encoder: &EncoderSettings,
    ) -> Vec<String> {
        let mut args = Vec::new();
        for clip in self.main.iter().chain(&self.overlay) {
            args.push("-i".to_string());
            args.push(clip.source.file_path.display().to_string());
        }
        args.push("-filter_complex".to_string());
        args.push(self.filter_graph(subtitles));
        args.extend(
            ["-map", "[vout]", "-map", "[aout]"]
                .into_iter()
                .map(String::from),
        );
        args.extend(codec_args(encoder));
        args.push("-y".to_string());
        args.push(output.display().to_string());
        args
    }
}

/// Escape a path for use inside a quoted `subtitles=` filter argument.
///
/// Nothing can be escaped inside `'...'`, so a quote closes the string,
/// emits an escaped quote and reopens it.
pub fn escape_filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', r"'\\''")
}
