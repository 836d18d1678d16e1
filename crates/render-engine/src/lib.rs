//! ClipForge Render Engine
//!
//! Lowers a snapshot of placed clips into ffmpeg invocations and runs them,
//! streaming progress and cleaning up every temporary file.
//!
//! # Pipeline Architecture
//!
//! ```text
//!                          ┌── Single ──── one encode (seek, bound, fit) ────────────┐
//! clips ── ExportStrategy ─┼── Concat ──── trim intermediates ── manifest ── concat ──┼── output.mp4
//!                          └── Composite ─ SRT staging ── filter graph ── encode ─────┘
//!                                                                  │
//!                                              stderr ── time= ── ExportProgress
//! ```

pub mod command;
pub mod compositor;
pub mod export;
pub mod progress;
pub mod staging;
pub mod subtitles;
pub mod thumbnail;
pub mod transcoder;

pub use command::Resolution;
pub use export::*;
pub use progress::ExportProgress;
pub use transcoder::{CancelToken, FfmpegTranscoder, Transcoder, FFMPEG_ENV};
