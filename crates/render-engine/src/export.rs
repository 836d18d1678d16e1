//! Export jobs: strategy selection, staging, and engine invocations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipforge_common::{ClipforgeError, EncoderSettings, ExportDefaults};
use clipforge_project_model::{ClipId, PlacedClip, SourceClip, Track, TrimError};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::command::{build_clip_args, build_concat_args, concat_manifest, Resolution};
use crate::compositor::{CompositeLayout, SubtitleFiles};
use crate::progress::{parse_progress_time, ExportProgress};
use crate::staging::{absolute, StagingArea};
use crate::subtitles::write_srt;
use crate::thumbnail::generate_thumbnail;
use crate::transcoder::{CancelToken, FfmpegTranscoder, Transcoder};

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// An export request: a snapshot of placed clips and where to write them.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub clips: Vec<PlacedClip>,

    /// Output file path.
    pub output_path: PathBuf,

    pub resolution: Resolution,

    /// Mix overlay-track audio into the output (PiP only).
    pub mix_overlay_audio: bool,
}

impl ExportJob {
    pub fn new(clips: Vec<PlacedClip>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            clips,
            output_path: output_path.into(),
            resolution: Resolution::Source,
            mix_overlay_audio: true,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }
}

/// Why an export failed.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No clips to export")]
    NoClips,

    #[error("Invalid trim on clip {id}: {source}")]
    InvalidClip {
        id: ClipId,
        #[source]
        source: TrimError,
    },

    #[error("Overlay clips need at least one clip on the main track")]
    NoMainTrackClips,

    #[error("ffmpeg binary not found: {binary}")]
    BinaryNotFound { binary: PathBuf },

    #[error("Failed to run {binary}: {source}")]
    SpawnFailed {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg exited with {}\n{stderr_tail}", exit_label(.code))]
    NonZeroExit {
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("ffmpeg reported success but {path} was not written")]
    OutputMissing { path: PathBuf },

    #[error("Export cancelled")]
    Cancelled,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

impl From<ExportError> for ClipforgeError {
    fn from(err: ExportError) -> Self {
        ClipforgeError::export(err.to_string())
    }
}

/// Result handed back to callers that want a plain record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<PathBuf, ExportError>> for ExportOutcome {
    fn from(result: Result<PathBuf, ExportError>) -> Self {
        match result {
            Ok(path) => Self {
                success: true,
                output_path: Some(path),
                error: None,
            },
            Err(e) => Self {
                success: false,
                output_path: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// How a snapshot is lowered into engine invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStrategy {
    /// One main clip: a single direct encode.
    Single,
    /// Several main clips: trim intermediates, then concat.
    Concat,
    /// Main plus overlay clips: one filter-graph encode.
    Composite,
}

impl ExportStrategy {
    /// Validate the snapshot and pick a strategy. No side effects.
    pub fn select(clips: &[PlacedClip]) -> Result<Self, ExportError> {
        if clips.is_empty() {
            return Err(ExportError::NoClips);
        }
        for clip in clips {
            clip.validate_trim().map_err(|source| ExportError::InvalidClip {
                id: clip.id.clone(),
                source,
            })?;
        }

        let main = clips.iter().filter(|c| c.track == Track::Main).count();
        let overlay = clips.len() - main;
        match (main, overlay) {
            (0, _) => Err(ExportError::NoMainTrackClips),
            (_, 1..) => Ok(ExportStrategy::Composite),
            (1, 0) => Ok(ExportStrategy::Single),
            _ => Ok(ExportStrategy::Concat),
        }
    }
}

impl std::fmt::Display for ExportStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportStrategy::Single => f.write_str("single"),
            ExportStrategy::Concat => f.write_str("concat"),
            ExportStrategy::Composite => f.write_str("composite"),
        }
    }
}

/// A running export started with [`ExportCompositor::spawn`].
pub struct ExportTask {
    /// Progress events, closed when the job finishes.
    pub progress: mpsc::UnboundedReceiver<ExportProgress>,

    /// Cancels the job; the running engine process is killed and staged files removed.
    pub cancel: CancelToken,

    pub handle: JoinHandle<ExportOutcome>,
}

impl ExportTask {
    /// Wait for the job, folding a panicked task into a failed outcome.
    pub async fn wait(self) -> ExportOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => ExportOutcome {
                success: false,
                output_path: None,
                error: Some(format!("Export task failed: {e}")),
            },
        }
    }
}

/// Drives export jobs through a [`Transcoder`].
pub struct ExportCompositor {
    transcoder: Arc<dyn Transcoder>,
    scratch_dir: PathBuf,
    artifact_prefix: String,
    encoder: EncoderSettings,
}

impl ExportCompositor {
    pub fn new(transcoder: Arc<dyn Transcoder>, defaults: &ExportDefaults) -> Self {
        Self {
            transcoder,
            scratch_dir: absolute(defaults.scratch_dir()),
            artifact_prefix: defaults.artifact_prefix.clone(),
            encoder: defaults.encoder.clone(),
        }
    }

    /// Compositor backed by the ffmpeg binary resolved from `defaults`.
    pub fn from_config(defaults: &ExportDefaults) -> Result<Self, ExportError> {
        let ffmpeg = FfmpegTranscoder::locate(defaults)?;
        Ok(Self::new(Arc::new(ffmpeg), defaults))
    }

    /// Run a job to completion, returning the output path.
    ///
    /// Staged files are removed on every exit path.
    pub async fn export(
        &self,
        job: &ExportJob,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> Result<PathBuf, ExportError> {
        let strategy = ExportStrategy::select(&job.clips)?;
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        tracing::info!(
            output = %job.output_path.display(),
            clips = job.clips.len(),
            %strategy,
            resolution = %job.resolution,
            engine = self.transcoder.name(),
            "Starting export"
        );

        if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(&self.scratch_dir).map_err(|e| ExportError::Io {
            path: self.scratch_dir.clone(),
            source: e,
        })?;

        let mut staging = StagingArea::new(&self.scratch_dir, &self.artifact_prefix);
        let progress = progress.as_ref();

        let result = match strategy {
            ExportStrategy::Single => self.export_single(job, progress, cancel).await,
            ExportStrategy::Concat => self.export_concat(job, &mut staging, progress, cancel).await,
            ExportStrategy::Composite => {
                self.export_composite(job, &mut staging, progress, cancel).await
            }
        };
        staging.cleanup();

        match result {
            Ok(total) => {
                if let Some(cb) = progress {
                    cb(ExportProgress::complete(total));
                }
                tracing::info!(output = %job.output_path.display(), duration = total, "Export complete");
                Ok(job.output_path.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, %strategy, "Export failed");
                Err(e)
            }
        }
    }

    /// Like [`export`](Self::export), reported as an [`ExportOutcome`].
    pub async fn run(
        &self,
        job: &ExportJob,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ExportOutcome {
        self.export(job, progress, cancel).await.into()
    }

    /// Poster frame for `source` as a JPEG `data:` URL.
    pub async fn thumbnail(
        &self,
        source: &SourceClip,
        cancel: &CancelToken,
    ) -> Result<String, ExportError> {
        std::fs::create_dir_all(&self.scratch_dir).map_err(|e| ExportError::Io {
            path: self.scratch_dir.clone(),
            source: e,
        })?;
        let mut staging = StagingArea::new(&self.scratch_dir, &self.artifact_prefix);
        generate_thumbnail(
            self.transcoder.as_ref(),
            &source.file_path,
            source.duration,
            &mut staging,
            cancel,
        )
        .await
    }

    /// First line of the engine's version banner.
    pub async fn engine_version(&self) -> Result<String, ExportError> {
        self.transcoder.version().await
    }

    /// Run a job on the tokio runtime, streaming progress over a channel.
    pub fn spawn(self: Arc<Self>, job: ExportJob) -> ExportTask {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let callback: ProgressCallback = Box::new(move |event| {
                let _ = tx.send(event);
            });
            self.run(&job, Some(callback), &task_cancel).await
        });

        ExportTask {
            progress: rx,
            cancel,
            handle,
        }
    }

    async fn export_single(
        &self,
        job: &ExportJob,
        progress: Option<&ProgressCallback>,
        cancel: &CancelToken,
    ) -> Result<f64, ExportError> {
        let clip = job
            .clips
            .iter()
            .find(|c| c.track == Track::Main)
            .ok_or(ExportError::NoMainTrackClips)?;
        let total = clip.effective_duration();
        let args = build_clip_args(clip, &job.output_path, job.resolution, &self.encoder);
        self.invoke(&args, &job.output_path, Some(total), progress, cancel)
            .await?;
        Ok(total)
    }

    async fn export_concat(
        &self,
        job: &ExportJob,
        staging: &mut StagingArea,
        progress: Option<&ProgressCallback>,
        cancel: &CancelToken,
    ) -> Result<f64, ExportError> {
        let mut clips: Vec<&PlacedClip> = job.clips.iter().collect();
        clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let total: f64 = clips.iter().map(|c| c.effective_duration()).sum();

        let mut inputs = Vec::with_capacity(clips.len());
        for clip in &clips {
            if clip.is_trimmed() {
                let staged = staging.allocate("trim", "mp4");
                tracing::debug!(clip_id = %clip.id, path = %staged.display(), "Trimming into intermediate");
                let args = build_clip_args(clip, &staged, Resolution::Source, &self.encoder);
                self.invoke(&args, &staged, None, None, cancel).await?;
                inputs.push(staged);
            } else {
                inputs.push(absolute(&clip.source.file_path));
            }
        }

        let manifest = staging.allocate("concat", "txt");
        std::fs::write(&manifest, concat_manifest(&inputs)).map_err(|e| ExportError::Io {
            path: manifest.clone(),
            source: e,
        })?;

        let args = build_concat_args(&manifest, &job.output_path, job.resolution, &self.encoder);
        self.invoke(&args, &job.output_path, Some(total), progress, cancel)
            .await?;
        Ok(total)
    }

    async fn export_composite(
        &self,
        job: &ExportJob,
        staging: &mut StagingArea,
        progress: Option<&ProgressCallback>,
        cancel: &CancelToken,
    ) -> Result<f64, ExportError> {
        let mut layout = CompositeLayout::new(&job.clips, job.resolution);
        layout.mix_overlay_audio = job.mix_overlay_audio;

        let mut subtitles = SubtitleFiles::default();
        let overlay_captions = layout.overlay_captions();
        if !overlay_captions.is_empty() {
            subtitles.overlay = Some(stage_srt(staging, "subs-overlay", &overlay_captions)?);
        }
        let main_captions = layout.main_captions();
        if !main_captions.is_empty() {
            subtitles.main = Some(stage_srt(staging, "subs-main", &main_captions)?);
        }

        tracing::debug!(
            canvas_width = layout.canvas.width,
            canvas_height = layout.canvas.height,
            main = layout.main.len(),
            overlay = layout.overlay.len(),
            burned_tracks = subtitles.main.iter().chain(&subtitles.overlay).count(),
            "Compositing picture-in-picture"
        );

        let total = layout.total_duration();
        let args = layout.build_args(&subtitles, &job.output_path, &self.encoder);
        self.invoke(&args, &job.output_path, Some(total), progress, cancel)
            .await?;
        Ok(total)
    }

    /// One engine invocation. Success means exit 0 and `expected` on disk.
    async fn invoke(
        &self,
        args: &[String],
        expected: &Path,
        total: Option<f64>,
        progress: Option<&ProgressCallback>,
        cancel: &CancelToken,
    ) -> Result<(), ExportError> {
        if let (Some(total), Some(cb)) = (total, progress) {
            cb(ExportProgress::new(0.0, total));
        }

        let mut on_line = |line: &str| {
            tracing::trace!(line, "engine");
            if let (Some(total), Some(cb)) = (total, progress) {
                if let Some(current) = parse_progress_time(line) {
                    cb(ExportProgress::new(current, total));
                }
            }
        };
        self.transcoder.run(args, &mut on_line, cancel).await?;

        if !expected.exists() {
            return Err(ExportError::OutputMissing {
                path: expected.to_path_buf(),
            });
        }
        Ok(())
    }
}

fn stage_srt(
    staging: &mut StagingArea,
    purpose: &str,
    captions: &[clipforge_project_model::Caption],
) -> Result<PathBuf, ExportError> {
    let path = staging.allocate(purpose, "srt");
    write_srt(&path, captions).map_err(|e| ExportError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}
