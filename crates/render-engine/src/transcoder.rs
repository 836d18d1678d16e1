//! Transcoding engine seam.
//!
//! [`Transcoder`] runs one engine invocation and streams its stderr lines to a
//! callback. [`FfmpegTranscoder`] is the real implementation; tests substitute
//! a scripted one.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use clipforge_common::ExportDefaults;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::export::ExportError;

/// Environment variable consulted when no binary is configured.
pub const FFMPEG_ENV: &str = "CLIPFORGE_FFMPEG";

/// Cooperative cancellation shared between a job and its caller.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in self, so wait_for only ends on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Runs one engine invocation.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run with `args` (binary excluded). Every stderr line is passed to
    /// `on_line` as it arrives. Resolves to `Cancelled` if `cancel` fires first.
    async fn run(
        &self,
        args: &[String],
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancelToken,
    ) -> Result<(), ExportError>;

    /// First line of the engine's `-version` output.
    async fn version(&self) -> Result<String, ExportError> {
        let mut banner: Option<String> = None;
        let mut on_line = |line: &str| {
            if banner.is_none() {
                banner = Some(line.trim().to_string());
            }
        };
        self.run(&["-version".to_string()], &mut on_line, &CancelToken::new())
            .await?;
        Ok(banner.unwrap_or_default())
    }

    /// Human-readable engine name for logs.
    fn name(&self) -> &str;
}

/// The ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    stderr_tail_lines: usize,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, stderr_tail_lines: usize) -> Self {
        Self {
            binary: binary.into(),
            stderr_tail_lines: stderr_tail_lines.max(1),
        }
    }

    /// Resolve the binary: configured path, then `CLIPFORGE_FFMPEG`, then `PATH`.
    pub fn locate(defaults: &ExportDefaults) -> Result<Self, ExportError> {
        let binary = resolve_binary(
            defaults.ffmpeg_path.as_deref(),
            std::env::var_os(FFMPEG_ENV).map(PathBuf::from),
        )?;
        tracing::debug!(binary = %binary.display(), "Located ffmpeg");
        Ok(Self::new(binary, defaults.stderr_tail_lines))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn spawn_error(&self, e: std::io::Error) -> ExportError {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ExportError::BinaryNotFound {
                    binary: self.binary.clone(),
                }
            }
            _ => ExportError::SpawnFailed {
                binary: self.binary.clone(),
                source: e,
            },
        }
    }
}

fn resolve_binary(configured: Option<&Path>, from_env: Option<PathBuf>) -> Result<PathBuf, ExportError> {
    if let Some(path) = configured {
        return existing(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return existing(path);
    }
    which::which("ffmpeg").map_err(|_| ExportError::BinaryNotFound {
        binary: PathBuf::from("ffmpeg"),
    })
}

fn existing(path: PathBuf) -> Result<PathBuf, ExportError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ExportError::BinaryNotFound { binary: path })
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn run(
        &self,
        args: &[String],
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancelToken,
    ) -> Result<(), ExportError> {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        tracing::debug!(binary = %self.binary.display(), ?args, "Running ffmpeg");
        let mut child = tokio::process::Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(self.stderr_tail_lines);
        let stderr = child.stderr.take();

        // ffmpeg redraws its status line with '\r', so split on both terminators.
        let drain = async {
            let Some(stderr) = stderr else {
                return;
            };
            let mut chunks = BufReader::new(stderr).split(b'\r');
            while let Ok(Some(chunk)) = chunks.next_segment().await {
                let text = String::from_utf8_lossy(&chunk);
                for line in text.split('\n') {
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    on_line(line);
                    if tail.len() == self.stderr_tail_lines {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
            }
        };

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Cancelling ffmpeg");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill ffmpeg");
                }
                return Err(ExportError::Cancelled);
            }
            (_, status) = async { tokio::join!(drain, child.wait()) } => status,
        };

        let status = status.map_err(|e| ExportError::SpawnFailed {
            binary: self.binary.clone(),
            source: e,
        })?;

        if !status.success() {
            let stderr_tail = Vec::from(tail).join("\n");
            tracing::warn!(code = ?status.code(), "ffmpeg exited unsuccessfully");
            return Err(ExportError::NonZeroExit {
                code: status.code(),
                stderr_tail,
            });
        }
        Ok(())
    }

    // ffmpeg prints its banner on stdout, which `run` discards.
    async fn version(&self) -> Result<String, ExportError> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ExportError::NonZeroExit {
                code: output.status.code(),
                stderr_tail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
