//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ClipforgeError, ClipforgeResult};

/// Highest constant rate factor x264 accepts.
pub const MAX_CRF: u8 = 51;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where projects are stored.
    #[serde(default = "dirs_default_projects")]
    pub projects_dir: PathBuf,

    /// Export pipeline defaults.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied to every export job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Explicit path to the ffmpeg binary. `None` searches `CLIPFORGE_FFMPEG`, then `PATH`.
    pub ffmpeg_path: Option<PathBuf>,

    /// Directory for intermediate files. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// Leading component of every staged artifact name.
    pub artifact_prefix: String,

    /// How many trailing stderr lines are kept for error reports.
    pub stderr_tail_lines: usize,

    /// Codec and quality settings for every encode.
    pub encoder: EncoderSettings,
}

/// Output codec/quality settings appended to every engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Video codec (e.g. "libx264").
    pub video_codec: String,

    /// Encoder preset (ultrafast .. veryslow).
    pub preset: String,

    /// Constant rate factor (0-51, lower is better).
    pub crf: u8,

    /// Audio codec (e.g. "aac").
    pub audio_codec: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            scratch_dir: None,
            artifact_prefix: "clipforge".to_string(),
            stderr_tail_lines: 40,
            encoder: EncoderSettings::default(),
        }
    }
}

impl ExportDefaults {
    /// Reject settings no export could succeed with.
    pub fn validate(&self) -> ClipforgeResult<()> {
        if self.artifact_prefix.is_empty()
            || self.artifact_prefix.contains(['/', '\\'])
        {
            return Err(ClipforgeError::config(format!(
                "export.artifact_prefix must be a plain file name prefix, got '{}'",
                self.artifact_prefix
            )));
        }
        let encoder = &self.encoder;
        if encoder.video_codec.trim().is_empty() || encoder.audio_codec.trim().is_empty() {
            return Err(ClipforgeError::config("export.encoder codecs must not be empty"));
        }
        if encoder.crf > MAX_CRF {
            return Err(ClipforgeError::config(format!(
                "export.encoder.crf must be 0-{MAX_CRF}, got {}",
                encoder.crf
            )));
        }
        Ok(())
    }

    /// Directory staged artifacts are written to.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipforge").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("clipforge").join("projects")
}
