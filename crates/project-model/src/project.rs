//! Project document: the media library plus the timeline.
//!
//! A project is a single pretty-printed JSON file. Source media is referenced
//! by absolute path and never copied.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clipforge_common::ClipforgeError;
use serde::{Deserialize, Serialize};

use crate::caption::Caption;
use crate::clip::{ClipId, PlacedClip, Track};
use crate::library::MediaLibrary;
use crate::timeline::{Timeline, TimelineError};

/// Current project schema version.
pub const PROJECT_VERSION: &str = "1.0";

/// Top-level project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorProject {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    /// Imported media.
    #[serde(default)]
    pub library: MediaLibrary,

    /// Editing timeline.
    #[serde(default)]
    pub timeline: Timeline,
}

impl EditorProject {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: PROJECT_VERSION.to_string(),
            name: name.into(),
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            modified_at: now,
            library: MediaLibrary::new(),
            timeline: Timeline::new(),
        }
    }

    /// Create a new project file on disk. Parent directories are created.
    pub fn create(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let mut project = Self::new(name);
        project.save(path)?;
        tracing::info!(path = %path.display(), id = %project.id, "Created project");
        Ok(project)
    }

    /// Load a project file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let project: Self = serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        if project.version != PROJECT_VERSION {
            return Err(ProjectError::ValidationError {
                message: format!("unsupported project version {}", project.version),
            });
        }
        tracing::debug!(
            path = %path.display(),
            sources = project.library.len(),
            clips = project.timeline.len(),
            "Loaded project"
        );
        Ok(project)
    }

    /// Write the project to `path`, bumping `modified_at`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        self.modified_at = Utc::now();
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Place a library source on the timeline.
    pub fn place_source(&mut self, source_id: &ClipId, track: Track) -> Result<ClipId, ProjectError> {
        let source = self
            .library
            .get(source_id)
            .cloned()
            .ok_or_else(|| ProjectError::UnknownSource {
                id: source_id.clone(),
            })?;
        Ok(self.timeline.place(source, track)?)
    }

    /// Remove a source from the library and every placement of it.
    pub fn remove_source(&mut self, source_id: &ClipId) -> Result<Vec<PlacedClip>, ProjectError> {
        self.library
            .remove(source_id)
            .ok_or_else(|| ProjectError::UnknownSource {
                id: source_id.clone(),
            })?;
        let removed = self.timeline.remove_source(source_id);
        tracing::info!(source_id = %source_id, placements = removed.len(), "Removed source");
        Ok(removed)
    }

    /// Attach captions to a source and to every placement of it.
    pub fn attach_captions(&mut self, source_id: &ClipId, captions: Vec<Caption>) -> Result<(), ProjectError> {
        if !self.library.attach_captions(source_id, captions.clone()) {
            return Err(ProjectError::UnknownSource {
                id: source_id.clone(),
            });
        }
        let placements = self.timeline.attach_captions(source_id, &captions);
        tracing::debug!(source_id = %source_id, placements, "Attached captions");
        Ok(())
    }

    /// Report missing source files and invalid trims. Empty means healthy.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        for source in self.library.iter() {
            if !source.file_path.exists() {
                errors.push(format!(
                    "Source missing: {} ({})",
                    source.filename,
                    source.file_path.display()
                ));
            }
        }

        for clip in self.timeline.clips() {
            if self.library.get(&clip.source.id).is_none() && !clip.source.file_path.exists() {
                errors.push(format!(
                    "Placed clip {} references missing file {}",
                    clip.id,
                    clip.source.file_path.display()
                ));
            }
            if let Err(e) = clip.validate_trim() {
                errors.push(format!("Clip {}: {e}", clip.id));
            }
        }

        errors
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },

    #[error("No source with id {id} in the library")]
    UnknownSource { id: ClipId },

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

impl From<ProjectError> for ClipforgeError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::Timeline(e) => ClipforgeError::timeline(e.to_string()),
            other => ClipforgeError::project(other.to_string()),
        }
    }
}

impl From<TimelineError> for ClipforgeError {
    fn from(err: TimelineError) -> Self {
        ClipforgeError::timeline(err.to_string())
    }
}
