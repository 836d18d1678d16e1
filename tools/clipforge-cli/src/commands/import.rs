//! Import a media file into a project library.

use std::path::PathBuf;

use clipforge_common::AppConfig;
use clipforge_project_model::{MediaMetadata, SourceClip, Track};
use clipforge_render_engine::{CancelToken, ExportCompositor};

use super::{load_project, save_project};

/// Media details supplied on the command line.
pub struct MediaInfo {
    pub duration: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
    pub size: Option<u64>,
}

impl MediaInfo {
    fn metadata(&self, file_size: u64) -> Option<MediaMetadata> {
        let (width, height) = (self.width?, self.height?);
        Some(MediaMetadata {
            width,
            height,
            codec: self.codec.clone().unwrap_or_else(|| "unknown".to_string()),
            file_size_bytes: self.size.unwrap_or(file_size),
        })
    }
}

pub async fn run(
    path: PathBuf,
    media: PathBuf,
    info: MediaInfo,
    place: Option<Track>,
    thumbnail: bool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    if !info.duration.is_finite() || info.duration <= 0.0 {
        anyhow::bail!("Duration must be a positive number of seconds");
    }

    let media = std::fs::canonicalize(&media)
        .map_err(|_| clipforge_common::ClipforgeError::FileNotFound { path: media.clone() })?;
    let file_size = std::fs::metadata(&media).map(|m| m.len()).unwrap_or(0);

    let mut project = load_project(&path)?;
    let mut source = SourceClip::new(&media, info.duration, info.metadata(file_size));
    if thumbnail {
        source.thumbnail = poster_frame(&source, config).await;
    }
    let filename = source.filename.clone();
    let source_id = project.library.import(source);

    println!("Imported {filename}");
    println!("  Source ID: {source_id}");
    println!("  Duration: {:.2}s", info.duration);
    if thumbnail {
        let status = if project.library.get(&source_id).is_some_and(|s| s.thumbnail.is_some()) {
            "generated"
        } else {
            "unavailable"
        };
        println!("  Thumbnail: {status}");
    }

    if let Some(track) = place {
        let clip_id = project
            .place_source(&source_id, track)
            .map_err(|e| anyhow::anyhow!("Failed to place clip: {e}"))?;
        let clip = project.timeline.clip(&clip_id);
        println!(
            "  Placed on {track} track at {:.2}s",
            clip.map(|c| c.start_time).unwrap_or_default()
        );
    }

    save_project(&mut project, &path)
}

/// A missing thumbnail never fails the import.
async fn poster_frame(source: &SourceClip, config: &AppConfig) -> Option<String> {
    let compositor = match ExportCompositor::from_config(&config.export) {
        Ok(compositor) => compositor,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping thumbnail");
            return None;
        }
    };
    compositor
        .thumbnail(source, &CancelToken::new())
        .await
        .map_err(|e| tracing::warn!(file = %source.file_path.display(), error = %e, "Skipping thumbnail"))
        .ok()
}
