//! Poster frames for imported clips.
//!
//! One frame is grabbed near the start of the source, staged as a JPEG and
//! returned as a `data:` URL ready to store on the clip.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::command::build_thumbnail_args;
use crate::export::ExportError;
use crate::staging::StagingArea;
use crate::transcoder::{CancelToken, Transcoder};

/// Seconds into the source the frame is taken from.
pub const THUMBNAIL_AT_SECS: f64 = 1.0;

/// Frame time for a source of `duration` seconds. Short sources use their midpoint.
pub fn thumbnail_time(duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 {
        0.0
    } else if duration > THUMBNAIL_AT_SECS {
        THUMBNAIL_AT_SECS
    } else {
        duration / 2.0
    }
}

pub fn jpeg_data_url(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(bytes))
}

/// Extract a thumbnail for `input`. The staged JPEG is removed before returning.
pub async fn generate_thumbnail(
    transcoder: &dyn Transcoder,
    input: &Path,
    duration: f64,
    staging: &mut StagingArea,
    cancel: &CancelToken,
) -> Result<String, ExportError> {
    let output = staging.allocate("thumb", "jpg");
    let args = build_thumbnail_args(input, thumbnail_time(duration), &output);

    let mut on_line = |line: &str| tracing::trace!(line, "engine");
    let result = transcoder.run(&args, &mut on_line, cancel).await;

    let encoded = result.and_then(|()| match std::fs::read(&output) {
        Ok(bytes) if !bytes.is_empty() => Ok(jpeg_data_url(&bytes)),
        Ok(_) => Err(ExportError::OutputMissing {
            path: output.clone(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExportError::OutputMissing {
            path: output.clone(),
        }),
        Err(e) => Err(ExportError::Io {
            path: output.clone(),
            source: e,
        }),
    });
    staging.cleanup();

    match &encoded {
        Ok(url) => tracing::debug!(input = %input.display(), bytes = url.len(), "Generated thumbnail"),
        Err(e) => tracing::warn!(input = %input.display(), error = %e, "Thumbnail failed"),
    }
    encoded
}
