//! Timeline edits: captions, place, trim, split, move, remove.
//!
//! Each command loads the project, applies one mutation and saves it back.

use std::path::PathBuf;

use clipforge_project_model::{Caption, ClipId, Track};

use super::{load_project, save_project};

pub fn captions(path: PathBuf, source: String, file: PathBuf) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;
    let cues: Vec<Caption> = serde_json::from_str(&json)
        .map_err(|e| anyhow::anyhow!("Invalid caption file {}: {e}", file.display()))?;

    let mut project = load_project(&path)?;
    let count = cues.len();
    project
        .attach_captions(&ClipId::from(source.as_str()), cues)
        .map_err(|e| anyhow::anyhow!("Failed to attach captions: {e}"))?;
    save_project(&mut project, &path)?;

    println!("Attached {count} caption(s) to {source}");
    Ok(())
}

pub fn place(path: PathBuf, source: String, track: Track) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let clip_id = project
        .place_source(&ClipId::from(source), track)
        .map_err(|e| anyhow::anyhow!("Failed to place clip: {e}"))?;
    save_project(&mut project, &path)?;

    if let Some(clip) = project.timeline.clip(&clip_id) {
        println!(
            "Placed {} on {track} track: {:.2}s - {:.2}s",
            clip.id,
            clip.start_time,
            clip.end_time()
        );
    }
    Ok(())
}

pub fn trim(path: PathBuf, clip: String, trim_start: f64, trim_end: f64) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let id = ClipId::from(clip);
    project
        .timeline
        .set_trim(&id, trim_start, trim_end)
        .map_err(|e| anyhow::anyhow!("Failed to trim clip: {e}"))?;
    save_project(&mut project, &path)?;

    if let Some(placed) = project.timeline.clip(&id) {
        println!(
            "Trimmed {}: in {:.2}s, out {:.2}s ({:.2}s)",
            placed.id,
            placed.trim_start,
            placed.trim_end,
            placed.effective_duration()
        );
    }
    Ok(())
}

pub fn split(path: PathBuf, clip: String, at: f64) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let (first, second) = project
        .timeline
        .split(&ClipId::from(clip), at)
        .map_err(|e| anyhow::anyhow!("Failed to split clip: {e}"))?;
    save_project(&mut project, &path)?;

    println!("Split at {at:.2}s:");
    for id in [&first, &second] {
        if let Some(placed) = project.timeline.clip(id) {
            println!(
                "  {}: {:.2}s - {:.2}s",
                placed.id,
                placed.start_time,
                placed.end_time()
            );
        }
    }
    Ok(())
}

pub fn move_clip(path: PathBuf, clip: String, start: f64, track: Option<Track>) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let id = ClipId::from(clip);
    let current = project
        .timeline
        .clip(&id)
        .map(|c| c.track)
        .ok_or_else(|| anyhow::anyhow!("Unknown clip: {id}"))?;
    let track = track.unwrap_or(current);

    project
        .timeline
        .move_clip(&id, start, track)
        .map_err(|e| anyhow::anyhow!("Failed to move clip: {e}"))?;
    save_project(&mut project, &path)?;

    if let Some(placed) = project.timeline.clip(&id) {
        println!(
            "Moved {} to {} track at {:.2}s",
            placed.id, placed.track, placed.start_time
        );
    }
    Ok(())
}

pub fn remove(path: PathBuf, id: String, source: bool) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let id = ClipId::from(id);

    if source {
        let removed = project
            .remove_source(&id)
            .map_err(|e| anyhow::anyhow!("Failed to remove source: {e}"))?;
        save_project(&mut project, &path)?;
        println!("Removed source {id} and {} placement(s)", removed.len());
    } else {
        let removed = project
            .timeline
            .remove(&id)
            .ok_or_else(|| anyhow::anyhow!("Unknown clip: {id}"))?;
        save_project(&mut project, &path)?;
        println!(
            "Removed {} from {} track ({:.2}s)",
            removed.id,
            removed.track,
            removed.effective_duration()
        );
    }
    Ok(())
}
