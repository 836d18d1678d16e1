//! Show project information.

use std::path::PathBuf;

use clipforge_project_model::geometry::format_time;
use clipforge_project_model::Track;

use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = load_project(&path)?;

    println!("Project: {}", project.name);
    println!("  ID: {}", project.id);
    println!("  Created: {}", project.created_at);
    println!("  Modified: {}", project.modified_at);
    println!();

    println!("Library ({} source(s)):", project.library.len());
    for source in project.library.iter() {
        let dims = source
            .metadata
            .as_ref()
            .map(|m| format!(", {}x{} {}", m.width, m.height, m.codec))
            .unwrap_or_default();
        println!(
            "  {} {} ({:.2}s{dims}, {} caption(s))",
            source.id,
            source.filename,
            source.duration,
            source.captions.len()
        );
    }
    println!();

    let timeline = &project.timeline;
    println!(
        "Timeline: {} clip(s), duration {}",
        timeline.len(),
        format_time(timeline.total_duration())
    );
    for track in Track::ALL {
        let clips = timeline.clips_on(track);
        println!("  {track} ({}):", clips.len());
        for clip in clips {
            let trimmed = if clip.is_trimmed() {
                format!(" [trim {:.2}-{:.2}]", clip.trim_start, clip.trim_end)
            } else {
                String::new()
            };
            println!(
                "    {} - {}  {} {}{trimmed}",
                format_time(clip.start_time),
                format_time(clip.end_time()),
                clip.id,
                clip.source.filename
            );
        }
    }
    if let Some(selected) = timeline.selected() {
        println!("  Selected: {selected}");
    }
    println!("  Playhead: {}", format_time(timeline.playhead()));

    Ok(())
}
