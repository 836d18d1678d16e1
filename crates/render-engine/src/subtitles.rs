//! SRT generation for burned-in captions.

use std::path::Path;

use clipforge_project_model::Caption;

/// Generate SRT content from timeline-clock cues.
pub fn generate_srt(captions: &[Caption]) -> String {
    let mut output = String::new();

    for (i, cue) in captions.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start),
            format_srt_time(cue.end),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
pub fn format_srt_time(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Write cues to `path` as SRT, ordered by start time.
pub fn write_srt(path: &Path, captions: &[Caption]) -> std::io::Result<()> {
    let mut ordered = captions.to_vec();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));
    std::fs::write(path, generate_srt(&ordered))
}
