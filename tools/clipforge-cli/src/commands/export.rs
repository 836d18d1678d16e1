//! Export a project to video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clipforge_common::AppConfig;
use clipforge_render_engine::{ExportCompositor, ExportJob, ExportStrategy, Resolution};

use super::load_project;

pub async fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    resolution: Resolution,
    mix_overlay_audio: bool,
    json: bool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let project = load_project(&path)?;
    let output_path = output.unwrap_or_else(|| path.with_extension("mp4"));

    let clips = project.timeline.snapshot();
    let strategy =
        ExportStrategy::select(&clips).map_err(|e| anyhow::anyhow!("Cannot export: {e}"))?;

    println!("  Output: {}", output_path.display());
    println!("  Strategy: {strategy}");
    println!("  Resolution: {resolution}");

    let mut job = ExportJob::new(clips, &output_path).with_resolution(resolution);
    job.mix_overlay_audio = mix_overlay_audio;

    config.export.validate()?;
    let compositor = ExportCompositor::from_config(&config.export)
        .map_err(|e| anyhow::anyhow!("Export unavailable: {e}"))?;
    let mut task = Arc::new(compositor).spawn(job);
    let cancel = task.cancel.clone();

    loop {
        tokio::select! {
            event = task.progress.recv() => match event {
                Some(p) => {
                    print!(
                        "\r  Progress: {:3}% ({:.1}s / {:.1}s)  ",
                        p.percentage, p.current_time, p.total_duration
                    );
                    let _ = std::io::stdout().flush();
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n  Cancelling...");
                cancel.cancel();
            }
        }
    }

    let outcome = task.wait().await;
    if json {
        println!();
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match (outcome.success, outcome.output_path, outcome.error) {
        (true, Some(path), _) => {
            println!("\nExport complete: {}", path.display());
            Ok(())
        }
        (_, _, error) => {
            let reason = error.unwrap_or_else(|| "unknown error".to_string());
            println!("\nExport failed: {reason}");
            anyhow::bail!("Export failed: {reason}")
        }
    }
}
