//! Validate a ClipForge project file.

use std::path::PathBuf;

use clipforge_render_engine::ExportStrategy;

use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    let project = load_project(&path)?;

    println!("  Name: {}", project.name);
    println!("  Version: {}", project.version);
    println!("  Sources: {}", project.library.len());
    println!("  Placed clips: {}", project.timeline.len());

    match ExportStrategy::select(&project.timeline.snapshot()) {
        Ok(strategy) => println!("  Export strategy: {strategy}"),
        Err(e) => println!("  Export strategy: unavailable ({e})"),
    }

    let errors = project.validate_sources();
    if errors.is_empty() {
        println!("  Sources: All present");
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Export may fail.",
            errors.len()
        );
    }

    Ok(())
}
