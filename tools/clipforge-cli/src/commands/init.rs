//! Initialize a new ClipForge project.

use std::path::PathBuf;

use clipforge_project_model::EditorProject;

pub fn run(path: PathBuf, name: Option<String>) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("Refusing to overwrite existing file: {}", path.display());
    }

    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    });
    println!("Creating project '{}' at {}", name, path.display());

    let project = EditorProject::create(&path, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  ID: {}", project.id);
    println!("  Version: {}", project.version);
    println!();
    println!("Next: clipforge import {} <MEDIA> --duration <SECS>", path.display());

    Ok(())
}
