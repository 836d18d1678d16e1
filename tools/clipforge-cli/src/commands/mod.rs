pub mod check;
pub mod edit;
pub mod export;
pub mod import;
pub mod info;
pub mod init;
pub mod validate;

use std::path::Path;

use clipforge_project_model::EditorProject;

pub(crate) fn load_project(path: &Path) -> anyhow::Result<EditorProject> {
    EditorProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

pub(crate) fn save_project(project: &mut EditorProject, path: &Path) -> anyhow::Result<()> {
    project
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))
}
