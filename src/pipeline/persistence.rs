// to be called on startup and quit; keeps the session settings between runs
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::pipeline::project::ProjectState;

const DRUMSEQ_DIR: &str = ".drumseq";
const PROJECT_FILE: &str = "project.json";
const LOG_FILE: &str = "drumseq.log";

// <project_dir>/.drumseq/project.json
fn project_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(DRUMSEQ_DIR).join(PROJECT_FILE)
}

// <project_dir>/.drumseq/drumseq.log
pub fn log_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(DRUMSEQ_DIR).join(LOG_FILE)
}

pub fn ensure_project_dir(project_dir: &Path) -> anyhow::Result<PathBuf> {
    let dir = project_dir.join(DRUMSEQ_DIR);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

/// `None` when there is no saved project yet or it can't be read.
pub fn load_project(project_dir: &Path) -> Option<ProjectState> {
    let path = project_file_path(project_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!(target: "session", "ignoring unreadable {}: {e}", path.display());
            None
        }
    }
}

pub fn save_project(project_dir: &Path, state: &ProjectState) -> anyhow::Result<()> {
    ensure_project_dir(project_dir)?;
    let path = project_file_path(project_dir);
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
