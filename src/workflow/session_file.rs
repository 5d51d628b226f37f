use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::state::WorkflowState;

pub fn ensure_session_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_dir = home_dir.join(".config").join("pagecraft").join("sessions");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn session_path(name: &str) -> Result<PathBuf> {
    Ok(ensure_session_dir()?.join(format!("{name}.json")))
}

/// Write the state to disk using its export format, so a session file
/// is also a valid import document.
pub fn persist_state(session_file: &Path, state: &WorkflowState) -> Result<()> {
    fs::write(session_file, state.export())?;
    Ok(())
}

/// Load a session file, or start a fresh state if the file does not
/// exist yet. A present-but-unparseable file is an error rather than a
/// silent reset.
pub fn load_state(session_file: &Path) -> Result<WorkflowState> {
    if !session_file.exists() {
        return Ok(WorkflowState::new());
    }

    let contents = fs::read_to_string(session_file)?;
    let mut state = WorkflowState::new();
    if !state.import(&contents) {
        anyhow::bail!(
            "session file {} is not a valid workflow export",
            session_file.display()
        );
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");

        let mut state = WorkflowState::new();
        state.project_name = "KetoBurn".to_string();
        state.complete_step(1);

        persist_state(&path, &state)?;
        let loaded = load_state(&path)?;

        assert_eq!(loaded.project_name, "KetoBurn");
        assert_eq!(loaded.current_step, 2);
        assert!(loaded.is_step_completed(1));
        Ok(())
    }

    #[test]
    fn missing_file_yields_fresh_state() -> Result<()> {
        let dir = tempdir()?;
        let state = load_state(&dir.path().join("absent.json"))?;
        assert_eq!(state.current_step, 1);
        Ok(())
    }

    #[test]
    fn corrupt_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"no\": \"required fields\"}")?;
        assert!(load_state(&path).is_err());
        Ok(())
    }
}
