//! Persisted planner state: history log, learned categories, allocations
//!
//! Stored as one JSON document. Writes go through a temp file in the same
//! directory and are renamed into place.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::journal::{ArchiveOutcome, CategoryMap};
use crate::plan_stats::Allocations;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerState {
    /// Newline-separated history log.
    pub history: String,
    pub category_map: CategoryMap,
    pub allocations: Allocations,
}

impl PlannerState {
    /// Take the history and learned categories produced by an archive.
    pub fn apply_archive(&mut self, outcome: ArchiveOutcome) {
        self.history = outcome.history;
        self.category_map = outcome.category_map;
    }
}

/// Load state from `path`. A missing file is an empty state.
pub fn load_state(path: &Path) -> Result<PlannerState, PlannerError> {
    if !path.exists() {
        log::info!("No state at {}, starting fresh", path.display());
        return Ok(PlannerState::default());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| PlannerError::CorruptState {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn save_state(path: &Path, state: &PlannerState) -> Result<(), PlannerError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(state)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PlannerError::Io(e.error.to_string()))?;

    log::debug!("Saved state to {}", path.display());
    Ok(())
}
