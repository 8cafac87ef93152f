//! Persistent phase-state record for multi-phase migrations.
//!
//! The only durable state the core writes. The record pins a multi-phase
//! plan by fingerprint and tracks which phases have completed, so `phase
//! next` advances exactly one unit and refuses to run against a different
//! plan file. Writes are atomic (write-temp-then-rename): a crash in the
//! middle leaves either the old or the new content, never a torn file.

use crate::libs::error::LockplaneError;
use crate::libs::plan::PhasePattern;
use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the state file in the project root.
pub const STATE_FILE_NAME: &str = ".lockplane-state.json";

/// Durable progress record for one multi-phase plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    /// SHA-256 of the plan file this record tracks.
    pub plan_fingerprint: String,
    pub operation: String,
    pub pattern: PhasePattern,
    /// The next phase to execute (1-based). One past the end when done.
    pub current_phase: u32,
    pub completed_phases: Vec<u32>,
    #[serde(default)]
    pub last_updated: String,
}

impl PhaseState {
    pub fn begin(plan_fingerprint: String, operation: String, pattern: PhasePattern) -> Self {
        Self {
            plan_fingerprint,
            operation,
            pattern,
            current_phase: 1,
            completed_phases: Vec::new(),
            last_updated: Local::now().to_rfc3339(),
        }
    }

    pub fn is_complete(&self, total_phases: u32) -> bool {
        self.current_phase > total_phases
    }

    /// Marks `phase` complete and advances the cursor by one.
    pub fn complete_phase(&mut self, phase: u32) {
        if !self.completed_phases.contains(&phase) {
            self.completed_phases.push(phase);
            self.completed_phases.sort_unstable();
        }
        self.current_phase = phase + 1;
        self.last_updated = Local::now().to_rfc3339();
    }

    /// Rolls the cursor back one unit after a phase rollback ran.
    pub fn retreat_phase(&mut self) {
        if self.current_phase > 1 {
            self.current_phase -= 1;
        }
        self.completed_phases.retain(|p| *p != self.current_phase);
        self.last_updated = Local::now().to_rfc3339();
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(STATE_FILE_NAME)
    }

    /// Loads the record, returning `None` when no state file exists.
    pub fn load(path: &Path) -> Result<Option<PhaseState>, LockplaneError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LockplaneError::io(path.display().to_string(), &e)),
        };
        let state = serde_json::from_str(&content).map_err(|e| LockplaneError::IOError {
            path: path.display().to_string(),
            detail: format!("corrupt state file: {e}"),
        })?;
        Ok(Some(state))
    }

    /// Atomically rewrites the record.
    pub fn save(&self, path: &Path) -> Result<(), LockplaneError> {
        let serialized = serde_json::to_string_pretty(self).map_err(|e| LockplaneError::IOError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, serialized).map_err(|e| LockplaneError::io(temp.display().to_string(), &e))?;
        std::fs::rename(&temp, path).map_err(|e| LockplaneError::io(path.display().to_string(), &e))?;
        Ok(())
    }

    pub fn remove(path: &Path) -> Result<(), LockplaneError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockplaneError::io(path.display().to_string(), &e)),
        }
    }
}
