// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session snapshot store, for recovery across relay restarts.
//!
//! A snapshot holds just enough to re-create a session in `created` state:
//! id, name, project root, creation time, and watch expressions. Breakpoints
//! live in the per-project store and are re-staged from there. The debuggee
//! subprocess is never part of a snapshot.

use crate::atomic::{atomic_write_json, read_json, remove_file, PersistenceError};
use chrono::{DateTime, Utc};
use dapmux_core::SessionId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub name: String,
    pub project_root: PathBuf,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub watches: Vec<String>,
}

/// Store rooted at `<data_dir>/sessions`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self { dir: data_dir.join("sessions") }
    }

    fn file_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write (or rewrite) one session's snapshot.
    pub fn snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), PersistenceError> {
        atomic_write_json(&self.file_for(&snapshot.id), snapshot)
    }

    /// Remove a session's snapshot, reporting whether one existed.
    pub fn remove(&self, id: &SessionId) -> Result<bool, PersistenceError> {
        remove_file(&self.file_for(id))
    }

    /// Enumerate all recoverable snapshots.
    ///
    /// Unreadable or non-snapshot files are skipped with a warning rather
    /// than failing recovery wholesale.
    pub fn list_recoverable(&self) -> Result<Vec<SessionSnapshot>, PersistenceError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Io { path: self.dir.clone(), source });
            }
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable sessions dir entry");
                    continue;
                }
            };
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match read_json::<SessionSnapshot>(&path) {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping bad snapshot"),
            }
        }
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(snapshots)
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
