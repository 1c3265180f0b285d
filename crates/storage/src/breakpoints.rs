// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project breakpoint store.
//!
//! One JSON file per project under `<data_dir>/breakpoints/<project_key>.json`
//! holding the authoritative breakpoint specs by absolute source path. The
//! file also records the project root it was derived from, so operators can
//! map files back to projects.

use crate::atomic::{atomic_write_json, read_json, remove_file, PersistenceError};
use crate::project_key::project_key;
use dapmux_core::BreakpointSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectBreakpoints {
    project_root: PathBuf,
    breakpoints: BTreeMap<PathBuf, Vec<BreakpointSpec>>,
}

/// Store rooted at `<data_dir>/breakpoints`.
#[derive(Debug, Clone)]
pub struct BreakpointStore {
    dir: PathBuf,
}

impl BreakpointStore {
    pub fn new(data_dir: &Path) -> Self {
        Self { dir: data_dir.join("breakpoints") }
    }

    fn file_for(&self, project_root: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", project_key(project_root)))
    }

    /// Load the project's breakpoint map; empty if nothing was persisted.
    pub fn load(
        &self,
        project_root: &Path,
    ) -> Result<BTreeMap<PathBuf, Vec<BreakpointSpec>>, PersistenceError> {
        let stored: Option<ProjectBreakpoints> = read_json(&self.file_for(project_root))?;
        Ok(stored.map(|p| p.breakpoints).unwrap_or_default())
    }

    /// Replace the project's entire breakpoint map.
    pub fn save(
        &self,
        project_root: &Path,
        breakpoints: &BTreeMap<PathBuf, Vec<BreakpointSpec>>,
    ) -> Result<(), PersistenceError> {
        if breakpoints.is_empty() {
            remove_file(&self.file_for(project_root))?;
            return Ok(());
        }
        let doc = ProjectBreakpoints {
            project_root: project_root.to_path_buf(),
            breakpoints: breakpoints.clone(),
        };
        atomic_write_json(&self.file_for(project_root), &doc)
    }

    /// Replace one file's specs; an empty list removes that file's entry.
    pub fn update_file(
        &self,
        project_root: &Path,
        source_path: &Path,
        specs: &[BreakpointSpec],
    ) -> Result<(), PersistenceError> {
        let mut breakpoints = self.load(project_root)?;
        if specs.is_empty() {
            breakpoints.remove(source_path);
        } else {
            breakpoints.insert(source_path.to_path_buf(), specs.to_vec());
        }
        self.save(project_root, &breakpoints)
    }

    /// Drop everything persisted for the project.
    pub fn clear(&self, project_root: &Path) -> Result<bool, PersistenceError> {
        remove_file(&self.file_for(project_root))
    }
}

#[cfg(test)]
#[path = "breakpoints_tests.rs"]
mod tests;
