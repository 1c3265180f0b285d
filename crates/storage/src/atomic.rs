// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file primitives.
//!
//! Writes go to `<target>.tmp`, are fsynced, then renamed over the target.
//! Readers tolerate "absent" (a rename may be in flight); a file that exists
//! but does not parse is an invalid-format error, not absence.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("write to {path} failed: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has invalid format: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    /// Stable wire code for the error taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            PersistenceError::WriteFailed { .. } => "PERSISTENCE_WRITE_FAILED",
            PersistenceError::InvalidFormat { .. } => "PERSISTENCE_INVALID_FORMAT",
            PersistenceError::Io { .. } => "PERSISTENCE_WRITE_FAILED",
        }
    }
}

/// Serialize `value` and atomically replace `target` with it.
///
/// Parent directories are created as needed. On any failure the temp file is
/// removed and the prior target (if any) is left intact.
pub fn atomic_write_json<T: Serialize>(target: &Path, value: &T) -> Result<(), PersistenceError> {
    let write_failed = |source: std::io::Error| PersistenceError::WriteFailed {
        path: target.to_path_buf(),
        source,
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let bytes = serde_json::to_vec_pretty(value).map_err(|source| {
        PersistenceError::InvalidFormat { path: target.to_path_buf(), source }
    })?;

    let tmp = tmp_path(target);
    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, target)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(write_failed(source));
    }
    Ok(())
}

/// Read and parse `target`. Returns `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(target: &Path) -> Result<Option<T>, PersistenceError> {
    let bytes = match fs::read(target) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Io { path: target.to_path_buf(), source });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| PersistenceError::InvalidFormat { path: target.to_path_buf(), source })
}

/// Delete `target`, reporting whether it existed.
pub fn remove_file(target: &Path) -> Result<bool, PersistenceError> {
    match fs::remove_file(target) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(PersistenceError::Io { path: target.to_path_buf(), source }),
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
