// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable project key derivation.
//!
//! The key is the filename stem for a project's persisted state, so two paths
//! that resolve to the same directory must produce the same key. Paths are
//! canonicalized (symlinks resolved) when they exist; a path that cannot be
//! resolved keys on its lexical form, so lookups stay deterministic even for
//! directories that have since vanished.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Digest length in hex characters.
const KEY_LEN: usize = 16;

/// Derive the 16-hex project key for `project_root`.
pub fn project_key(project_root: &Path) -> String {
    let resolved = project_root
        .canonicalize()
        .unwrap_or_else(|_| project_root.to_path_buf());
    let digest = Sha256::digest(resolved.as_os_str().as_encoded_bytes());
    let mut key = String::with_capacity(KEY_LEN);
    for byte in digest.iter().take(KEY_LEN / 2) {
        key.push_str(&format!("{byte:02x}"));
    }
    key
}

#[cfg(test)]
#[path = "project_key_tests.rs"]
mod tests;
