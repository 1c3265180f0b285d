// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Breakpoint specifications.
//!
//! The relay's authoritative breakpoint set lives per file on the session;
//! the adapter's last verification result is cached alongside but is never
//! used for replay. A spec with `log_message` set is a logpoint: it emits
//! output instead of halting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_enabled() -> bool {
    true
}

/// A breakpoint as requested by the client and persisted per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointSpec {
    pub source_path: PathBuf,
    /// 1-based source line.
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl BreakpointSpec {
    pub fn new(source_path: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            source_path: source_path.into(),
            line,
            column: None,
            condition: None,
            hit_condition: None,
            log_message: None,
            enabled: true,
        }
    }

    /// Uniqueness key within a file.
    pub fn position(&self) -> (u32, Option<u32>) {
        (self.line, self.column)
    }

    /// Whether this spec is a logpoint (emits output, does not halt).
    pub fn is_logpoint(&self) -> bool {
        self.log_message.is_some()
    }
}

/// Insert or replace a spec in a file's ordered set, keyed by (line, column).
///
/// Returns true when an existing spec at the same position was replaced.
pub fn upsert_spec(specs: &mut Vec<BreakpointSpec>, spec: BreakpointSpec) -> bool {
    match specs.iter_mut().find(|s| s.position() == spec.position()) {
        Some(slot) => {
            *slot = spec;
            true
        }
        None => {
            specs.push(spec);
            false
        }
    }
}

/// A breakpoint as last verified by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedBreakpoint {
    /// Adapter-assigned id, when the adapter issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub verified: bool,
    pub source_path: PathBuf,
    /// The line the adapter actually bound, which may differ from the request.
    pub line: u32,
    /// Adapter diagnostic, e.g. "line has no executable code".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerifiedBreakpoint {
    /// An unverified placeholder for a spec staged before launch.
    pub fn pending(spec: &BreakpointSpec) -> Self {
        Self {
            id: None,
            verified: false,
            source_path: spec.source_path.clone(),
            line: spec.line,
            message: None,
        }
    }
}

#[cfg(test)]
#[path = "breakpoint_tests.rs"]
mod tests;
