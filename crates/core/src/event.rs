// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debug events and program output records.
//!
//! Events are facts the adapter reported, stamped with a per-session
//! monotonic `seq` when enqueued. Output records are the buffered program
//! output, stamped with their own `seq`.

use crate::state::StopReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Event type labels exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Stopped,
    Continued,
    Terminated,
    Output,
    Breakpoint,
    Thread,
    Module,
}

/// Type-tagged event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventBody {
    Stopped {
        reason: StopReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<i64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        hit_breakpoint_ids: Vec<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Continued {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<i64>,
        #[serde(default)]
        all_threads: bool,
    },
    Terminated {
        /// Set to `idle`/`lifetime` when the relay evicted the session.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i64>,
    },
    Output {
        category: OutputCategory,
        text: String,
    },
    Breakpoint {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        verified: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Thread {
        reason: String,
        thread_id: i64,
    },
    Module {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl EventBody {
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::Stopped { .. } => EventKind::Stopped,
            EventBody::Continued { .. } => EventKind::Continued,
            EventBody::Terminated { .. } => EventKind::Terminated,
            EventBody::Output { .. } => EventKind::Output,
            EventBody::Breakpoint { .. } => EventKind::Breakpoint,
            EventBody::Thread { .. } => EventKind::Thread,
            EventBody::Module { .. } => EventKind::Module,
        }
    }
}

/// A debug event as delivered to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEvent {
    /// Monotonic per-session sequence number, never reused.
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub body: EventBody,
}

/// Output stream category, per DAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCategory {
    Stdout,
    Stderr,
    Console,
    Important,
    Telemetry,
}

impl OutputCategory {
    /// Parse a DAP `output.category`; DAP defaults to `console` when absent.
    pub fn from_dap(category: Option<&str>) -> Self {
        match category {
            Some("stdout") => OutputCategory::Stdout,
            Some("stderr") => OutputCategory::Stderr,
            Some("important") => OutputCategory::Important,
            Some("telemetry") => OutputCategory::Telemetry,
            _ => OutputCategory::Console,
        }
    }
}

/// One buffered line (or chunk) of program output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Monotonic per-session sequence number, ≥ 1.
    pub seq: u64,
    pub category: OutputCategory,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Where a paused session currently sits, from the top stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub line: u32,
    pub name: String,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
