// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-facing view types for the façade contracts.
//!
//! These are what the external HTTP and MCP transports serialize; state and
//! stop-reason labels are the documented wire labels.

use chrono::{DateTime, Utc};
use dapmux_core::{
    BreakpointSpec, FrameLocation, SessionId, SessionState, StopReason, VerifiedBreakpoint,
};
use dapmux_dap::types::Variable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::output::OutputStats;

/// Snapshot of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub name: String,
    pub project_root: PathBuf,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_frame_location: Option<FrameLocation>,
    pub adapter_capabilities: BTreeMap<String, bool>,
    pub watch_expressions: Vec<String>,
    pub breakpoint_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
}

/// `get_info` detail: the view plus counters.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    #[serde(flatten)]
    pub view: SessionView,
    pub uptime_seconds: u64,
    pub last_event_seq: u64,
    pub pending_events: usize,
    pub output: OutputStats,
    pub breakpoints_by_file: BTreeMap<PathBuf, Vec<BreakpointSpec>>,
}

/// Result of `terminate_session`.
#[derive(Debug, Clone, Serialize)]
pub struct TerminateOutcome {
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    pub runtime_seconds: u64,
}

/// Result of `set_breakpoints`: the adapter's verification plus any
/// persistence warning (persistence never fails the in-memory mutation).
#[derive(Debug, Clone, Serialize)]
pub struct BreakpointUpdate {
    pub breakpoints: Vec<VerifiedBreakpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

/// Result of `clear_breakpoints`.
#[derive(Debug, Clone, Serialize)]
pub struct ClearBreakpointsOutcome {
    pub removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

/// Result of `evaluate`. `error` set means the expression raised; the call
/// itself succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One watch expression's evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct WatchEvaluation {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `inspect_variable`: an evaluation plus one level of children.
#[derive(Debug, Clone, Serialize)]
pub struct VariableInspection {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub children: Vec<Variable>,
}

/// Events page with the session's current status attached, so a poller can
/// track state without a second call.
#[derive(Debug, Clone, Serialize)]
pub struct EventsPage {
    pub events: Vec<dapmux_core::DebugEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub cursor_skipped: bool,
    pub session_state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

/// Parameters for `create_session`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionParams {
    pub project_root: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
    /// Per-session idle timeout override.
    #[serde(default)]
    pub timeout_minutes: Option<u64>,
    /// Default for launches that do not set `stop_on_entry` themselves.
    #[serde(default)]
    pub stop_on_entry: Option<bool>,
}

/// Filters for `list_sessions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilters {
    #[serde(default)]
    pub state: Option<SessionState>,
    #[serde(default)]
    pub project_root: Option<PathBuf>,
}

/// A recoverable session, as listed before recovery.
#[derive(Debug, Clone, Serialize)]
pub struct RecoverableSession {
    pub session_id: SessionId,
    pub name: String,
    pub project_root: PathBuf,
    pub created_at: DateTime<Utc>,
    pub watches: Vec<String>,
}
