// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state machine.
//!
//! Externally-initiated operations must follow the transition table below;
//! transitions driven by adapter events are authoritative and bypass it
//! (the adapter knows the debuggee's true state).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a debug session. Serialized labels are the wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Launching,
    Running,
    Paused,
    Terminated,
    Failed,
}

impl SessionState {
    /// Wire label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Launching => "launching",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Terminated => "terminated",
            SessionState::Failed => "failed",
        }
    }

    /// Whether an externally-initiated transition to `next` is legal.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, Launching)
                | (Created, Failed)
                | (Launching, Running)
                | (Launching, Paused)
                | (Launching, Terminated)
                | (Launching, Failed)
                | (Running, Paused)
                | (Running, Terminated)
                | (Running, Failed)
                | (Paused, Running)
                | (Paused, Terminated)
                | (Paused, Failed)
        )
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session stopped. Mirrors the DAP `stopped` event reasons the relay
/// recognizes; serialized labels are the wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Breakpoint,
    Step,
    Exception,
    Pause,
    Entry,
    Goto,
    FunctionBreakpoint,
    DataBreakpoint,
}

impl StopReason {
    /// Parse a DAP `stopped.reason` string. DAP uses space-separated words
    /// for the breakpoint variants.
    pub fn from_dap(reason: &str) -> Option<Self> {
        match reason {
            "breakpoint" => Some(StopReason::Breakpoint),
            "step" => Some(StopReason::Step),
            "exception" => Some(StopReason::Exception),
            "pause" => Some(StopReason::Pause),
            "entry" => Some(StopReason::Entry),
            "goto" => Some(StopReason::Goto),
            "function breakpoint" => Some(StopReason::FunctionBreakpoint),
            "data breakpoint" => Some(StopReason::DataBreakpoint),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Breakpoint => "breakpoint",
            StopReason::Step => "step",
            StopReason::Exception => "exception",
            StopReason::Pause => "pause",
            StopReason::Entry => "entry",
            StopReason::Goto => "goto",
            StopReason::FunctionBreakpoint => "function_breakpoint",
            StopReason::DataBreakpoint => "data_breakpoint",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
