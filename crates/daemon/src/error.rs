// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay error taxonomy.
//!
//! Every variant maps to a stable wire code and an HTTP status class so the
//! external transports can render errors mechanically. Timeouts and
//! cancellations are first-class variants, not exceptions-in-disguise.

use dapmux_core::{SessionId, SessionState};
use dapmux_dap::{AttachConfig, DapError, LaunchConfig};
use dapmux_storage::PersistenceError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("session {id} not found")]
    SessionNotFound { id: SessionId },

    #[error("session limit of {max} reached")]
    SessionLimitReached { max: usize },

    #[error("session {id} expired")]
    SessionExpired { id: SessionId },

    #[error("{operation} not allowed in state {actual} (requires {})",
        required.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("|"))]
    InvalidSessionState {
        operation: &'static str,
        actual: SessionState,
        required: Vec<SessionState>,
    },

    #[error("invalid breakpoint line {line} (lines start at 1)")]
    BreakpointInvalidLine { line: u32 },

    #[error("breakpoint file {path} is not an absolute path")]
    BreakpointPathNotAbsolute { path: PathBuf },

    #[error("{command} timed out after {seconds}s")]
    DapTimeout { command: String, seconds: u64 },

    #[error("adapter connection error: {message}")]
    DapConnection { message: String },

    #[error("adapter not initialized")]
    DapNotInitialized,

    #[error("launch failed: {message}")]
    LaunchFailed { message: String },

    #[error("launch target not found: {path}")]
    LaunchScriptNotFound { path: PathBuf },

    #[error("launch failed with syntax error: {message}")]
    LaunchSyntaxError { message: String },

    #[error("attach failed: {message}")]
    AttachFailed { message: String },

    #[error("attach timed out after {seconds}s")]
    AttachTimeout { seconds: u64 },

    #[error("attach refused: {message}")]
    AttachRefused { message: String },

    #[error("thread {thread_id} not found")]
    ThreadNotFound { thread_id: i64 },

    #[error("frame {frame_id} not found")]
    FrameNotFound { frame_id: i64 },

    #[error("variables reference {reference} not found")]
    VariableNotFound { reference: i64 },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl RelayError {
    /// Stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            RelayError::SessionLimitReached { .. } => "SESSION_LIMIT_REACHED",
            RelayError::SessionExpired { .. } => "SESSION_EXPIRED",
            RelayError::InvalidSessionState { .. } => "INVALID_SESSION_STATE",
            RelayError::BreakpointInvalidLine { .. } => "BREAKPOINT_INVALID_LINE",
            RelayError::BreakpointPathNotAbsolute { .. } => "BREAKPOINT_INVALID_PATH",
            RelayError::DapTimeout { .. } => "DEBUGPY_TIMEOUT",
            RelayError::DapConnection { .. } => "DAP_CONNECTION_ERROR",
            RelayError::DapNotInitialized => "DAP_NOT_INITIALIZED",
            RelayError::LaunchFailed { .. } => "LAUNCH_FAILED",
            RelayError::LaunchScriptNotFound { .. } => "LAUNCH_SCRIPT_NOT_FOUND",
            RelayError::LaunchSyntaxError { .. } => "LAUNCH_SYNTAX_ERROR",
            RelayError::AttachFailed { .. } => "ATTACH_FAILED",
            RelayError::AttachTimeout { .. } => "ATTACH_TIMEOUT",
            RelayError::AttachRefused { .. } => "ATTACH_REFUSED",
            RelayError::ThreadNotFound { .. } => "THREAD_NOT_FOUND",
            RelayError::FrameNotFound { .. } => "FRAME_NOT_FOUND",
            RelayError::VariableNotFound { .. } => "VARIABLE_NOT_FOUND",
            RelayError::Persistence(e) => e.code(),
            RelayError::InvalidRequest { .. } => "INVALID_REQUEST",
        }
    }

    /// HTTP status class for the external façades.
    pub fn http_status(&self) -> u16 {
        match self {
            RelayError::SessionNotFound { .. } => 404,
            RelayError::SessionLimitReached { .. } => 429,
            RelayError::SessionExpired { .. } => 410,
            RelayError::InvalidSessionState { .. } => 409,
            RelayError::BreakpointInvalidLine { .. }
            | RelayError::BreakpointPathNotAbsolute { .. } => 400,
            RelayError::DapTimeout { .. } => 504,
            RelayError::DapConnection { .. } => 502,
            RelayError::DapNotInitialized => 409,
            RelayError::LaunchFailed { .. } => 500,
            RelayError::LaunchScriptNotFound { .. } => 400,
            RelayError::LaunchSyntaxError { .. } => 400,
            RelayError::AttachFailed { .. } => 500,
            RelayError::AttachTimeout { .. } => 504,
            RelayError::AttachRefused { .. } => 502,
            RelayError::ThreadNotFound { .. }
            | RelayError::FrameNotFound { .. }
            | RelayError::VariableNotFound { .. } => 404,
            RelayError::Persistence(_) => 500,
            RelayError::InvalidRequest { .. } => 400,
        }
    }

    /// Generic mapping for DAP failures outside launch/attach.
    pub fn from_dap(err: DapError) -> Self {
        match err {
            DapError::NotInitialized => RelayError::DapNotInitialized,
            DapError::Timeout { command, seconds } => RelayError::DapTimeout { command, seconds },
            DapError::Cancelled => {
                RelayError::DapConnection { message: "request cancelled".to_string() }
            }
            DapError::Connection(message) => RelayError::DapConnection { message },
            DapError::Spawn { source } => {
                RelayError::DapConnection { message: format!("adapter spawn failed: {source}") }
            }
            DapError::Frame(message) => RelayError::DapConnection { message },
            DapError::Io(e) => RelayError::DapConnection { message: e.to_string() },
            DapError::Json(e) => RelayError::InvalidRequest { message: e.to_string() },
            DapError::RequestFailed { message, .. } => RelayError::InvalidRequest { message },
            DapError::InvalidConfig { message, .. } => RelayError::InvalidRequest { message },
        }
    }

    /// Launch-specific mapping: classify the adapter's failure text.
    pub fn from_launch(err: DapError, config: &LaunchConfig) -> Self {
        match err {
            DapError::RequestFailed { message, .. } => {
                let lowered = message.to_lowercase();
                if lowered.contains("no such file")
                    || lowered.contains("does not exist")
                    || lowered.contains("can't open file")
                {
                    let path = config
                        .program
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(config.module.clone().unwrap_or_default()));
                    RelayError::LaunchScriptNotFound { path }
                } else if lowered.contains("syntaxerror") {
                    RelayError::LaunchSyntaxError { message }
                } else {
                    RelayError::LaunchFailed { message }
                }
            }
            other => Self::from_dap(other),
        }
    }

    /// Attach-specific mapping.
    pub fn from_attach(err: DapError, config: &AttachConfig) -> Self {
        match err {
            DapError::RequestFailed { message, .. } => {
                let lowered = message.to_lowercase();
                if lowered.contains("refused") {
                    RelayError::AttachRefused { message }
                } else if lowered.contains("timed out") || lowered.contains("timeout") {
                    RelayError::AttachTimeout { seconds: config.connect_timeout_seconds }
                } else {
                    RelayError::AttachFailed { message }
                }
            }
            DapError::Timeout { seconds, .. } => RelayError::AttachTimeout { seconds },
            other => Self::from_dap(other),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
