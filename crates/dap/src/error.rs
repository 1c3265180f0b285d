// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors from the DAP layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DapError {
    #[error("adapter not initialized")]
    NotInitialized,

    #[error("{command} failed: {message}")]
    RequestFailed {
        command: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("request cancelled: client stopped")]
    Cancelled,

    #[error("adapter connection lost: {0}")]
    Connection(String),

    #[error("failed to spawn adapter: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("malformed DAP frame: {0}")]
    Frame(String),

    #[error("invalid {kind} config: {message}")]
    InvalidConfig { kind: &'static str, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DapError {
    /// Whether this error means the adapter connection is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DapError::Connection(_) | DapError::Cancelled | DapError::Spawn { .. }
        )
    }
}
