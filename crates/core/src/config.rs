// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay configuration.
//!
//! One immutable value, built once at startup from an optional TOML file and
//! environment overrides, then threaded through construction. There is no
//! process-wide settings singleton; tests pass a synthetic config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Relay configuration. Field names match the documented option names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Bind address for the HTTP façade.
    pub host: String,
    pub port: u16,
    /// Admission cap on live sessions.
    pub max_sessions: usize,
    /// Idle eviction threshold.
    pub session_timeout_seconds: u64,
    /// Absolute lifetime eviction threshold.
    pub session_max_lifetime_seconds: u64,
    /// Byte cap on each session's output ring.
    pub output_buffer_max_bytes: usize,
    /// Entry cap on each session's event queue.
    pub event_queue_max: usize,
    /// Per-request DAP deadline.
    pub dap_timeout_seconds: u64,
    /// Deadline for `launch`/`attach`, which cover interpreter startup.
    pub dap_launch_timeout_seconds: u64,
    /// Persistence root; resolved to a home-relative default when unset.
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    /// When true, malformed DAP frames fail the connection instead of being
    /// logged and skipped.
    pub strict_framing: bool,
    /// Interpreter used to spawn the adapter subprocess.
    pub python: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8573,
            max_sessions: 10,
            session_timeout_seconds: 3600,
            session_max_lifetime_seconds: 21600,
            output_buffer_max_bytes: 1024 * 1024,
            event_queue_max: 1000,
            dap_timeout_seconds: 30,
            dap_launch_timeout_seconds: 60,
            data_dir: None,
            log_level: "info".to_string(),
            strict_framing: false,
            python: PathBuf::from("python3"),
        }
    }
}

impl RelayConfig {
    /// Parse a TOML config file. Unknown keys are rejected.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Self = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid("max_sessions must be ≥ 1".into()));
        }
        if self.event_queue_max == 0 {
            return Err(ConfigError::Invalid("event_queue_max must be ≥ 1".into()));
        }
        if self.output_buffer_max_bytes == 0 {
            return Err(ConfigError::Invalid("output_buffer_max_bytes must be ≥ 1".into()));
        }
        if self.dap_timeout_seconds == 0 || self.dap_launch_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("DAP timeouts must be ≥ 1 second".into()));
        }
        Ok(())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_seconds)
    }

    pub fn session_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_max_lifetime_seconds)
    }

    pub fn dap_timeout(&self) -> Duration {
        Duration::from_secs(self.dap_timeout_seconds)
    }

    pub fn dap_launch_timeout(&self) -> Duration {
        Duration::from_secs(self.dap_launch_timeout_seconds)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
