// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use dapmux_core::RelayConfig;
use std::path::PathBuf;

/// Relay version, stamped into logs at startup.
pub const RELAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve the data directory:
/// `DAPMUX_DATA_DIR` > `XDG_DATA_HOME/dapmux` > `~/.local/share/dapmux`.
pub fn data_dir(config: &RelayConfig) -> PathBuf {
    if let Ok(dir) = std::env::var("DAPMUX_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = &config.data_dir {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dapmux")
}

/// Apply `DAPMUX_*` overrides on top of a loaded config.
pub fn apply_overrides(config: &mut RelayConfig) {
    if let Ok(host) = std::env::var("DAPMUX_HOST") {
        config.host = host;
    }
    if let Some(port) = parsed("DAPMUX_PORT") {
        config.port = port;
    }
    if let Some(max) = parsed("DAPMUX_MAX_SESSIONS") {
        config.max_sessions = max;
    }
    if let Ok(level) = std::env::var("DAPMUX_LOG") {
        config.log_level = level;
    }
    if let Ok(python) = std::env::var("DAPMUX_PYTHON") {
        config.python = PathBuf::from(python);
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
