// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dapmuxd: the relay daemon.
//!
//! Thin shell around the session core: load config, set up logging, take the
//! single-instance lock, recover persisted sessions, and park until a
//! shutdown signal. The HTTP/MCP transports mount on [`DebugFacade`].

use clap::Parser;
use dapmux_core::{RelayConfig, SystemClock};
use dapmux_daemon::session::spawn_connector;
use dapmux_daemon::{env, DebugFacade, SessionManager};
use fs2::FileExt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dapmuxd", version, about = "DAP relay daemon")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persistence root (overrides config and DAPMUX_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level filter (overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> Result<RelayConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => RelayConfig::from_file(path)?,
        None => RelayConfig::default(),
    };
    env::apply_overrides(&mut config);
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(
    config: &RelayConfig,
    data_dir: &std::path::Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir.join("logs"))?;
    let file_appender = tracing_appender::rolling::daily(data_dir.join("logs"), "dapmuxd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("DAPMUX_LOG")
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;
    Ok(guard)
}

/// Hold an advisory lock for the daemon's lifetime so two relays never share
/// a data directory.
fn acquire_lock(data_dir: &std::path::Path) -> Result<File, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;
    let lock_path = data_dir.join("dapmuxd.lock");
    let file = File::create(&lock_path)?;
    file.try_lock_exclusive().map_err(|_| {
        format!("another dapmuxd already owns {}", lock_path.display())
    })?;
    Ok(file)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dapmuxd: {e}");
            std::process::exit(2);
        }
    };
    let data_dir = env::data_dir(&config);

    let _log_guard = match init_logging(&config, &data_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("dapmuxd: logging setup failed: {e}");
            std::process::exit(2);
        }
    };

    let _lock = match acquire_lock(&data_dir) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    info!(
        version = env::RELAY_VERSION,
        data_dir = %data_dir.display(),
        max_sessions = config.max_sessions,
        "dapmuxd starting"
    );

    let manager = SessionManager::new(
        config,
        Arc::new(SystemClock),
        spawn_connector(),
        &data_dir,
    );
    manager.start();
    manager.recover();
    let recoverable = manager.list_recoverable().len();
    if recoverable > 0 {
        info!(count = recoverable, "sessions recoverable from previous run");
    }

    // The transports (HTTP, MCP) mount here.
    let _facade = DebugFacade::new(Arc::clone(&manager));

    wait_for_shutdown_signal().await;
    manager.shutdown().await;
    info!("dapmuxd stopped");
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "SIGTERM handler unavailable, relying on ctrl-c");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
        _ = sigterm.recv() => info!("SIGTERM received"),
    }
}
