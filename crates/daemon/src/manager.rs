// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry, admission control, eviction, recovery, shutdown.
//!
//! The registry lock protects only the id→session map and the admission
//! reservation count; it is released before any per-session work, so a slow
//! adapter spawn in one create cannot block lookups.

use crate::error::RelayError;
use crate::facade::types::{CreateSessionParams, TerminateOutcome};
use crate::session::{AdapterConnector, Session, SessionArgs};
use chrono::{DateTime, Utc};
use dapmux_core::{RelayConfig, SessionId, SharedClock};
use dapmux_storage::{BreakpointStore, SessionSnapshot, SessionStore};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cadence of the idle/lifetime eviction scan.
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Per-session grace during relay shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct Registry {
    sessions: HashMap<SessionId, Arc<Session>>,
    /// Creates in flight, counted against the cap before they register.
    reserved: usize,
}

pub struct SessionManager {
    config: Arc<RelayConfig>,
    clock: SharedClock,
    connector: AdapterConnector,
    breakpoints: BreakpointStore,
    snapshots: SessionStore,
    registry: Mutex<Registry>,
    recoverable: Mutex<BTreeMap<SessionId, SessionSnapshot>>,
    cancel: CancellationToken,
    evictor: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        config: RelayConfig,
        clock: SharedClock,
        connector: AdapterConnector,
        data_dir: &Path,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            clock,
            connector,
            breakpoints: BreakpointStore::new(data_dir),
            snapshots: SessionStore::new(data_dir),
            registry: Mutex::new(Registry { sessions: HashMap::new(), reserved: 0 }),
            recoverable: Mutex::new(BTreeMap::new()),
            cancel: CancellationToken::new(),
            evictor: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Start the background eviction loop. Call once after construction.
    pub fn start(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(EVICTION_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh relay
            // does not scan an empty registry.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Some(manager) = weak.upgrade() else { break };
                manager.evict_expired().await;
            }
            debug!("eviction loop stopped");
        });
        *self.evictor.lock() = Some(handle);
    }

    /// Create and register a session: capacity check, id mint, adapter
    /// bring-up, persisted-breakpoint preload, snapshot write.
    pub async fn create(&self, params: CreateSessionParams) -> Result<Arc<Session>, RelayError> {
        if !params.project_root.is_absolute() {
            return Err(RelayError::InvalidRequest {
                message: format!(
                    "project_root must be absolute, got {}",
                    params.project_root.display()
                ),
            });
        }

        let id = SessionId::mint();
        let name = params.name.unwrap_or_else(|| default_name(&params.project_root));
        let idle_timeout = params
            .timeout_minutes
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or_else(|| self.config.session_timeout());

        self.build_session(BuildArgs {
            id,
            name,
            project_root: params.project_root,
            watches: Vec::new(),
            idle_timeout,
            default_stop_on_entry: params.stop_on_entry.unwrap_or(false),
            created_at: None,
        })
        .await
    }

    /// Look up a live session, refreshing its activity clock.
    pub fn get(&self, id: &str) -> Result<Arc<Session>, RelayError> {
        let session = self.registry.lock().sessions.get(id).cloned();
        match session {
            Some(session) => {
                session.touch();
                Ok(session)
            }
            None => Err(RelayError::SessionNotFound { id: SessionId::from_string(id) }),
        }
    }

    /// Snapshot of all live sessions, oldest first.
    pub fn list(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<Arc<Session>> =
            self.registry.lock().sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.view().created_at);
        sessions
    }

    pub fn len(&self) -> usize {
        self.registry.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().sessions.is_empty()
    }

    /// Tear down and deregister. Unknown ids (including repeats) get
    /// `SESSION_NOT_FOUND`.
    pub async fn terminate(&self, id: &str) -> Result<TerminateOutcome, RelayError> {
        let session = self
            .registry
            .lock()
            .sessions
            .remove(id)
            .ok_or_else(|| RelayError::SessionNotFound { id: SessionId::from_string(id) })?;

        let outcome = session.terminate(None).await;
        if let Err(e) = self.snapshots.remove(session.id()) {
            warn!(session_id = %session.id(), error = %e, "snapshot removal failed");
        }
        Ok(outcome)
    }

    /// One eviction scan. Errors are logged, never propagated.
    pub async fn evict_expired(&self) {
        let sessions: Vec<Arc<Session>> =
            self.registry.lock().sessions.values().cloned().collect();
        let max_lifetime = self.config.session_max_lifetime();

        for session in sessions {
            let reason = if session.lifetime() > max_lifetime {
                Some("lifetime")
            } else if session.idle_for() > session.idle_timeout() {
                Some("idle")
            } else {
                None
            };
            let Some(reason) = reason else { continue };

            info!(session_id = %session.id(), reason, "evicting session");
            self.registry.lock().sessions.remove(session.id().as_str());
            session.terminate(Some(reason)).await;
            if let Err(e) = self.snapshots.remove(session.id()) {
                warn!(session_id = %session.id(), error = %e, "snapshot removal failed");
            }
        }
    }

    /// Load persisted snapshots at startup. Recovered sessions stay inactive
    /// until `recover_session` makes them live.
    pub fn recover(&self) {
        let snapshots = match self.snapshots.list_recoverable() {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(error = %e, "session recovery scan failed");
                return;
            }
        };
        let mut recoverable = self.recoverable.lock();
        for snapshot in snapshots {
            if !snapshot.project_root.exists() {
                warn!(
                    session_id = %snapshot.id,
                    project_root = %snapshot.project_root.display(),
                    "skipping recoverable session, project root is gone"
                );
                continue;
            }
            info!(session_id = %snapshot.id, "session recoverable");
            recoverable.insert(snapshot.id.clone(), snapshot);
        }
    }

    /// Recoverable snapshots, oldest first.
    pub fn list_recoverable(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> =
            self.recoverable.lock().values().cloned().collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Materialize a recoverable session as a live one in `created` state.
    /// The debuggee is not resurrected; breakpoints reload from the project
    /// store.
    pub async fn recover_session(&self, id: &str) -> Result<Arc<Session>, RelayError> {
        let snapshot = self
            .recoverable
            .lock()
            .remove(id)
            .ok_or_else(|| RelayError::SessionNotFound { id: SessionId::from_string(id) })?;

        let result = self
            .build_session(BuildArgs {
                id: snapshot.id.clone(),
                name: snapshot.name.clone(),
                project_root: snapshot.project_root.clone(),
                watches: snapshot.watches.clone(),
                idle_timeout: self.config.session_timeout(),
                default_stop_on_entry: false,
                created_at: Some(snapshot.created_at),
            })
            .await;

        if result.is_err() {
            // Leave it recoverable for a retry.
            self.recoverable.lock().insert(snapshot.id.clone(), snapshot);
        }
        result
    }

    /// Stop the eviction loop and tear down every session in parallel, each
    /// under a bounded grace window.
    pub async fn shutdown(&self) {
        info!("relay shutting down");
        self.cancel.cancel();
        let evictor = self.evictor.lock().take();
        if let Some(handle) = evictor {
            let _ = handle.await;
        }

        let sessions: Vec<Arc<Session>> = {
            let mut registry = self.registry.lock();
            registry.sessions.drain().map(|(_, session)| session).collect()
        };

        // Sessions already terminal are not recoverable; the rest keep their
        // snapshots so a restart can offer them again.
        for session in &sessions {
            if session.state().is_terminal() {
                if let Err(e) = self.snapshots.remove(session.id()) {
                    warn!(session_id = %session.id(), error = %e, "snapshot removal failed");
                }
            }
        }

        let mut teardowns = JoinSet::new();
        for session in sessions {
            teardowns.spawn(async move {
                if tokio::time::timeout(SHUTDOWN_GRACE, session.terminate(None)).await.is_err() {
                    warn!(session_id = %session.id(), "session teardown exceeded grace window");
                }
            });
        }
        while teardowns.join_next().await.is_some() {}
    }

    async fn build_session(&self, args: BuildArgs) -> Result<Arc<Session>, RelayError> {
        {
            let mut registry = self.registry.lock();
            if registry.sessions.len() + registry.reserved >= self.config.max_sessions {
                return Err(RelayError::SessionLimitReached { max: self.config.max_sessions });
            }
            registry.reserved += 1;
        }

        let staged_breakpoints = match self.breakpoints.load(&args.project_root) {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "persisted breakpoints unreadable, starting empty");
                BTreeMap::new()
            }
        };

        let result = Session::create(SessionArgs {
            id: args.id,
            name: args.name,
            project_root: args.project_root,
            config: Arc::clone(&self.config),
            clock: self.clock.clone(),
            connector: Arc::clone(&self.connector),
            breakpoint_store: self.breakpoints.clone(),
            session_store: self.snapshots.clone(),
            staged_breakpoints,
            watches: args.watches,
            idle_timeout: args.idle_timeout,
            default_stop_on_entry: args.default_stop_on_entry,
            created_at: args.created_at,
        })
        .await;

        let mut registry = self.registry.lock();
        registry.reserved -= 1;
        match result {
            Ok(session) => {
                registry.sessions.insert(session.id().clone(), Arc::clone(&session));
                drop(registry);
                info!(session_id = %session.id(), "session created");
                session.persist_snapshot();
                Ok(session)
            }
            Err(e) => Err(e),
        }
    }
}

struct BuildArgs {
    id: SessionId,
    name: String,
    project_root: PathBuf,
    watches: Vec<String>,
    idle_timeout: Duration,
    default_stop_on_entry: bool,
    created_at: Option<DateTime<Utc>>,
}

fn default_name(project_root: &Path) -> String {
    project_root
        .file_name()
        .map(|n| format!("debug {}", n.to_string_lossy()))
        .unwrap_or_else(|| "debug session".to_string())
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
