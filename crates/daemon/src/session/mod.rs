// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A debug session: one adapter, one debuggee, one queue/buffer pair.
//!
//! Two locks serialize a session. The async `op_lock` orders
//! externally-initiated mutations across their DAP round-trips; the short
//! `core` lock guards the state fields and is taken by both operations and
//! the adapter's event callback. Event-driven transitions are authoritative:
//! they do not consult the transition table, because the adapter knows the
//! debuggee's true state.

mod ops;

use crate::error::RelayError;
use crate::events::EventQueue;
use crate::facade::types::{SessionInfo, SessionView, TerminateOutcome};
use crate::output::OutputBuffer;
use chrono::{DateTime, Utc};
use dapmux_core::{
    BreakpointSpec, EventBody, FrameLocation, RelayConfig, SessionId, SessionState, SharedClock,
    StopReason, VerifiedBreakpoint,
};
use dapmux_dap::adapter::{AdapterEvent, AdapterOptions, DebugAdapter, EventSink, ExceptionFilter};
use dapmux_dap::DapError;
use dapmux_storage::{BreakpointStore, SessionSnapshot, SessionStore};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How a session's adapter reaches its transport. Production spawns the
/// debugpy subprocess; tests connect an in-process scripted peer.
pub type AdapterConnector = Arc<
    dyn for<'a> Fn(
            &'a DebugAdapter,
        ) -> BoxFuture<'a, Result<BTreeMap<String, bool>, DapError>>
        + Send
        + Sync,
>;

/// The production connector: spawn the adapter subprocess.
pub fn spawn_connector() -> AdapterConnector {
    Arc::new(
        |adapter: &DebugAdapter| -> BoxFuture<'_, Result<BTreeMap<String, bool>, DapError>> {
            Box::pin(async move { adapter.initialize().await })
        },
    )
}

/// Mutable session state, behind the short core lock.
pub(crate) struct SessionCore {
    pub state: SessionState,
    pub stop_reason: Option<StopReason>,
    pub created_at: DateTime<Utc>,
    pub created_instant: Instant,
    pub last_activity_at: DateTime<Utc>,
    pub last_activity_instant: Instant,
    pub stopped_thread_id: Option<i64>,
    /// Total stopped events observed; lets resume ops detect a stop that
    /// raced their own response.
    pub stop_count: u64,
    pub current_frame: Option<FrameLocation>,
    pub capabilities: BTreeMap<String, bool>,
    pub watches: Vec<String>,
    pub breakpoints: BTreeMap<PathBuf, Vec<BreakpointSpec>>,
    /// Last verification from the adapter; never authoritative for replay.
    pub verified: BTreeMap<PathBuf, Vec<VerifiedBreakpoint>>,
    pub exception_filters: Vec<ExceptionFilter>,
    pub exit_code: Option<i64>,
    /// Guards against a second terminated event in the queue.
    pub terminated_enqueued: bool,
}

/// State shared with the adapter's event callback. The callback holds a weak
/// handle, so session teardown breaks the reference cycle.
pub(crate) struct SessionShared {
    pub core: Mutex<SessionCore>,
    pub output: OutputBuffer,
    pub events: EventQueue,
    pub clock: SharedClock,
}

impl SessionShared {
    /// Apply one adapter event: mutate state, then enqueue.
    ///
    /// Runs synchronously on the DAP reader task, so events are observed in
    /// exactly the order the adapter emitted them.
    fn apply_adapter_event(&self, event: AdapterEvent) {
        match event {
            AdapterEvent::Stopped { reason, thread_id, hit_breakpoint_ids, description } => {
                {
                    let mut core = self.core.lock();
                    core.state = SessionState::Paused;
                    core.stop_reason = Some(reason);
                    core.stopped_thread_id = thread_id;
                    core.stop_count += 1;
                    // Refreshed lazily by the next stack trace.
                    core.current_frame = None;
                }
                self.events.put(EventBody::Stopped {
                    reason,
                    thread_id,
                    hit_breakpoint_ids,
                    description,
                });
            }
            AdapterEvent::Continued { thread_id, all_threads } => {
                {
                    let mut core = self.core.lock();
                    if !core.state.is_terminal() {
                        core.state = SessionState::Running;
                    }
                    core.stop_reason = None;
                    core.stopped_thread_id = None;
                    core.current_frame = None;
                }
                self.events.put(EventBody::Continued { thread_id, all_threads });
            }
            AdapterEvent::Exited { exit_code } => {
                self.core.lock().exit_code = Some(exit_code);
            }
            AdapterEvent::Terminated => {
                {
                    let mut core = self.core.lock();
                    if !core.state.is_terminal() {
                        core.state = SessionState::Terminated;
                    }
                }
                self.enqueue_terminated(None);
            }
            AdapterEvent::Output { category, text, source, line } => {
                self.output.append(category, text.clone(), source, line);
                self.events.put(EventBody::Output { category, text });
            }
            AdapterEvent::BreakpointChanged { reason, id, verified, line, message } => {
                if let Some(id) = id {
                    let mut core = self.core.lock();
                    for entries in core.verified.values_mut() {
                        for entry in entries.iter_mut().filter(|e| e.id == Some(id)) {
                            entry.verified = verified;
                            if let Some(line) = line {
                                entry.line = line;
                            }
                            entry.message = message.clone();
                        }
                    }
                }
                self.events.put(EventBody::Breakpoint { reason, id, verified, line, message });
            }
            AdapterEvent::Thread { reason, thread_id } => {
                self.events.put(EventBody::Thread { reason, thread_id });
            }
            AdapterEvent::Module { reason, name } => {
                self.events.put(EventBody::Module { reason, name });
            }
        }
    }

    /// Enqueue the terminated event exactly once per session lifetime.
    fn enqueue_terminated(&self, eviction_reason: Option<&str>) {
        let exit_code = {
            let mut core = self.core.lock();
            if core.terminated_enqueued {
                return;
            }
            core.terminated_enqueued = true;
            core.exit_code
        };
        self.events.put(EventBody::Terminated {
            reason: eviction_reason.map(str::to_string),
            exit_code,
        });
    }
}

/// Everything needed to build a session.
pub(crate) struct SessionArgs {
    pub id: SessionId,
    pub name: String,
    pub project_root: PathBuf,
    pub config: Arc<RelayConfig>,
    pub clock: SharedClock,
    pub connector: AdapterConnector,
    pub breakpoint_store: BreakpointStore,
    pub session_store: SessionStore,
    pub staged_breakpoints: BTreeMap<PathBuf, Vec<BreakpointSpec>>,
    pub watches: Vec<String>,
    pub idle_timeout: Duration,
    pub default_stop_on_entry: bool,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct Session {
    id: SessionId,
    name: String,
    project_root: PathBuf,
    pub(crate) shared: Arc<SessionShared>,
    adapter: DebugAdapter,
    /// Serializes externally-initiated mutations across their DAP I/O.
    op_lock: tokio::sync::Mutex<()>,
    breakpoint_store: BreakpointStore,
    session_store: SessionStore,
    idle_timeout: Duration,
    default_stop_on_entry: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).field("name", &self.name).finish()
    }
}

impl Session {
    /// Build the session and bring its adapter up (spawn + DAP initialize).
    pub(crate) async fn create(args: SessionArgs) -> Result<Arc<Self>, RelayError> {
        let now_utc = args.created_at.unwrap_or_else(|| args.clock.now_utc());
        let now = args.clock.now();

        let shared = Arc::new(SessionShared {
            core: Mutex::new(SessionCore {
                state: SessionState::Created,
                stop_reason: None,
                created_at: now_utc,
                created_instant: now,
                last_activity_at: now_utc,
                last_activity_instant: now,
                stopped_thread_id: None,
                stop_count: 0,
                current_frame: None,
                capabilities: BTreeMap::new(),
                watches: args.watches,
                breakpoints: args.staged_breakpoints,
                verified: BTreeMap::new(),
                exception_filters: Vec::new(),
                exit_code: None,
                terminated_enqueued: false,
            }),
            output: OutputBuffer::new(args.config.output_buffer_max_bytes, args.clock.clone()),
            events: EventQueue::new(args.config.event_queue_max, args.clock.clone()),
            clock: args.clock.clone(),
        });

        let sink: EventSink = {
            let shared: Weak<SessionShared> = Arc::downgrade(&shared);
            Arc::new(move |event| {
                if let Some(shared) = shared.upgrade() {
                    shared.apply_adapter_event(event);
                }
            })
        };

        let adapter = DebugAdapter::new(
            AdapterOptions {
                python: args.config.python.clone(),
                request_timeout: args.config.dap_timeout(),
                launch_timeout: args.config.dap_launch_timeout(),
                strict_framing: args.config.strict_framing,
            },
            sink,
        );

        let capabilities =
            (args.connector)(&adapter).await.map_err(RelayError::from_dap)?;
        shared.core.lock().capabilities = capabilities;

        Ok(Arc::new(Self {
            id: args.id,
            name: args.name,
            project_root: args.project_root,
            shared,
            adapter,
            op_lock: tokio::sync::Mutex::new(()),
            breakpoint_store: args.breakpoint_store,
            session_store: args.session_store,
            idle_timeout: args.idle_timeout,
            default_stop_on_entry: args.default_stop_on_entry,
        }))
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_root(&self) -> &std::path::Path {
        &self.project_root
    }

    pub fn state(&self) -> SessionState {
        self.shared.core.lock().state
    }

    pub(crate) fn adapter(&self) -> &DebugAdapter {
        &self.adapter
    }

    /// Refresh the activity clock; called for every accepted external op.
    pub(crate) fn touch(&self) {
        let mut core = self.shared.core.lock();
        core.last_activity_at = self.shared.clock.now_utc();
        core.last_activity_instant = self.shared.clock.now();
    }

    /// Idle duration, for the eviction scan.
    pub(crate) fn idle_for(&self) -> Duration {
        let last = self.shared.core.lock().last_activity_instant;
        self.shared.clock.now().saturating_duration_since(last)
    }

    /// Total lifetime, for the eviction scan.
    pub(crate) fn lifetime(&self) -> Duration {
        let created = self.shared.core.lock().created_instant;
        self.shared.clock.now().saturating_duration_since(created)
    }

    pub(crate) fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Gate an operation on the state machine; state is left untouched on
    /// rejection.
    fn gate(
        &self,
        operation: &'static str,
        allowed: &[SessionState],
    ) -> Result<SessionState, RelayError> {
        let state = self.shared.core.lock().state;
        if allowed.contains(&state) {
            Ok(state)
        } else {
            Err(RelayError::InvalidSessionState {
                operation,
                actual: state,
                required: allowed.to_vec(),
            })
        }
    }

    /// A lost adapter pipe is terminal: the session fails and pollers get a
    /// terminated event.
    fn note_fatal(&self, err: &RelayError) {
        if matches!(err, RelayError::DapConnection { .. }) {
            {
                let mut core = self.shared.core.lock();
                if core.state.is_terminal() {
                    return;
                }
                core.state = SessionState::Failed;
            }
            warn!(session_id = %self.id, "adapter connection lost, session failed");
            self.shared.enqueue_terminated(None);
        }
    }

    /// Rewrite this session's snapshot; persistence failures are warnings.
    pub(crate) fn persist_snapshot(&self) -> Option<String> {
        let snapshot = {
            let core = self.shared.core.lock();
            SessionSnapshot {
                id: self.id.clone(),
                name: self.name.clone(),
                project_root: self.project_root.clone(),
                created_at: core.created_at,
                watches: core.watches.clone(),
            }
        };
        match self.session_store.snapshot(&snapshot) {
            Ok(()) => None,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "session snapshot write failed");
                Some(e.to_string())
            }
        }
    }

    /// Tear the session down. Idempotent; always runs adapter teardown.
    ///
    /// `eviction_reason` (`idle`/`lifetime`) is enqueued before cleanup so an
    /// in-flight poller can observe why the session went away.
    pub async fn terminate(&self, eviction_reason: Option<&'static str>) -> TerminateOutcome {
        let _guard = self.op_lock.lock().await;

        if let Some(reason) = eviction_reason {
            self.shared.enqueue_terminated(Some(reason));
        }

        self.adapter.disconnect().await;

        let (exit_code, runtime_seconds) = {
            let mut core = self.shared.core.lock();
            if !core.state.is_terminal() {
                core.state = SessionState::Terminated;
            }
            let runtime = self
                .shared
                .clock
                .now()
                .saturating_duration_since(core.created_instant)
                .as_secs();
            (core.exit_code, runtime)
        };
        self.shared.enqueue_terminated(None);
        debug!(session_id = %self.id, runtime_seconds, "session terminated");

        TerminateOutcome { deleted: true, exit_code, runtime_seconds }
    }

    /// Wire-facing snapshot of the session.
    pub fn view(&self) -> SessionView {
        let core = self.shared.core.lock();
        SessionView {
            session_id: self.id.clone(),
            name: self.name.clone(),
            project_root: self.project_root.clone(),
            state: core.state,
            stop_reason: core.stop_reason,
            created_at: core.created_at,
            last_activity_at: core.last_activity_at,
            stopped_thread_id: core.stopped_thread_id,
            current_frame_location: core.current_frame.clone(),
            adapter_capabilities: core.capabilities.clone(),
            watch_expressions: core.watches.clone(),
            breakpoint_count: core.breakpoints.values().map(Vec::len).sum(),
            exit_code: core.exit_code,
        }
    }

    /// Detail view: the snapshot plus counters.
    pub fn info(&self) -> SessionInfo {
        let view = self.view();
        let uptime_seconds = self.lifetime().as_secs();
        let breakpoints_by_file = self.shared.core.lock().breakpoints.clone();
        SessionInfo {
            view,
            uptime_seconds,
            last_event_seq: self.shared.events.last_seq(),
            pending_events: self.shared.events.len(),
            output: self.shared.output.stats(),
            breakpoints_by_file,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
