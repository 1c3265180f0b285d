// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Façade contracts for the external transports.
//!
//! The HTTP and MCP surfaces call exactly these methods; nothing here knows
//! about routes or tool schemas. Inputs are validated at this boundary so
//! sessions only see well-formed requests.

pub mod types;

use crate::error::RelayError;
use crate::manager::SessionManager;
use crate::output::OutputPage;
use crate::session::Session;
use dapmux_core::{BreakpointSpec, OutputCategory};
use dapmux_dap::adapter::{AttachConfig, ExceptionFilter, LaunchConfig};
use dapmux_dap::types::{Scope, StackFrame, Thread, Variable};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use types::{
    BreakpointUpdate, ClearBreakpointsOutcome, CreateSessionParams, EvaluateOutcome, EventsPage,
    RecoverableSession, SessionFilters, SessionInfo, SessionView, TerminateOutcome,
    VariableInspection, WatchEvaluation,
};

/// Default and maximum page sizes for polls.
const DEFAULT_PAGE: usize = 100;
const MAX_PAGE: usize = 1000;

/// Longest supported long-poll wait.
const MAX_WAIT: Duration = Duration::from_secs(60);

/// The operation surface the transports consume.
pub struct DebugFacade {
    manager: Arc<SessionManager>,
}

impl DebugFacade {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    // ---- session lifecycle ----

    pub async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionView, RelayError> {
        let session = self.manager.create(params).await?;
        Ok(session.view())
    }

    pub fn get_session(&self, id: &str) -> Result<SessionView, RelayError> {
        Ok(self.manager.get(id)?.view())
    }

    pub fn get_info(&self, id: &str) -> Result<SessionInfo, RelayError> {
        Ok(self.manager.get(id)?.info())
    }

    pub fn list_sessions(&self, filters: SessionFilters) -> Vec<SessionView> {
        self.manager
            .list()
            .into_iter()
            .map(|s| s.view())
            .filter(|view| {
                filters.state.map_or(true, |wanted| view.state == wanted)
                    && filters
                        .project_root
                        .as_ref()
                        .map_or(true, |root| &view.project_root == root)
            })
            .collect()
    }

    pub async fn terminate_session(
        &self,
        id: &str,
        _force: bool,
    ) -> Result<TerminateOutcome, RelayError> {
        self.manager.terminate(id).await
    }

    pub async fn launch(&self, id: &str, config: LaunchConfig) -> Result<SessionView, RelayError> {
        let session = self.manager.get(id)?;
        session.launch(config).await?;
        Ok(session.view())
    }

    pub async fn attach(&self, id: &str, config: AttachConfig) -> Result<SessionView, RelayError> {
        let session = self.manager.get(id)?;
        session.attach(config).await?;
        Ok(session.view())
    }

    // ---- breakpoints ----

    /// Replace breakpoints for every file named in `specs`; files not named
    /// keep their sets.
    pub async fn set_breakpoints(
        &self,
        id: &str,
        specs: Vec<BreakpointSpec>,
    ) -> Result<BreakpointUpdate, RelayError> {
        let session = self.manager.get(id)?;

        // Group by file, preserving first-seen file order.
        let mut order: Vec<PathBuf> = Vec::new();
        let mut by_file: BTreeMap<PathBuf, Vec<BreakpointSpec>> = BTreeMap::new();
        for spec in specs {
            if !by_file.contains_key(&spec.source_path) {
                order.push(spec.source_path.clone());
            }
            by_file.entry(spec.source_path.clone()).or_default().push(spec);
        }

        let mut breakpoints = Vec::new();
        let mut persist_warning = None;
        for path in order {
            let specs = by_file.remove(&path).unwrap_or_default();
            let update = session.set_breakpoints(path, specs).await?;
            breakpoints.extend(update.breakpoints);
            persist_warning = persist_warning.or(update.persist_warning);
        }
        Ok(BreakpointUpdate { breakpoints, persist_warning })
    }

    pub async fn clear_breakpoints(
        &self,
        id: &str,
        path: Option<PathBuf>,
    ) -> Result<ClearBreakpointsOutcome, RelayError> {
        self.manager.get(id)?.clear_breakpoints(path).await
    }

    pub fn get_breakpoints(
        &self,
        id: &str,
    ) -> Result<BTreeMap<PathBuf, Vec<BreakpointSpec>>, RelayError> {
        self.manager.get(id)?.get_breakpoints()
    }

    pub async fn set_exception_breakpoints(
        &self,
        id: &str,
        filters: Vec<ExceptionFilter>,
    ) -> Result<(), RelayError> {
        self.manager.get(id)?.set_exception_filters(filters).await
    }

    // ---- execution control ----

    pub async fn continue_(
        &self,
        id: &str,
        thread_id: Option<i64>,
    ) -> Result<SessionView, RelayError> {
        let session = self.manager.get(id)?;
        session.continue_(thread_id).await?;
        Ok(session.view())
    }

    pub async fn pause(&self, id: &str, thread_id: Option<i64>) -> Result<SessionView, RelayError> {
        let session = self.manager.get(id)?;
        session.pause(thread_id).await?;
        Ok(session.view())
    }

    pub async fn step_over(
        &self,
        id: &str,
        thread_id: Option<i64>,
    ) -> Result<SessionView, RelayError> {
        let session = self.manager.get(id)?;
        session.step_next(thread_id).await?;
        Ok(session.view())
    }

    pub async fn step_into(
        &self,
        id: &str,
        thread_id: Option<i64>,
    ) -> Result<SessionView, RelayError> {
        let session = self.manager.get(id)?;
        session.step_in(thread_id).await?;
        Ok(session.view())
    }

    pub async fn step_out(
        &self,
        id: &str,
        thread_id: Option<i64>,
    ) -> Result<SessionView, RelayError> {
        let session = self.manager.get(id)?;
        session.step_out(thread_id).await?;
        Ok(session.view())
    }

    // ---- inspection ----

    pub async fn get_threads(&self, id: &str) -> Result<Vec<Thread>, RelayError> {
        self.manager.get(id)?.threads().await
    }

    pub async fn get_stacktrace(
        &self,
        id: &str,
        thread_id: Option<i64>,
        start: Option<u32>,
        levels: Option<u32>,
    ) -> Result<(Vec<StackFrame>, Option<u32>), RelayError> {
        self.manager.get(id)?.stack_trace(thread_id, start, levels).await
    }

    pub async fn get_scopes(&self, id: &str, frame_id: i64) -> Result<Vec<Scope>, RelayError> {
        self.manager.get(id)?.scopes(frame_id).await
    }

    pub async fn get_variables(
        &self,
        id: &str,
        variables_reference: i64,
        start: Option<u32>,
        count: Option<u32>,
    ) -> Result<Vec<Variable>, RelayError> {
        self.manager.get(id)?.variables(variables_reference, start, count).await
    }

    pub async fn evaluate(
        &self,
        id: &str,
        expression: &str,
        frame_id: Option<i64>,
        context: Option<&str>,
    ) -> Result<EvaluateOutcome, RelayError> {
        if expression.trim().is_empty() {
            return Err(RelayError::InvalidRequest {
                message: "expression must not be empty".to_string(),
            });
        }
        if let Some(context) = context {
            if !matches!(context, "watch" | "repl" | "hover") {
                return Err(RelayError::InvalidRequest {
                    message: format!("unknown evaluate context {context:?}"),
                });
            }
        }
        self.manager.get(id)?.evaluate(expression, frame_id, context).await
    }

    pub async fn inspect_variable(
        &self,
        id: &str,
        expression: &str,
        frame_id: Option<i64>,
        max_children: Option<u32>,
    ) -> Result<VariableInspection, RelayError> {
        self.manager.get(id)?.inspect_variable(expression, frame_id, max_children).await
    }

    // ---- watches ----

    pub fn add_watch(&self, id: &str, expression: String) -> Result<Vec<String>, RelayError> {
        if expression.trim().is_empty() {
            return Err(RelayError::InvalidRequest {
                message: "watch expression must not be empty".to_string(),
            });
        }
        self.manager.get(id)?.add_watch(expression)
    }

    pub fn remove_watch(&self, id: &str, expression: &str) -> Result<bool, RelayError> {
        self.manager.get(id)?.remove_watch(expression)
    }

    pub fn list_watches(&self, id: &str) -> Result<Vec<String>, RelayError> {
        self.manager.get(id)?.list_watches()
    }

    pub async fn evaluate_watches(&self, id: &str) -> Result<Vec<WatchEvaluation>, RelayError> {
        self.manager.get(id)?.evaluate_watches().await
    }

    // ---- polling ----

    pub fn get_output(
        &self,
        id: &str,
        cursor: Option<usize>,
        limit: Option<usize>,
        category: Option<OutputCategory>,
    ) -> Result<OutputPage, RelayError> {
        let limit = clamp_limit(limit)?;
        Ok(self.manager.get(id)?.get_output(cursor.unwrap_or(0), limit, category))
    }

    pub async fn poll_events(
        &self,
        id: &str,
        cursor: Option<&str>,
        limit: Option<usize>,
        wait_timeout: Option<Duration>,
    ) -> Result<EventsPage, RelayError> {
        let limit = clamp_limit(limit)?;
        let wait = wait_timeout.unwrap_or(Duration::ZERO).min(MAX_WAIT);
        let session = self.manager.get(id)?;
        let slice = session.poll_events(cursor, limit, wait).await?;
        let view = session.view();
        Ok(EventsPage {
            events: slice.events,
            next_cursor: slice.next_cursor,
            has_more: slice.has_more,
            cursor_skipped: slice.cursor_skipped,
            session_state: view.state,
            stop_reason: view.stop_reason,
        })
    }

    // ---- recovery ----

    pub fn list_recoverable(&self) -> Vec<RecoverableSession> {
        self.manager
            .list_recoverable()
            .into_iter()
            .map(|s| RecoverableSession {
                session_id: s.id,
                name: s.name,
                project_root: s.project_root,
                created_at: s.created_at,
                watches: s.watches,
            })
            .collect()
    }

    pub async fn recover_session(&self, id: &str) -> Result<SessionView, RelayError> {
        let session: Arc<Session> = self.manager.recover_session(id).await?;
        Ok(session.view())
    }
}

fn clamp_limit(limit: Option<usize>) -> Result<usize, RelayError> {
    match limit {
        None => Ok(DEFAULT_PAGE),
        Some(0) => {
            Err(RelayError::InvalidRequest { message: "limit must be ≥ 1".to_string() })
        }
        Some(n) => Ok(n.min(MAX_PAGE)),
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
