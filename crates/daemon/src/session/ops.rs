// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-gated session operations.
//!
//! Every operation here takes the op lock, checks the transition table, and
//! refreshes the activity clock before any DAP I/O. Reads that pollers rely
//! on (`poll_events`, `get_output`) deliberately skip the op lock so a slow
//! launch or step cannot starve them.

use super::Session;
use crate::error::RelayError;
use crate::events::{parse_cursor, EventsSlice};
use crate::facade::types::{
    BreakpointUpdate, ClearBreakpointsOutcome, EvaluateOutcome, VariableInspection,
    WatchEvaluation,
};
use crate::output::OutputPage;
use dapmux_core::{
    upsert_spec, BreakpointSpec, FrameLocation, OutputCategory, SessionState, VerifiedBreakpoint,
};
use dapmux_dap::adapter::{AttachConfig, ExceptionFilter, LaunchConfig};
use dapmux_dap::types::{Scope, StackFrame, Thread, Variable};
use dapmux_dap::DapError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// States in which the breakpoint/watch registry may be edited.
const EDITABLE: &[SessionState] = &[
    SessionState::Created,
    SessionState::Launching,
    SessionState::Running,
    SessionState::Paused,
];

/// Default paging window for `inspect_variable` children.
const INSPECT_CHILDREN: u32 = 100;

impl Session {
    // ---- lifecycle ----

    /// Launch the debuggee. `created → launching → running|paused`.
    pub async fn launch(&self, mut config: LaunchConfig) -> Result<(), RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("launch", &[SessionState::Created])?;
        self.touch();
        config.stop_on_entry = config.stop_on_entry || self.default_stop_on_entry;
        config.validate().map_err(RelayError::from_dap)?;

        let (staged, filters) = {
            let mut core = self.shared.core.lock();
            core.state = SessionState::Launching;
            (
                core.breakpoints.clone().into_iter().collect::<Vec<_>>(),
                core.exception_filters.clone(),
            )
        };

        match self.adapter().launch(&config, &staged, &filters).await {
            Ok(()) => {
                let mut core = self.shared.core.lock();
                // A stopped event may already have moved us to paused; the
                // event is authoritative.
                if core.state == SessionState::Launching {
                    core.state = SessionState::Running;
                }
                Ok(())
            }
            Err(e) => {
                let err = RelayError::from_launch(e, &config);
                {
                    let mut core = self.shared.core.lock();
                    if core.state == SessionState::Launching {
                        core.state = SessionState::Created;
                    }
                }
                self.note_fatal(&err);
                Err(err)
            }
        }
    }

    /// Attach to a running debuggee. Same transitions as launch.
    pub async fn attach(&self, config: AttachConfig) -> Result<(), RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("attach", &[SessionState::Created])?;
        self.touch();
        config.validate().map_err(RelayError::from_dap)?;

        let (staged, filters) = {
            let mut core = self.shared.core.lock();
            core.state = SessionState::Launching;
            (
                core.breakpoints.clone().into_iter().collect::<Vec<_>>(),
                core.exception_filters.clone(),
            )
        };

        match self.adapter().attach(&config, &staged, &filters).await {
            Ok(()) => {
                let mut core = self.shared.core.lock();
                if core.state == SessionState::Launching {
                    core.state = SessionState::Running;
                }
                Ok(())
            }
            Err(e) => {
                let err = RelayError::from_attach(e, &config);
                {
                    let mut core = self.shared.core.lock();
                    if core.state == SessionState::Launching {
                        core.state = SessionState::Created;
                    }
                }
                self.note_fatal(&err);
                Err(err)
            }
        }
    }

    // ---- breakpoints ----

    /// Replace the authoritative breakpoint set for one file.
    ///
    /// Before launch the specs are staged and echoed unverified; while the
    /// debuggee is live they go to the adapter immediately.
    pub async fn set_breakpoints(
        &self,
        source_path: PathBuf,
        specs: Vec<BreakpointSpec>,
    ) -> Result<BreakpointUpdate, RelayError> {
        let _guard = self.op_lock.lock().await;
        let state = self.gate("set_breakpoints", EDITABLE)?;
        self.touch();

        if !source_path.is_absolute() {
            return Err(RelayError::BreakpointPathNotAbsolute { path: source_path });
        }
        let mut normalized: Vec<BreakpointSpec> = Vec::new();
        for mut spec in specs {
            if spec.line == 0 {
                return Err(RelayError::BreakpointInvalidLine { line: spec.line });
            }
            spec.source_path = source_path.clone();
            upsert_spec(&mut normalized, spec);
        }

        let live = self.debuggee_live(state);
        let verified = if live {
            match self.adapter().set_breakpoints(&source_path, &normalized).await {
                Ok(verified) => verified,
                Err(e) => {
                    let err = RelayError::from_dap(e);
                    self.note_fatal(&err);
                    return Err(err);
                }
            }
        } else {
            normalized.iter().map(VerifiedBreakpoint::pending).collect()
        };

        {
            let mut core = self.shared.core.lock();
            core.breakpoints.insert(source_path.clone(), normalized.clone());
            core.verified.insert(source_path.clone(), verified.clone());
        }

        let persist_warning = self
            .breakpoint_store
            .update_file(self.project_root(), &source_path, &normalized)
            .err()
            .map(|e| {
                warn!(session_id = %self.id(), error = %e, "breakpoint persistence failed");
                e.to_string()
            });

        Ok(BreakpointUpdate { breakpoints: verified, persist_warning })
    }

    /// Remove breakpoints for one file, or for the whole project.
    pub async fn clear_breakpoints(
        &self,
        source_path: Option<PathBuf>,
    ) -> Result<ClearBreakpointsOutcome, RelayError> {
        let _guard = self.op_lock.lock().await;
        let state = self.gate("clear_breakpoints", EDITABLE)?;
        self.touch();

        let affected: Vec<PathBuf> = {
            let core = self.shared.core.lock();
            match &source_path {
                Some(path) => {
                    if core.breakpoints.contains_key(path) {
                        vec![path.clone()]
                    } else {
                        Vec::new()
                    }
                }
                None => core.breakpoints.keys().cloned().collect(),
            }
        };

        let mut removed = 0usize;
        let live = self.debuggee_live(state);
        for path in &affected {
            if live {
                if let Err(e) = self.adapter().set_breakpoints(path, &[]).await {
                    let err = RelayError::from_dap(e);
                    self.note_fatal(&err);
                    return Err(err);
                }
            }
            let mut core = self.shared.core.lock();
            removed += core.breakpoints.remove(path).map_or(0, |specs| specs.len());
            core.verified.remove(path);
        }

        let persist_result = match &source_path {
            Some(path) => {
                self.breakpoint_store.update_file(self.project_root(), path, &[]).map(|_| ())
            }
            None => self.breakpoint_store.clear(self.project_root()).map(|_| ()),
        };
        let persist_warning = persist_result.err().map(|e| {
            warn!(session_id = %self.id(), error = %e, "breakpoint persistence failed");
            e.to_string()
        });

        Ok(ClearBreakpointsOutcome { removed, persist_warning })
    }

    /// The staged breakpoint registry, by file.
    pub fn get_breakpoints(
        &self,
    ) -> Result<std::collections::BTreeMap<PathBuf, Vec<BreakpointSpec>>, RelayError> {
        self.gate("get_breakpoints", EDITABLE)?;
        self.touch();
        Ok(self.shared.core.lock().breakpoints.clone())
    }

    /// Stage exception filters; sent to the adapter while the debuggee is
    /// live, replayed on launch otherwise.
    pub async fn set_exception_filters(
        &self,
        filters: Vec<ExceptionFilter>,
    ) -> Result<(), RelayError> {
        let _guard = self.op_lock.lock().await;
        let state = self.gate("set_exception_breakpoints", EDITABLE)?;
        self.touch();

        if self.debuggee_live(state) {
            if let Err(e) = self.adapter().set_exception_breakpoints(&filters).await {
                let err = RelayError::from_dap(e);
                self.note_fatal(&err);
                return Err(err);
            }
        }
        self.shared.core.lock().exception_filters = filters;
        Ok(())
    }

    // ---- watches ----

    /// Add a watch expression; duplicates keep their original position.
    pub fn add_watch(&self, expression: String) -> Result<Vec<String>, RelayError> {
        self.gate("add_watch", EDITABLE)?;
        self.touch();
        let watches = {
            let mut core = self.shared.core.lock();
            if !core.watches.contains(&expression) {
                core.watches.push(expression);
            }
            core.watches.clone()
        };
        self.persist_snapshot();
        Ok(watches)
    }

    pub fn remove_watch(&self, expression: &str) -> Result<bool, RelayError> {
        self.gate("remove_watch", EDITABLE)?;
        self.touch();
        let removed = {
            let mut core = self.shared.core.lock();
            let before = core.watches.len();
            core.watches.retain(|w| w != expression);
            core.watches.len() != before
        };
        if removed {
            self.persist_snapshot();
        }
        Ok(removed)
    }

    pub fn list_watches(&self) -> Result<Vec<String>, RelayError> {
        self.gate("list_watches", EDITABLE)?;
        self.touch();
        Ok(self.shared.core.lock().watches.clone())
    }

    // ---- execution control ----

    /// Resume from a stop. `paused → running`.
    pub async fn continue_(&self, thread_id: Option<i64>) -> Result<(), RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("continue", &[SessionState::Paused])?;
        self.touch();
        let thread_id = self.resolve_thread(thread_id);
        let stops_before = self.shared.core.lock().stop_count;

        match self.adapter().continue_thread(thread_id).await {
            Ok(_) => {
                let mut core = self.shared.core.lock();
                // The next stop can land before this response is processed;
                // the stopped event's state wins in that case.
                if core.stop_count == stops_before && !core.state.is_terminal() {
                    core.state = SessionState::Running;
                    core.stop_reason = None;
                    core.stopped_thread_id = None;
                    core.current_frame = None;
                }
                Ok(())
            }
            Err(e) => Err(self.exec_error("continue", thread_id, e)),
        }
    }

    /// Request a stop; the transition to `paused` happens when the adapter's
    /// stopped event arrives.
    pub async fn pause(&self, thread_id: Option<i64>) -> Result<(), RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("pause", &[SessionState::Running])?;
        self.touch();
        let thread_id = thread_id.unwrap_or(1);

        match self.adapter().pause(thread_id).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.exec_error("pause", thread_id, e)),
        }
    }

    pub async fn step_next(&self, thread_id: Option<i64>) -> Result<(), RelayError> {
        self.step("step_next", thread_id).await
    }

    pub async fn step_in(&self, thread_id: Option<i64>) -> Result<(), RelayError> {
        self.step("step_in", thread_id).await
    }

    pub async fn step_out(&self, thread_id: Option<i64>) -> Result<(), RelayError> {
        self.step("step_out", thread_id).await
    }

    async fn step(
        &self,
        operation: &'static str,
        thread_id: Option<i64>,
    ) -> Result<(), RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate(operation, &[SessionState::Paused])?;
        self.touch();
        let thread_id = self.resolve_thread(thread_id);
        let stops_before = self.shared.core.lock().stop_count;

        let result = match operation {
            "step_next" => self.adapter().step_next(thread_id).await,
            "step_in" => self.adapter().step_in(thread_id).await,
            _ => self.adapter().step_out(thread_id).await,
        };
        match result {
            Ok(()) => {
                // Briefly running until the step lands; the stopped event
                // returns us to paused, and may already have.
                let mut core = self.shared.core.lock();
                if core.stop_count == stops_before && core.state == SessionState::Paused {
                    core.state = SessionState::Running;
                }
                Ok(())
            }
            Err(e) => Err(self.exec_error(operation, thread_id, e)),
        }
    }

    // ---- inspection (paused only) ----

    pub async fn threads(&self) -> Result<Vec<Thread>, RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("threads", &[SessionState::Paused])?;
        self.touch();
        self.adapter().threads().await.map_err(|e| {
            let err = RelayError::from_dap(e);
            self.note_fatal(&err);
            err
        })
    }

    /// Fetch frames; a fetch that includes the top frame also refreshes
    /// `current_frame_location`.
    pub async fn stack_trace(
        &self,
        thread_id: Option<i64>,
        start: Option<u32>,
        levels: Option<u32>,
    ) -> Result<(Vec<StackFrame>, Option<u32>), RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("stack_trace", &[SessionState::Paused])?;
        self.touch();
        let thread_id = self.resolve_thread(thread_id);

        let (frames, total) = self
            .adapter()
            .stack_trace(thread_id, start, levels)
            .await
            .map_err(|e| self.exec_error("stack_trace", thread_id, e))?;

        if start.unwrap_or(0) == 0 {
            if let Some(top) = frames.first() {
                self.shared.core.lock().current_frame = Some(FrameLocation {
                    path: top.source.as_ref().and_then(|s| s.path.clone()),
                    line: top.line,
                    name: top.name.clone(),
                });
            }
        }
        Ok((frames, total))
    }

    pub async fn scopes(&self, frame_id: i64) -> Result<Vec<Scope>, RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("scopes", &[SessionState::Paused])?;
        self.touch();
        self.adapter().scopes(frame_id).await.map_err(|e| match e {
            DapError::RequestFailed { .. } => RelayError::FrameNotFound { frame_id },
            other => {
                let err = RelayError::from_dap(other);
                self.note_fatal(&err);
                err
            }
        })
    }

    pub async fn variables(
        &self,
        variables_reference: i64,
        start: Option<u32>,
        count: Option<u32>,
    ) -> Result<Vec<Variable>, RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("variables", &[SessionState::Paused])?;
        self.touch();
        self.adapter()
            .variables(variables_reference, start, count)
            .await
            .map_err(|e| match e {
                DapError::RequestFailed { .. } => {
                    RelayError::VariableNotFound { reference: variables_reference }
                }
                other => {
                    let err = RelayError::from_dap(other);
                    self.note_fatal(&err);
                    err
                }
            })
    }

    /// Evaluate an expression in a frame.
    ///
    /// An expression that itself raises is a *successful* call carrying an
    /// error body, not an operation failure.
    pub async fn evaluate(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: Option<&str>,
    ) -> Result<EvaluateOutcome, RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("evaluate", &[SessionState::Paused])?;
        self.touch();
        self.evaluate_inner(expression, frame_id, context.unwrap_or("repl")).await
    }

    async fn evaluate_inner(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: &str,
    ) -> Result<EvaluateOutcome, RelayError> {
        match self.adapter().evaluate(expression, frame_id, Some(context)).await {
            Ok(body) => Ok(EvaluateOutcome {
                result: Some(body.result),
                type_name: body.type_name,
                variables_reference: body.variables_reference,
                error: None,
            }),
            Err(DapError::RequestFailed { message, .. }) => Ok(EvaluateOutcome {
                result: None,
                type_name: None,
                variables_reference: 0,
                error: Some(message),
            }),
            Err(other) => {
                let err = RelayError::from_dap(other);
                self.note_fatal(&err);
                Err(err)
            }
        }
    }

    /// Evaluate every watch expression in the current top frame. Individual
    /// failures become per-entry errors.
    pub async fn evaluate_watches(&self) -> Result<Vec<WatchEvaluation>, RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("evaluate_watches", &[SessionState::Paused])?;
        self.touch();

        let watches = self.shared.core.lock().watches.clone();
        if watches.is_empty() {
            return Ok(Vec::new());
        }
        let frame_id = self.top_frame_id().await?;

        let mut evaluations = Vec::with_capacity(watches.len());
        for expression in watches {
            let outcome = self.evaluate_inner(&expression, Some(frame_id), "watch").await?;
            evaluations.push(WatchEvaluation {
                expression,
                value: outcome.result,
                type_name: outcome.type_name,
                error: outcome.error,
            });
        }
        Ok(evaluations)
    }

    /// Evaluate an expression and expand its first level of children.
    pub async fn inspect_variable(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        max_children: Option<u32>,
    ) -> Result<VariableInspection, RelayError> {
        let _guard = self.op_lock.lock().await;
        self.gate("inspect_variable", &[SessionState::Paused])?;
        self.touch();

        let frame_id = match frame_id {
            Some(id) => id,
            None => self.top_frame_id().await?,
        };
        let outcome = self.evaluate_inner(expression, Some(frame_id), "repl").await?;

        let children = if outcome.variables_reference > 0 {
            self.adapter()
                .variables(
                    outcome.variables_reference,
                    None,
                    Some(max_children.unwrap_or(INSPECT_CHILDREN)),
                )
                .await
                .map_err(|e| {
                    let err = RelayError::from_dap(e);
                    self.note_fatal(&err);
                    err
                })?
        } else {
            Vec::new()
        };

        Ok(VariableInspection {
            expression: expression.to_string(),
            value: outcome.result,
            type_name: outcome.type_name,
            variables_reference: outcome.variables_reference,
            error: outcome.error,
            children,
        })
    }

    // ---- polling (any state) ----

    /// Cursor-based event poll, optionally blocking for the first event.
    pub async fn poll_events(
        &self,
        cursor: Option<&str>,
        limit: usize,
        wait: Duration,
    ) -> Result<EventsSlice, RelayError> {
        let cursor =
            parse_cursor(cursor).map_err(|message| RelayError::InvalidRequest { message })?;
        self.touch();
        Ok(self.shared.events.poll(cursor, limit, wait).await)
    }

    /// Filtered page of buffered program output.
    pub fn get_output(
        &self,
        offset: usize,
        limit: usize,
        category: Option<OutputCategory>,
    ) -> OutputPage {
        self.touch();
        self.shared.output.page(offset, limit, category)
    }

    // ---- helpers ----

    fn debuggee_live(&self, state: SessionState) -> bool {
        matches!(state, SessionState::Running | SessionState::Paused)
            && self.adapter().is_initialized()
    }

    fn resolve_thread(&self, thread_id: Option<i64>) -> i64 {
        thread_id
            .or_else(|| self.shared.core.lock().stopped_thread_id)
            .unwrap_or(1)
    }

    async fn top_frame_id(&self) -> Result<i64, RelayError> {
        let thread_id = self.resolve_thread(None);
        let (frames, _) = self
            .adapter()
            .stack_trace(thread_id, Some(0), Some(1))
            .await
            .map_err(|e| self.exec_error("stack_trace", thread_id, e))?;
        frames
            .first()
            .map(|f| f.id)
            .ok_or(RelayError::FrameNotFound { frame_id: 0 })
    }

    fn exec_error(&self, operation: &str, thread_id: i64, err: DapError) -> RelayError {
        let mapped = match err {
            DapError::RequestFailed { ref message, .. }
                if message.to_lowercase().contains("thread") =>
            {
                RelayError::ThreadNotFound { thread_id }
            }
            other => RelayError::from_dap(other),
        };
        if matches!(mapped, RelayError::DapConnection { .. }) {
            self.note_fatal(&mapped);
        }
        tracing::debug!(session_id = %self.id(), operation, "operation failed: {mapped}");
        mapped
    }
}
