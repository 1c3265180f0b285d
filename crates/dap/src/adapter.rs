// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debug adapter subprocess wrapper.
//!
//! Owns the debugpy adapter process and its [`DapClient`], exposes the typed
//! operation surface sessions call, and translates raw DAP events into
//! [`AdapterEvent`]s for the owning session.
//!
//! DAP startup ordering: the adapter emits the `initialized` event only after
//! it has seen `launch`/`attach`, and will not answer `launch` until
//! `configurationDone`. So `launch()` drives both sides concurrently: the
//! launch request on one future, the wait-initialized → breakpoint replay →
//! `configurationDone` sequence on the other.

use crate::client::{ClientOptions, DapClient, EventHandler};
use crate::error::DapError;
use crate::types::{
    Breakpoint, BreakpointEventBody, ContinueResponseBody, ContinuedEventBody,
    DisconnectArguments, EvaluateArguments, EvaluateResponseBody, ExitedEventBody,
    InitializeArguments, ModuleEventBody, OutputEventBody, Scope, ScopesArguments,
    ScopesResponseBody, SetBreakpointsArguments, SetBreakpointsResponseBody,
    SetExceptionBreakpointsArguments, Source, SourceBreakpoint, StackFrame,
    StackTraceArguments, StackTraceResponseBody, StoppedEventBody, Thread, ThreadEventBody,
    ThreadIdArguments, ThreadsResponseBody, VariablesArguments, VariablesResponseBody,
};
use dapmux_core::{BreakpointSpec, OutputCategory, StopReason, VerifiedBreakpoint};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// How long the debuggee gets between SIGTERM and SIGKILL at teardown.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Deadline for the disconnect request itself; a wedged adapter gets killed.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Internal event vocabulary, mapped from raw DAP event names.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Stopped {
        reason: StopReason,
        thread_id: Option<i64>,
        hit_breakpoint_ids: Vec<i64>,
        description: Option<String>,
    },
    Continued {
        thread_id: Option<i64>,
        all_threads: bool,
    },
    Exited {
        exit_code: i64,
    },
    Terminated,
    Output {
        category: OutputCategory,
        text: String,
        source: Option<PathBuf>,
        line: Option<u32>,
    },
    BreakpointChanged {
        reason: String,
        id: Option<i64>,
        verified: bool,
        line: Option<u32>,
        message: Option<String>,
    },
    Thread {
        reason: String,
        thread_id: i64,
    },
    Module {
        reason: String,
        name: Option<String>,
    },
}

/// Callback the owning session supplies; invoked on the reader task.
pub type EventSink = Arc<dyn Fn(AdapterEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Interpreter used to spawn `-m debugpy.adapter`.
    pub python: PathBuf,
    pub request_timeout: Duration,
    pub launch_timeout: Duration,
    pub strict_framing: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            request_timeout: Duration::from_secs(30),
            launch_timeout: Duration::from_secs(60),
            strict_framing: false,
        }
    }
}

/// Console routing for the debuggee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleMode {
    #[default]
    #[serde(rename = "internalConsole")]
    InternalConsole,
    #[serde(rename = "integratedTerminal")]
    IntegratedTerminal,
    #[serde(rename = "externalTerminal")]
    ExternalTerminal,
}

impl ConsoleMode {
    fn as_dap(self) -> &'static str {
        match self {
            ConsoleMode::InternalConsole => "internalConsole",
            ConsoleMode::IntegratedTerminal => "integratedTerminal",
            ConsoleMode::ExternalTerminal => "externalTerminal",
        }
    }
}

/// Launch configuration: exactly one of `program`/`module`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    #[serde(default)]
    pub program: Option<PathBuf>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub python_args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub stop_on_entry: bool,
    #[serde(default)]
    pub console_mode: ConsoleMode,
    #[serde(default)]
    pub target_interpreter_path: Option<PathBuf>,
}

impl LaunchConfig {
    pub fn validate(&self) -> Result<(), DapError> {
        match (&self.program, &self.module) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (Some(_), Some(_)) => Err(DapError::InvalidConfig {
                kind: "launch",
                message: "program and module are mutually exclusive".to_string(),
            }),
            (None, None) => Err(DapError::InvalidConfig {
                kind: "launch",
                message: "one of program or module is required".to_string(),
            }),
        }
    }

    fn to_dap_arguments(&self) -> Value {
        let mut args = Map::new();
        if let Some(program) = &self.program {
            args.insert("program".into(), json!(program));
        }
        if let Some(module) = &self.module {
            args.insert("module".into(), json!(module));
        }
        if !self.args.is_empty() {
            args.insert("args".into(), json!(self.args));
        }
        if !self.python_args.is_empty() {
            args.insert("pythonArgs".into(), json!(self.python_args));
        }
        if let Some(cwd) = &self.cwd {
            args.insert("cwd".into(), json!(cwd));
        }
        if !self.env.is_empty() {
            args.insert("env".into(), json!(self.env));
        }
        if let Some(python) = &self.target_interpreter_path {
            args.insert("python".into(), json!([python]));
        }
        args.insert("stopOnEntry".into(), json!(self.stop_on_entry));
        args.insert("console".into(), json!(self.console_mode.as_dap()));
        // Output events only flow over DAP when the adapter captures stdio.
        args.insert("redirectOutput".into(), json!(true));
        Value::Object(args)
    }
}

/// Attach configuration: a local pid, or a (host, port) debug server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachConfig {
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "AttachConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl AttachConfig {
    fn default_connect_timeout() -> u64 {
        10
    }

    pub fn validate(&self) -> Result<(), DapError> {
        match (self.pid, &self.host, self.port) {
            (Some(_), None, None) => Ok(()),
            (None, Some(_), Some(_)) => Ok(()),
            _ => Err(DapError::InvalidConfig {
                kind: "attach",
                message: "either pid, or both host and port, are required".to_string(),
            }),
        }
    }

    fn to_dap_arguments(&self) -> Value {
        match (self.pid, &self.host, self.port) {
            (Some(pid), _, _) => json!({ "processId": pid }),
            (None, Some(host), Some(port)) => json!({
                "connect": { "host": host, "port": port },
                "timeout": self.connect_timeout_seconds * 1000,
            }),
            _ => json!({}),
        }
    }
}

/// Exception breakpoint semantics. `Never` clears both filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionFilter {
    Uncaught,
    Raised,
    Never,
}

fn dap_exception_filters(filters: &[ExceptionFilter]) -> Vec<String> {
    if filters.contains(&ExceptionFilter::Never) {
        return Vec::new();
    }
    let mut out = Vec::new();
    if filters.contains(&ExceptionFilter::Raised) {
        out.push("raised".to_string());
    }
    if filters.contains(&ExceptionFilter::Uncaught) {
        out.push("uncaught".to_string());
    }
    out
}

struct AdapterInner {
    client: DapClient,
    child: Mutex<Option<Child>>,
}

struct InitializedSignal {
    flag: AtomicBool,
    notify: Notify,
}

/// One debug adapter process and its DAP connection.
pub struct DebugAdapter {
    options: AdapterOptions,
    sink: EventSink,
    inner: OnceLock<AdapterInner>,
    /// Set once the DAP initialize handshake has completed.
    ready: AtomicBool,
    initialized_event: Arc<InitializedSignal>,
    capabilities: Mutex<BTreeMap<String, bool>>,
}

impl DebugAdapter {
    pub fn new(options: AdapterOptions, sink: EventSink) -> Self {
        Self {
            options,
            sink,
            inner: OnceLock::new(),
            ready: AtomicBool::new(false),
            initialized_event: Arc::new(InitializedSignal {
                flag: AtomicBool::new(false),
                notify: Notify::new(),
            }),
            capabilities: Mutex::new(BTreeMap::new()),
        }
    }

    /// Spawn the adapter subprocess and complete the initialize handshake.
    /// Returns the adapter's capability map.
    pub async fn initialize(&self) -> Result<BTreeMap<String, bool>, DapError> {
        let mut child = Command::new(&self.options.python)
            .args(["-m", "debugpy.adapter"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DapError::Spawn { source })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DapError::Connection("adapter stdout unavailable".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DapError::Connection("adapter stdin unavailable".to_string()))?;
        self.start_client(stdout, stdin, Some(child)).await
    }

    /// Complete the initialize handshake over an existing byte stream.
    ///
    /// Production uses [`DebugAdapter::initialize`]; this entry exists for
    /// adapters reached over other transports and for in-process tests.
    pub async fn initialize_over<R, W>(
        &self,
        reader: R,
        writer: W,
    ) -> Result<BTreeMap<String, bool>, DapError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.start_client(reader, writer, None).await
    }

    async fn start_client<R, W>(
        &self,
        reader: R,
        writer: W,
        child: Option<Child>,
    ) -> Result<BTreeMap<String, bool>, DapError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let client = DapClient::start(
            reader,
            writer,
            self.event_handler(),
            ClientOptions {
                timeout: self.options.request_timeout,
                strict_framing: self.options.strict_framing,
            },
        );

        let inner = AdapterInner { client, child: Mutex::new(child) };
        if self.inner.set(inner).is_err() {
            return Err(DapError::InvalidConfig {
                kind: "adapter",
                message: "adapter already initialized".to_string(),
            });
        }
        let inner = match self.inner.get() {
            Some(inner) => inner,
            None => return Err(DapError::NotInitialized),
        };

        let args = serde_json::to_value(InitializeArguments::default())?;
        let body = inner.client.request("initialize", Some(args)).await?;
        let capabilities = capability_map(body);
        *self.capabilities.lock() = capabilities.clone();
        self.ready.store(true, Ordering::SeqCst);
        Ok(capabilities)
    }

    /// Last capability map from the initialize response.
    pub fn capabilities(&self) -> BTreeMap<String, bool> {
        self.capabilities.lock().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn client(&self) -> Result<&DapClient, DapError> {
        if !self.is_initialized() {
            return Err(DapError::NotInitialized);
        }
        self.inner.get().map(|i| &i.client).ok_or(DapError::NotInitialized)
    }

    /// Launch the debuggee, replaying `staged` breakpoints and exception
    /// filters during the configuration window.
    pub async fn launch(
        &self,
        config: &LaunchConfig,
        staged: &[(PathBuf, Vec<BreakpointSpec>)],
        filters: &[ExceptionFilter],
    ) -> Result<(), DapError> {
        config.validate()?;
        self.start_debuggee("launch", config.to_dap_arguments(), staged, filters).await
    }

    /// Attach to an existing debuggee, with the same configuration window.
    pub async fn attach(
        &self,
        config: &AttachConfig,
        staged: &[(PathBuf, Vec<BreakpointSpec>)],
        filters: &[ExceptionFilter],
    ) -> Result<(), DapError> {
        config.validate()?;
        self.start_debuggee("attach", config.to_dap_arguments(), staged, filters).await
    }

    async fn start_debuggee(
        &self,
        command: &str,
        arguments: Value,
        staged: &[(PathBuf, Vec<BreakpointSpec>)],
        filters: &[ExceptionFilter],
    ) -> Result<(), DapError> {
        let client = self.client()?;

        let start = client.request_with_timeout(
            command,
            Some(arguments),
            self.options.launch_timeout,
        );
        tokio::pin!(start);

        let configure = async {
            self.wait_initialized_event(self.options.launch_timeout).await?;
            for (path, specs) in staged {
                self.set_breakpoints(path, specs).await?;
            }
            if !filters.is_empty() {
                self.set_exception_breakpoints(filters).await?;
            }
            client.request("configurationDone", None).await?;
            Ok::<(), DapError>(())
        };
        tokio::pin!(configure);

        tokio::select! {
            start_result = &mut start => {
                // The start request finished before configuration did, which
                // only happens when it failed; surface that error.
                start_result?;
                Ok(())
            }
            configure_result = &mut configure => {
                configure_result?;
                start.await?;
                Ok(())
            }
        }
    }

    async fn wait_initialized_event(&self, timeout: Duration) -> Result<(), DapError> {
        if self.initialized_event.flag.load(Ordering::SeqCst) {
            return Ok(());
        }
        let notified = self.initialized_event.notify.notified();
        tokio::pin!(notified);
        if self.initialized_event.flag.load(Ordering::SeqCst) {
            return Ok(());
        }
        tokio::time::timeout(timeout, notified).await.map_err(|_| DapError::Timeout {
            command: "initialized".to_string(),
            seconds: timeout.as_secs(),
        })
    }

    /// Replace the adapter's breakpoint set for one file. Disabled specs are
    /// filtered out before the wire call.
    pub async fn set_breakpoints(
        &self,
        path: &Path,
        specs: &[BreakpointSpec],
    ) -> Result<Vec<VerifiedBreakpoint>, DapError> {
        let client = self.client()?;
        let enabled: Vec<&BreakpointSpec> = specs.iter().filter(|s| s.enabled).collect();
        let arguments = SetBreakpointsArguments {
            source: Source::from_path(path),
            breakpoints: enabled
                .iter()
                .map(|s| SourceBreakpoint {
                    line: s.line,
                    column: s.column,
                    condition: s.condition.clone(),
                    hit_condition: s.hit_condition.clone(),
                    log_message: s.log_message.clone(),
                })
                .collect(),
        };
        let body = client
            .request("setBreakpoints", Some(serde_json::to_value(arguments)?))
            .await?;
        let response: SetBreakpointsResponseBody = parse_body(body)?;

        Ok(response
            .breakpoints
            .into_iter()
            .zip(enabled.iter())
            .map(|(bp, spec)| VerifiedBreakpoint {
                id: bp.id,
                verified: bp.verified,
                source_path: path.to_path_buf(),
                line: bp.line.unwrap_or(spec.line),
                message: bp.message,
            })
            .collect())
    }

    pub async fn set_exception_breakpoints(
        &self,
        filters: &[ExceptionFilter],
    ) -> Result<(), DapError> {
        let client = self.client()?;
        let arguments = SetExceptionBreakpointsArguments {
            filters: dap_exception_filters(filters),
        };
        client
            .request("setExceptionBreakpoints", Some(serde_json::to_value(arguments)?))
            .await?;
        Ok(())
    }

    /// Resume the thread. Returns whether all threads resumed.
    pub async fn continue_thread(&self, thread_id: i64) -> Result<bool, DapError> {
        let body = self.thread_request("continue", thread_id).await?;
        let response: ContinueResponseBody = parse_body(body)?;
        Ok(response.all_threads_continued.unwrap_or(true))
    }

    pub async fn pause(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_request("pause", thread_id).await.map(drop)
    }

    pub async fn step_next(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_request("next", thread_id).await.map(drop)
    }

    pub async fn step_in(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_request("stepIn", thread_id).await.map(drop)
    }

    pub async fn step_out(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_request("stepOut", thread_id).await.map(drop)
    }

    async fn thread_request(
        &self,
        command: &str,
        thread_id: i64,
    ) -> Result<Option<Value>, DapError> {
        let client = self.client()?;
        let arguments = serde_json::to_value(ThreadIdArguments { thread_id })?;
        client.request(command, Some(arguments)).await
    }

    pub async fn threads(&self) -> Result<Vec<Thread>, DapError> {
        let client = self.client()?;
        let body = client.request("threads", None).await?;
        let response: ThreadsResponseBody = parse_body(body)?;
        Ok(response.threads)
    }

    pub async fn stack_trace(
        &self,
        thread_id: i64,
        start_frame: Option<u32>,
        levels: Option<u32>,
    ) -> Result<(Vec<StackFrame>, Option<u32>), DapError> {
        let client = self.client()?;
        let arguments = StackTraceArguments { thread_id, start_frame, levels };
        let body = client
            .request("stackTrace", Some(serde_json::to_value(arguments)?))
            .await?;
        let response: StackTraceResponseBody = parse_body(body)?;
        Ok((response.stack_frames, response.total_frames))
    }

    pub async fn scopes(&self, frame_id: i64) -> Result<Vec<Scope>, DapError> {
        let client = self.client()?;
        let body = client
            .request("scopes", Some(serde_json::to_value(ScopesArguments { frame_id })?))
            .await?;
        let response: ScopesResponseBody = parse_body(body)?;
        Ok(response.scopes)
    }

    pub async fn variables(
        &self,
        variables_reference: i64,
        start: Option<u32>,
        count: Option<u32>,
    ) -> Result<Vec<crate::types::Variable>, DapError> {
        let client = self.client()?;
        let arguments = VariablesArguments { variables_reference, start, count };
        let body = client
            .request("variables", Some(serde_json::to_value(arguments)?))
            .await?;
        let response: VariablesResponseBody = parse_body(body)?;
        Ok(response.variables)
    }

    pub async fn evaluate(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: Option<&str>,
    ) -> Result<EvaluateResponseBody, DapError> {
        let client = self.client()?;
        let arguments = EvaluateArguments {
            expression: expression.to_string(),
            frame_id,
            context: context.map(str::to_string),
        };
        let body = client
            .request("evaluate", Some(serde_json::to_value(arguments)?))
            .await?;
        let body = body.ok_or_else(|| DapError::RequestFailed {
            command: "evaluate".to_string(),
            message: "response missing body".to_string(),
            details: None,
        })?;
        Ok(serde_json::from_value(body)?)
    }

    /// Tear down: DAP disconnect (terminating the debuggee), stop the client,
    /// then SIGTERM → grace → SIGKILL on the subprocess. Errors are logged;
    /// teardown always completes.
    pub async fn disconnect(&self) {
        let Some(inner) = self.inner.get() else { return };

        let arguments = DisconnectArguments { terminate_debuggee: true };
        if let Ok(arguments) = serde_json::to_value(arguments) {
            if let Err(e) = inner
                .client
                .request_with_timeout("disconnect", Some(arguments), DISCONNECT_TIMEOUT)
                .await
            {
                debug!(error = %e, "disconnect request did not complete cleanly");
            }
        }
        inner.client.stop().await;

        let child = inner.child.lock().take();
        if let Some(mut child) = child {
            if let Some(pid) = child.id() {
                if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    debug!(error = %e, pid, "SIGTERM to adapter failed");
                }
            }
            match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "adapter subprocess exited"),
                Ok(Err(e)) => warn!(error = %e, "failed to reap adapter subprocess"),
                Err(_) => {
                    warn!("adapter subprocess ignored SIGTERM, killing");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
        }
    }

    fn event_handler(&self) -> EventHandler {
        let sink = Arc::clone(&self.sink);
        let initialized = Arc::clone(&self.initialized_event);
        Box::new(move |name, body| {
            if name == "initialized" {
                initialized.flag.store(true, Ordering::SeqCst);
                initialized.notify.notify_one();
                return;
            }
            match map_event(name, body) {
                Ok(Some(event)) => sink(event),
                Ok(None) => debug!(event = name, "ignoring unmapped DAP event"),
                Err(e) => warn!(event = name, error = %e, "dropping undecodable DAP event"),
            }
        })
    }
}

fn parse_body<T: DeserializeOwned + Default>(body: Option<Value>) -> Result<T, DapError> {
    match body {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

fn capability_map(body: Option<Value>) -> BTreeMap<String, bool> {
    let mut capabilities = BTreeMap::new();
    if let Some(Value::Object(map)) = body {
        for (name, value) in map {
            if let Value::Bool(flag) = value {
                capabilities.insert(name, flag);
            }
        }
    }
    capabilities
}

fn map_event(name: &str, body: Option<Value>) -> Result<Option<AdapterEvent>, serde_json::Error> {
    let event = match name {
        "stopped" => {
            let body: StoppedEventBody = from_body(body)?;
            let reason = StopReason::from_dap(&body.reason).unwrap_or_else(|| {
                debug!(reason = %body.reason, "unrecognized stop reason");
                StopReason::Pause
            });
            Some(AdapterEvent::Stopped {
                reason,
                thread_id: body.thread_id,
                hit_breakpoint_ids: body.hit_breakpoint_ids.unwrap_or_default(),
                description: body.description,
            })
        }
        "continued" => {
            let body: ContinuedEventBody = from_body(body)?;
            Some(AdapterEvent::Continued {
                thread_id: Some(body.thread_id),
                all_threads: body.all_threads_continued.unwrap_or(false),
            })
        }
        "terminated" => Some(AdapterEvent::Terminated),
        "exited" => {
            let body: ExitedEventBody = from_body(body)?;
            Some(AdapterEvent::Exited { exit_code: body.exit_code })
        }
        "output" => {
            let body: OutputEventBody = from_body(body)?;
            Some(AdapterEvent::Output {
                category: OutputCategory::from_dap(body.category.as_deref()),
                text: body.output,
                source: body.source.and_then(|s| s.path),
                line: body.line,
            })
        }
        "breakpoint" => {
            let body: BreakpointEventBody = from_body(body)?;
            let Breakpoint { id, verified, line, message, .. } = body.breakpoint;
            Some(AdapterEvent::BreakpointChanged {
                reason: body.reason,
                id,
                verified,
                line,
                message,
            })
        }
        "thread" => {
            let body: ThreadEventBody = from_body(body)?;
            Some(AdapterEvent::Thread { reason: body.reason, thread_id: body.thread_id })
        }
        "module" => {
            let body: ModuleEventBody = from_body(body)?;
            Some(AdapterEvent::Module { reason: body.reason, name: body.module.name })
        }
        _ => None,
    };
    Ok(event)
}

fn from_body<T: DeserializeOwned>(body: Option<Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(body.unwrap_or(Value::Null))
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
