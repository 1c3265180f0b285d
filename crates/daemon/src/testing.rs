// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted in-process debugpy stand-in for tests.
//!
//! Speaks real DAP over a `tokio::io::duplex` pipe, including the launch /
//! initialized / configurationDone window, so sessions exercise the same
//! code paths as against the real adapter. Behavior is steered through a
//! shared [`Scenario`].

use dapmux_dap::adapter::DebugAdapter;
use dapmux_dap::types::{Event, Message, Request, Response};
use dapmux_dap::{wire, DapError};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::io::{AsyncWrite, BufReader};

use crate::session::AdapterConnector;

/// One scripted emission toward the client.
#[derive(Debug, Clone)]
pub(crate) enum Emit {
    Stopped { reason: &'static str, thread_id: i64, hit_ids: Vec<i64> },
    Output { category: &'static str, text: String },
    Exited { code: i64 },
    Terminated,
}

/// A canned evaluate result.
#[derive(Debug, Clone)]
pub(crate) enum Eval {
    Ok { result: String, type_name: String, variables_reference: i64 },
    Raise { message: String },
}

pub(crate) struct Scenario {
    /// Respond to launch/attach with this failure instead of succeeding.
    pub fail_launch: Option<String>,
    /// Emitted right after the launch/attach response.
    pub on_launch: Vec<Emit>,
    /// Per-continue emissions; when exhausted the program "finishes".
    pub on_continue: VecDeque<Vec<Emit>>,
    /// stackTrace response frames: (id, name, path, line).
    pub frames: Vec<(i64, String, String, u32)>,
    /// variables responses by reference.
    pub variables: HashMap<i64, Vec<(String, String, String, i64)>>,
    /// evaluate responses by expression.
    pub evaluations: HashMap<String, Eval>,
    /// Whether setBreakpoints verifies the requested lines.
    pub verify_breakpoints: bool,
    pub exit_code: i64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            fail_launch: None,
            on_launch: Vec::new(),
            on_continue: VecDeque::new(),
            frames: vec![(1000, "calc".to_string(), "/proj/main.py".to_string(), 5)],
            variables: HashMap::from([(
                100,
                vec![
                    ("x".to_string(), "10".to_string(), "int".to_string(), 0),
                    ("y".to_string(), "20".to_string(), "int".to_string(), 0),
                ],
            )]),
            evaluations: HashMap::from([(
                "x+y".to_string(),
                Eval::Ok { result: "30".to_string(), type_name: "int".to_string(), variables_reference: 0 },
            )]),
            verify_breakpoints: true,
            exit_code: 0,
        }
    }
}

pub(crate) struct FakeDebugpy {
    pub scenario: Arc<Mutex<Scenario>>,
}

impl FakeDebugpy {
    pub fn new() -> Self {
        Self { scenario: Arc::new(Mutex::new(Scenario::default())) }
    }

    pub fn with(scenario: Scenario) -> Self {
        Self { scenario: Arc::new(Mutex::new(scenario)) }
    }

    /// Connector wiring a fresh scripted peer per session.
    pub fn connector(&self) -> AdapterConnector {
        let scenario = Arc::clone(&self.scenario);
        Arc::new(
            move |adapter: &DebugAdapter| -> BoxFuture<'_, Result<BTreeMap<String, bool>, DapError>> {
                let scenario = Arc::clone(&scenario);
                Box::pin(async move {
                    let (client_side, peer_side) = tokio::io::duplex(256 * 1024);
                    let (client_read, client_write) = tokio::io::split(client_side);
                    let (peer_read, peer_write) = tokio::io::split(peer_side);
                    tokio::spawn(run_peer(peer_read, peer_write, scenario));
                    adapter.initialize_over(client_read, client_write).await
                })
            },
        )
    }
}

async fn run_peer<R, W>(reader: R, writer: W, scenario: Arc<Mutex<Scenario>>)
where
    R: tokio::io::AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut writer = writer;
    let mut seq = 0u64;
    let mut bp_id = 0i64;
    let mut pending_launch: Option<Request> = None;

    while let Ok(Some(bytes)) = wire::read_frame(&mut reader, true).await {
        let Ok(Message::Request(request)) = serde_json::from_slice::<Message>(&bytes) else {
            continue;
        };
        match request.command.as_str() {
            "initialize" => {
                respond(
                    &mut writer,
                    &mut seq,
                    &request,
                    true,
                    None,
                    Some(json!({
                        "supportsConfigurationDoneRequest": true,
                        "supportsConditionalBreakpoints": true,
                        "supportsHitConditionalBreakpoints": true,
                        "supportsLogPoints": true,
                    })),
                )
                .await;
            }
            "launch" | "attach" => {
                let failure = scenario.lock().fail_launch.clone();
                if let Some(message) = failure {
                    respond(
                        &mut writer,
                        &mut seq,
                        &request,
                        false,
                        Some(message.clone()),
                        Some(json!({"error": {"format": message}})),
                    )
                    .await;
                } else {
                    pending_launch = Some(request);
                    send_event(&mut writer, &mut seq, "initialized", None).await;
                }
            }
            "setBreakpoints" => {
                let verify = scenario.lock().verify_breakpoints;
                let requested = request
                    .arguments
                    .as_ref()
                    .and_then(|a| a.get("breakpoints"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let breakpoints: Vec<Value> = requested
                    .iter()
                    .map(|bp| {
                        bp_id += 1;
                        json!({
                            "id": bp_id,
                            "verified": verify,
                            "line": bp.get("line").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect();
                respond(
                    &mut writer,
                    &mut seq,
                    &request,
                    true,
                    None,
                    Some(json!({"breakpoints": breakpoints})),
                )
                .await;
            }
            "setExceptionBreakpoints" => {
                respond(&mut writer, &mut seq, &request, true, None, None).await;
            }
            "configurationDone" => {
                respond(&mut writer, &mut seq, &request, true, None, None).await;
                if let Some(launch) = pending_launch.take() {
                    let (stop_on_entry, emissions) = {
                        let scenario = scenario.lock();
                        let stop_on_entry = launch
                            .arguments
                            .as_ref()
                            .and_then(|a| a.get("stopOnEntry"))
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        (stop_on_entry, scenario.on_launch.clone())
                    };
                    respond(&mut writer, &mut seq, &launch, true, None, None).await;
                    if stop_on_entry {
                        emit(
                            &mut writer,
                            &mut seq,
                            &Emit::Stopped { reason: "entry", thread_id: 1, hit_ids: vec![] },
                        )
                        .await;
                    }
                    for emission in &emissions {
                        emit(&mut writer, &mut seq, emission).await;
                    }
                }
            }
            "continue" => {
                respond(
                    &mut writer,
                    &mut seq,
                    &request,
                    true,
                    None,
                    Some(json!({"allThreadsContinued": true})),
                )
                .await;
                send_event(
                    &mut writer,
                    &mut seq,
                    "continued",
                    Some(json!({"threadId": 1, "allThreadsContinued": true})),
                )
                .await;
                let next = scenario.lock().on_continue.pop_front();
                match next {
                    Some(emissions) => {
                        for emission in &emissions {
                            emit(&mut writer, &mut seq, emission).await;
                        }
                    }
                    None => {
                        let code = scenario.lock().exit_code;
                        emit(&mut writer, &mut seq, &Emit::Exited { code }).await;
                        emit(&mut writer, &mut seq, &Emit::Terminated).await;
                    }
                }
            }
            "next" | "stepIn" | "stepOut" => {
                respond(&mut writer, &mut seq, &request, true, None, None).await;
                emit(
                    &mut writer,
                    &mut seq,
                    &Emit::Stopped { reason: "step", thread_id: 1, hit_ids: vec![] },
                )
                .await;
            }
            "pause" => {
                respond(&mut writer, &mut seq, &request, true, None, None).await;
                emit(
                    &mut writer,
                    &mut seq,
                    &Emit::Stopped { reason: "pause", thread_id: 1, hit_ids: vec![] },
                )
                .await;
            }
            "threads" => {
                respond(
                    &mut writer,
                    &mut seq,
                    &request,
                    true,
                    None,
                    Some(json!({"threads": [{"id": 1, "name": "MainThread"}]})),
                )
                .await;
            }
            "stackTrace" => {
                let frames = scenario.lock().frames.clone();
                let frames_json: Vec<Value> = frames
                    .iter()
                    .map(|(id, name, path, line)| {
                        json!({
                            "id": id,
                            "name": name,
                            "source": {"path": path},
                            "line": line,
                            "column": 1,
                        })
                    })
                    .collect();
                respond(
                    &mut writer,
                    &mut seq,
                    &request,
                    true,
                    None,
                    Some(json!({"stackFrames": frames_json, "totalFrames": frames_json.len()})),
                )
                .await;
            }
            "scopes" => {
                respond(
                    &mut writer,
                    &mut seq,
                    &request,
                    true,
                    None,
                    Some(json!({"scopes": [
                        {"name": "Locals", "variablesReference": 100, "expensive": false},
                    ]})),
                )
                .await;
            }
            "variables" => {
                let reference = request
                    .arguments
                    .as_ref()
                    .and_then(|a| a.get("variablesReference"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let known = scenario.lock().variables.get(&reference).cloned();
                match known {
                    Some(vars) => {
                        let variables: Vec<Value> = vars
                            .iter()
                            .map(|(name, value, type_name, child_ref)| {
                                json!({
                                    "name": name,
                                    "value": value,
                                    "type": type_name,
                                    "variablesReference": child_ref,
                                })
                            })
                            .collect();
                        respond(
                            &mut writer,
                            &mut seq,
                            &request,
                            true,
                            None,
                            Some(json!({"variables": variables})),
                        )
                        .await;
                    }
                    None => {
                        respond(
                            &mut writer,
                            &mut seq,
                            &request,
                            false,
                            Some(format!("invalid variablesReference {reference}")),
                            None,
                        )
                        .await;
                    }
                }
            }
            "evaluate" => {
                let expression = request
                    .arguments
                    .as_ref()
                    .and_then(|a| a.get("expression"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let plan = scenario.lock().evaluations.get(&expression).cloned();
                match plan {
                    Some(Eval::Raise { message }) => {
                        respond(
                            &mut writer,
                            &mut seq,
                            &request,
                            false,
                            Some(message.clone()),
                            Some(json!({"error": {"format": message}})),
                        )
                        .await;
                    }
                    Some(Eval::Ok { result, type_name, variables_reference }) => {
                        respond(
                            &mut writer,
                            &mut seq,
                            &request,
                            true,
                            None,
                            Some(json!({
                                "result": result,
                                "type": type_name,
                                "variablesReference": variables_reference,
                            })),
                        )
                        .await;
                    }
                    None => {
                        respond(
                            &mut writer,
                            &mut seq,
                            &request,
                            true,
                            None,
                            Some(json!({
                                "result": format!("<{expression}>"),
                                "type": "str",
                                "variablesReference": 0,
                            })),
                        )
                        .await;
                    }
                }
            }
            "disconnect" => {
                respond(&mut writer, &mut seq, &request, true, None, None).await;
                emit(&mut writer, &mut seq, &Emit::Terminated).await;
                break;
            }
            _ => {
                respond(
                    &mut writer,
                    &mut seq,
                    &request,
                    false,
                    Some(format!("unsupported command {}", request.command)),
                    None,
                )
                .await;
            }
        }
    }
}

async fn respond<W: AsyncWrite + Unpin>(
    writer: &mut W,
    seq: &mut u64,
    request: &Request,
    success: bool,
    message: Option<String>,
    body: Option<Value>,
) {
    *seq += 1;
    let response = Message::Response(Response {
        seq: *seq,
        request_seq: request.seq,
        success,
        command: request.command.clone(),
        message,
        body,
    });
    send(writer, &response).await;
}

async fn send_event<W: AsyncWrite + Unpin>(
    writer: &mut W,
    seq: &mut u64,
    name: &str,
    body: Option<Value>,
) {
    *seq += 1;
    let event = Message::Event(Event { seq: *seq, event: name.to_string(), body });
    send(writer, &event).await;
}

async fn emit<W: AsyncWrite + Unpin>(writer: &mut W, seq: &mut u64, emission: &Emit) {
    match emission {
        Emit::Stopped { reason, thread_id, hit_ids } => {
            send_event(
                writer,
                seq,
                "stopped",
                Some(json!({
                    "reason": reason,
                    "threadId": thread_id,
                    "allThreadsStopped": true,
                    "hitBreakpointIds": hit_ids,
                })),
            )
            .await;
        }
        Emit::Output { category, text } => {
            send_event(
                writer,
                seq,
                "output",
                Some(json!({"category": category, "output": text})),
            )
            .await;
        }
        Emit::Exited { code } => {
            send_event(writer, seq, "exited", Some(json!({"exitCode": code}))).await;
        }
        Emit::Terminated => {
            send_event(writer, seq, "terminated", None).await;
        }
    }
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, message: &Message) {
    if let Ok(payload) = serde_json::to_vec(message) {
        // The client may already be gone during teardown.
        let _ = wire::write_frame(writer, &payload).await;
    }
}
