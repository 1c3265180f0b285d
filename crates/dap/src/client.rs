// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing and correlation client for one DAP connection.
//!
//! One reader task demultiplexes the inbound stream: responses complete the
//! waiter registered under their `request_seq`, events are dispatched
//! synchronously to the adapter-supplied handler. Senders assign `seq` and
//! register their waiter under one short lock; pipe writes are serialized by
//! an async lock so interleaved frames cannot corrupt framing.

use crate::error::DapError;
use crate::types::{Message, Request, Response};
use crate::wire;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Synchronous event callback, invoked on the reader task. Must not block.
pub type EventHandler = Box<dyn Fn(&str, Option<Value>) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Default per-request deadline.
    pub timeout: Duration,
    /// Fail the connection on malformed frames instead of skipping them.
    pub strict_framing: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), strict_framing: false }
    }
}

struct Shared {
    next_seq: u64,
    pending: HashMap<u64, oneshot::Sender<Result<Response, DapError>>>,
    closed: bool,
}

impl Shared {
    /// Complete every waiter with `make_err` and refuse new requests.
    fn fail_all(&mut self, make_err: impl Fn() -> DapError) {
        self.closed = true;
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(make_err()));
        }
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A DAP connection: send requests, await correlated responses.
pub struct DapClient {
    shared: Arc<Mutex<Shared>>,
    writer: Arc<tokio::sync::Mutex<Option<BoxedWriter>>>,
    cancel: CancellationToken,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    options: ClientOptions,
}

impl DapClient {
    /// Start a client over a duplex byte stream, spawning the reader task.
    pub fn start<R, W>(reader: R, writer: W, on_event: EventHandler, options: ClientOptions) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Mutex::new(Shared {
            next_seq: 0,
            pending: HashMap::new(),
            closed: false,
        }));
        let cancel = CancellationToken::new();

        let reader_task = tokio::spawn(read_loop(
            BufReader::new(reader),
            Arc::clone(&shared),
            on_event,
            cancel.clone(),
            options.strict_framing,
        ));

        Self {
            shared,
            writer: Arc::new(tokio::sync::Mutex::new(Some(Box::new(writer) as BoxedWriter))),
            cancel,
            reader_task: Mutex::new(Some(reader_task)),
            options,
        }
    }

    /// Send `command` and await the correlated response body, with the
    /// client's default deadline.
    pub async fn request(
        &self,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<Option<Value>, DapError> {
        self.request_with_timeout(command, arguments, self.options.timeout).await
    }

    /// Send `command` and await the correlated response body.
    ///
    /// On deadline the pending entry is removed first, so a late response is
    /// discarded instead of completing a vanished waiter.
    pub async fn request_with_timeout(
        &self,
        command: &str,
        arguments: Option<Value>,
        timeout: Duration,
    ) -> Result<Option<Value>, DapError> {
        let (seq, rx) = {
            let mut shared = self.shared.lock();
            if shared.closed {
                return Err(DapError::Connection("client is closed".to_string()));
            }
            shared.next_seq += 1;
            let seq = shared.next_seq;
            let (tx, rx) = oneshot::channel();
            shared.pending.insert(seq, tx);
            (seq, rx)
        };

        let request = Request { seq, command: command.to_string(), arguments };
        let payload = serde_json::to_vec(&Message::Request(request))?;

        let write_result = {
            let mut guard = self.writer.lock().await;
            match guard.as_mut() {
                Some(writer) => wire::write_frame(writer, &payload).await,
                None => Err(DapError::Connection("writer is closed".to_string())),
            }
        };
        if let Err(e) = write_result {
            self.shared.lock().pending.remove(&seq);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => {
                let response = result?;
                if response.success {
                    Ok(response.body)
                } else {
                    Err(DapError::RequestFailed {
                        command: command.to_string(),
                        message: response.failure_message(),
                        details: response.body,
                    })
                }
            }
            // Waiter dropped without a result: stop() raced us.
            Ok(Err(_)) => Err(DapError::Cancelled),
            Err(_) => {
                self.shared.lock().pending.remove(&seq);
                Err(DapError::Timeout {
                    command: command.to_string(),
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    /// Whether the connection is gone (EOF, fatal frame error, or stopped).
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Cancel the reader, fail all pending requests, close the writer, and
    /// wait for the reader task to drain.
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.shared.lock().fail_all(|| DapError::Cancelled);

        let task = self.reader_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }

        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            use tokio::io::AsyncWriteExt;
            let _ = writer.shutdown().await;
        }
    }
}

async fn read_loop<R>(
    mut reader: BufReader<R>,
    shared: Arc<Mutex<Shared>>,
    on_event: EventHandler,
    cancel: CancellationToken,
    strict: bool,
) where
    R: AsyncRead + Send + Unpin + 'static,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = wire::read_frame(&mut reader, strict) => frame,
        };

        match frame {
            Ok(Some(bytes)) => match serde_json::from_slice::<Message>(&bytes) {
                Ok(message) => dispatch(&shared, &on_event, message),
                Err(e) if strict => {
                    warn!(error = %e, "unparseable DAP message in strict mode, closing");
                    shared.lock().fail_all(|| {
                        DapError::Connection("unparseable DAP message".to_string())
                    });
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "dropping unparseable DAP message");
                }
            },
            Ok(None) => {
                debug!("DAP stream reached EOF");
                shared
                    .lock()
                    .fail_all(|| DapError::Connection("adapter stream closed".to_string()));
                break;
            }
            Err(e) => {
                warn!(error = %e, "DAP stream read failed");
                shared.lock().fail_all(|| DapError::Connection(e.to_string()));
                break;
            }
        }
    }
}

fn dispatch(shared: &Mutex<Shared>, on_event: &EventHandler, message: Message) {
    match message {
        Message::Response(response) => {
            let waiter = shared.lock().pending.remove(&response.request_seq);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(Ok(response));
                }
                None => {
                    // Late reply after a timeout removed the entry.
                    debug!(
                        request_seq = response.request_seq,
                        command = %response.command,
                        "discarding response with no waiter"
                    );
                }
            }
        }
        Message::Event(event) => on_event(&event.event, event.body),
        Message::Request(request) => {
            // Reverse requests (e.g. runInTerminal) are not supported; the
            // initialize handshake says so, so just note any that arrive.
            debug!(command = %request.command, "ignoring reverse request from adapter");
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
