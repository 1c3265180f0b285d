// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO of debug events with cursor-based long polling.
//!
//! `seq` is strictly monotonic for the life of the session, including across
//! capacity evictions and `clear()`, so cursors stay meaningful. When full,
//! the oldest event is dropped before the new one is enqueued (newest wins).
//! A poll with a cursor older than the retained history delivers from the
//! earliest retained event and flags `cursor_skipped`.

use dapmux_core::{DebugEvent, EventBody, SharedClock};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;

/// One batch of events delivered to a poller.
#[derive(Debug, Clone, Serialize)]
pub struct EventsSlice {
    pub events: Vec<DebugEvent>,
    /// Opaque cursor for the next poll; echoes the request cursor when no
    /// events were delivered.
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// Set when the request cursor predates the retained history.
    pub cursor_skipped: bool,
}

struct Inner {
    events: VecDeque<DebugEvent>,
    next_seq: u64,
}

pub struct EventQueue {
    clock: SharedClock,
    max: usize,
    inner: Mutex<Inner>,
    notify: Notify,
}

impl EventQueue {
    pub fn new(max: usize, clock: SharedClock) -> Self {
        Self {
            clock,
            max,
            inner: Mutex::new(Inner { events: VecDeque::new(), next_seq: 0 }),
            notify: Notify::new(),
        }
    }

    /// Stamp and enqueue an event, evicting the oldest when at capacity.
    /// Returns the assigned `seq`.
    pub fn put(&self, body: EventBody) -> u64 {
        let timestamp = self.clock.now_utc();
        let seq = {
            let mut inner = self.inner.lock();
            inner.next_seq += 1;
            let seq = inner.next_seq;
            inner.events.push_back(DebugEvent { seq, kind: body.kind(), timestamp, body });
            while inner.events.len() > self.max {
                inner.events.pop_front();
            }
            seq
        };
        self.notify.notify_waiters();
        seq
    }

    /// Non-blocking read of events after `cursor`.
    pub fn collect(&self, cursor: Option<u64>, limit: usize) -> EventsSlice {
        let inner = self.inner.lock();
        let after = cursor.unwrap_or(0);

        let cursor_skipped = match (cursor, inner.events.front()) {
            (Some(c), Some(front)) => c + 1 < front.seq,
            _ => false,
        };

        let events: Vec<DebugEvent> = inner
            .events
            .iter()
            .filter(|e| e.seq > after)
            .take(limit)
            .cloned()
            .collect();
        let has_more = inner
            .events
            .back()
            .map_or(false, |last| events.last().map_or(false, |taken| taken.seq < last.seq));

        let next_cursor = events
            .last()
            .map(|e| e.seq.to_string())
            .or_else(|| cursor.map(|c| c.to_string()));

        EventsSlice { events, next_cursor, has_more, cursor_skipped }
    }

    /// Read events after `cursor`, blocking up to `wait` for the first one.
    ///
    /// Cancellation (dropping the future) releases only this waiter; queue
    /// state is untouched.
    pub async fn poll(&self, cursor: Option<u64>, limit: usize, wait: Duration) -> EventsSlice {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Register interest before checking, so a put between the check
            // and the await still wakes this waiter.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let slice = self.collect(cursor, limit);
            if !slice.events.is_empty() || wait.is_zero() {
                return slice;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.collect(cursor, limit);
            }
        }
    }

    /// Drop all retained events. `seq` continues from where it was.
    pub fn clear(&self) {
        self.inner.lock().events.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    /// Highest assigned `seq`, 0 before any event.
    pub fn last_seq(&self) -> u64 {
        self.inner.lock().next_seq
    }
}

/// Parse a client-supplied cursor string.
pub fn parse_cursor(cursor: Option<&str>) -> Result<Option<u64>, String> {
    match cursor {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("invalid cursor: {raw:?}")),
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
