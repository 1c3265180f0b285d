// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded ring of program output.
//!
//! Appends come from the event-reader task and never block on readers; pages
//! are served to concurrent pollers. The ring holds at most `max_bytes` of
//! record text, evicting oldest-first. One record larger than the whole cap
//! is still stored; the buffer then consists of exactly that record.

use dapmux_core::{OutputCategory, OutputRecord, SharedClock};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;

/// One page of filtered output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPage {
    pub lines: Vec<OutputRecord>,
    pub offset: usize,
    pub limit: usize,
    /// Count after category filtering, over the live (non-evicted) window.
    pub total: usize,
    pub has_more: bool,
    /// True iff any record has been evicted since the last `clear()`.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutputStats {
    pub records: usize,
    pub bytes: usize,
    pub dropped: u64,
    pub truncated: bool,
}

struct Inner {
    records: VecDeque<OutputRecord>,
    bytes: usize,
    seq: u64,
    dropped: u64,
    truncated: bool,
}

pub struct OutputBuffer {
    clock: SharedClock,
    max_bytes: usize,
    inner: Mutex<Inner>,
}

impl OutputBuffer {
    pub fn new(max_bytes: usize, clock: SharedClock) -> Self {
        Self {
            clock,
            max_bytes,
            inner: Mutex::new(Inner {
                records: VecDeque::new(),
                bytes: 0,
                seq: 0,
                dropped: 0,
                truncated: false,
            }),
        }
    }

    /// Append one record. Fire-and-forget; may evict older records.
    pub fn append(
        &self,
        category: OutputCategory,
        text: String,
        source: Option<PathBuf>,
        line: Option<u32>,
    ) {
        let timestamp = self.clock.now_utc();
        let mut inner = self.inner.lock();
        inner.seq += 1;
        inner.bytes += text.len();
        let record = OutputRecord { seq: inner.seq, category, text, timestamp, source, line };
        inner.records.push_back(record);

        while inner.bytes > self.max_bytes && inner.records.len() > 1 {
            if let Some(evicted) = inner.records.pop_front() {
                inner.bytes -= evicted.text.len();
                inner.dropped += 1;
                inner.truncated = true;
            }
        }
    }

    /// Page through the live window, optionally filtered by category.
    pub fn page(&self, offset: usize, limit: usize, category: Option<OutputCategory>) -> OutputPage {
        let inner = self.inner.lock();
        let matches =
            |r: &OutputRecord| category.map_or(true, |c| r.category == c);

        let total = inner.records.iter().filter(|r| matches(r)).count();
        let lines: Vec<OutputRecord> = inner
            .records
            .iter()
            .filter(|r| matches(r))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let has_more = offset + lines.len() < total;

        OutputPage { lines, offset, limit, total, has_more, truncated: inner.truncated }
    }

    /// Reset the buffer; `seq` and the dropped counter restart from zero.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.bytes = 0;
        inner.seq = 0;
        inner.dropped = 0;
        inner.truncated = false;
    }

    pub fn stats(&self) -> OutputStats {
        let inner = self.inner.lock();
        OutputStats {
            records: inner.records.len(),
            bytes: inner.bytes,
            dropped: inner.dropped,
            truncated: inner.truncated,
        }
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
