// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! The relay stamps wire-visible timestamps with UTC wall-clock time and
//! measures idle/lifetime windows with monotonic time; both come from the
//! same clock so tests can drive eviction deterministically.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A clock providing monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Shared handle threaded through construction.
pub type SharedClock = Arc<dyn Clock>;

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeInner>>,
}

struct FakeInner {
    instant: Instant,
    utc: DateTime<Utc>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeInner { instant: Instant::now(), utc: Utc::now() })),
        }
    }

    /// Advance both monotonic and wall-clock time by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.instant += duration;
        inner.utc += ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::zero());
    }

    /// Pin the wall clock to a specific timestamp.
    pub fn set_utc(&self, utc: DateTime<Utc>) {
        self.inner.lock().utc = utc;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.inner.lock().utc
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
