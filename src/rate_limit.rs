//! # Rate limiter
//! Sliding one-minute admission window for fallback calls, independent
//! per process. Prune + check + append happen under one lock so the cap
//! holds exactly even when admissions race.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    inner: Mutex<VecDeque<Instant>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    /// Standard one-minute window.
    pub fn per_minute(limit: u32) -> Self {
        Self::with_window(limit, Duration::from_secs(60))
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            limit,
            window,
        }
    }

    /// Admit or reject one fallback invocation. Rejected calls are not
    /// recorded; admitted calls stay counted for the full window even if
    /// the remote call later times out (the window models load placed on
    /// the upstream, not completions).
    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }

    fn admit_at(&self, now: Instant) -> bool {
        let mut buf = self.inner.lock().expect("rate window mutex poisoned");

        while let Some(&front) = buf.front() {
            if now.duration_since(front) >= self.window {
                buf.pop_front();
            } else {
                break;
            }
        }

        if buf.len() >= self.limit as usize {
            return false;
        }
        buf.push_back(now);
        true
    }

    /// Admissions still inside the window, for the stats surface.
    pub fn admitted_in_window(&self) -> usize {
        let now = Instant::now();
        let buf = self.inner.lock().expect("rate window mutex poisoned");
        buf.iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}
