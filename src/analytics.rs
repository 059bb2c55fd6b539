//! # Analytics aggregator
//! In-memory counters over resolution outcomes: totals per source, a
//! running mean latency, and a trailing one-hour event log pruned lazily
//! on every record and snapshot. Process-lifetime only; a restart resets
//! everything, which is accepted and documented.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use metrics::counter;
use serde::Serialize;

use crate::outcome::{ResolutionOutcome, ResponseSource};

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct Event {
    ts_unix: u64,
    source: ResponseSource,
    latency_ms: u64,
}

#[derive(Debug, Default)]
struct Inner {
    total: u64,
    local: u64,
    remote: u64,
    rate_limited: u64,
    disabled: u64,
    error: u64,
    average_latency_ms: f64,
    last_hour: VecDeque<Event>,
}

impl Inner {
    fn count_for(&self, source: ResponseSource) -> u64 {
        match source {
            ResponseSource::Local => self.local,
            ResponseSource::Remote => self.remote,
            ResponseSource::RateLimited => self.rate_limited,
            ResponseSource::Disabled => self.disabled,
            ResponseSource::Error => self.error,
        }
    }

    fn bump(&mut self, source: ResponseSource) {
        self.total += 1;
        match source {
            ResponseSource::Local => self.local += 1,
            ResponseSource::Remote => self.remote += 1,
            ResponseSource::RateLimited => self.rate_limited += 1,
            ResponseSource::Disabled => self.disabled += 1,
            ResponseSource::Error => self.error += 1,
        }
    }

    fn prune(&mut self, now: u64) {
        let cutoff = now.saturating_sub(HOUR.as_secs());
        while let Some(front) = self.last_hour.front() {
            if front.ts_unix < cutoff {
                self.last_hour.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Thread-safe aggregator; constructed once at startup and handed to the
/// resolver and the stats handler by `Arc`, never ambient.
#[derive(Debug, Default)]
pub struct Analytics {
    inner: Mutex<Inner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceBreakdown {
    pub local: u64,
    pub remote: u64,
    pub rate_limited: u64,
    pub disabled: u64,
    pub error: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub total: u64,
    pub counts: SourceBreakdown,
    /// Percent of total per source, rounded to the nearest integer;
    /// all zero when nothing has been recorded yet.
    pub percentages: SourceBreakdown,
    pub average_latency_ms: f64,
    pub last_hour_count: usize,
    pub last_hour_breakdown: SourceBreakdown,
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome: bump the source counter, fold the latency
    /// into the running mean (skipped for zero latencies), and append
    /// to the hourly log, pruning expired entries in the same call.
    pub fn record(&self, outcome: &ResolutionOutcome) {
        self.record_at(outcome, now_unix());
    }

    fn record_at(&self, outcome: &ResolutionOutcome, now: u64) {
        counter!("responses_total", "source" => outcome.source.as_str()).increment(1);

        let mut inner = self.inner.lock().expect("analytics mutex poisoned");
        inner.bump(outcome.source);

        if outcome.latency_ms > 0 {
            let n = inner.total as f64;
            inner.average_latency_ms =
                (inner.average_latency_ms * (n - 1.0) + outcome.latency_ms as f64) / n;
        }

        inner.last_hour.push_back(Event {
            ts_unix: now,
            source: outcome.source,
            latency_ms: outcome.latency_ms,
        });
        inner.prune(now);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(now_unix())
    }

    fn snapshot_at(&self, now: u64) -> Snapshot {
        let mut inner = self.inner.lock().expect("analytics mutex poisoned");
        inner.prune(now);

        let pct = |count: u64| -> u64 {
            if inner.total == 0 {
                0
            } else {
                ((count as f64 / inner.total as f64) * 100.0).round() as u64
            }
        };

        let hour_count = |source: ResponseSource| -> u64 {
            inner
                .last_hour
                .iter()
                .filter(|e| e.source == source)
                .count() as u64
        };

        Snapshot {
            total: inner.total,
            counts: SourceBreakdown {
                local: inner.local,
                remote: inner.remote,
                rate_limited: inner.rate_limited,
                disabled: inner.disabled,
                error: inner.error,
            },
            percentages: SourceBreakdown {
                local: pct(inner.local),
                remote: pct(inner.remote),
                rate_limited: pct(inner.rate_limited),
                disabled: pct(inner.disabled),
                error: pct(inner.error),
            },
            average_latency_ms: inner.average_latency_ms,
            last_hour_count: inner.last_hour.len(),
            last_hour_breakdown: SourceBreakdown {
                local: hour_count(ResponseSource::Local),
                remote: hour_count(ResponseSource::Remote),
                rate_limited: hour_count(ResponseSource::RateLimited),
                disabled: hour_count(ResponseSource::Disabled),
                error: hour_count(ResponseSource::Error),
            },
        }
    }

    /// Count recorded for one source, mainly for tests and debugging.
    pub fn count_for(&self, source: ResponseSource) -> u64 {
        self.inner
            .lock()
            .expect("analytics mutex poisoned")
            .count_for(source)
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ResolutionOutcome;

    fn outcome(source: ResponseSource, latency_ms: u64) -> ResolutionOutcome {
        ResolutionOutcome {
            text: "x".to_string(),
            source,
            confidence: 0.0,
            latency_ms,
            error_detail: None,
        }
    }

    #[test]
    fn counts_match_record_calls() {
        let a = Analytics::new();
        for _ in 0..3 {
            a.record(&outcome(ResponseSource::Local, 5));
        }
        a.record(&outcome(ResponseSource::Remote, 120));
        a.record(&outcome(ResponseSource::Error, 0));

        let snap = a.snapshot();
        assert_eq!(snap.total, 5);
        assert_eq!(snap.counts.local, 3);
        assert_eq!(snap.counts.remote, 1);
        assert_eq!(snap.counts.error, 1);
        assert_eq!(snap.counts.rate_limited, 0);
    }

    #[test]
    fn percentages_sum_to_about_100() {
        let a = Analytics::new();
        a.record(&outcome(ResponseSource::Local, 1));
        a.record(&outcome(ResponseSource::Local, 1));
        a.record(&outcome(ResponseSource::Remote, 1));

        let p = a.snapshot().percentages;
        let sum = p.local + p.remote + p.rate_limited + p.disabled + p.error;
        assert!((99..=101).contains(&sum), "sum was {sum}");
    }

    #[test]
    fn empty_snapshot_is_all_zero() {
        let snap = Analytics::new().snapshot();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.percentages.local, 0);
        assert_eq!(snap.average_latency_ms, 0.0);
        assert_eq!(snap.last_hour_count, 0);
    }

    #[test]
    fn zero_latency_does_not_drag_the_mean() {
        let a = Analytics::new();
        a.record(&outcome(ResponseSource::Remote, 100));
        a.record(&outcome(ResponseSource::Disabled, 0));

        // The zero-latency record still counts toward n, but the mean is
        // only refolded on positive latencies.
        let snap = a.snapshot();
        assert_eq!(snap.average_latency_ms, 100.0);
    }

    #[test]
    fn hourly_log_prunes_old_entries() {
        let a = Analytics::new();
        let now = now_unix();
        a.record_at(&outcome(ResponseSource::Local, 1), now - 7200);
        a.record_at(&outcome(ResponseSource::Remote, 1), now);

        let snap = a.snapshot_at(now);
        assert_eq!(snap.last_hour_count, 1);
        assert_eq!(snap.last_hour_breakdown.remote, 1);
        assert_eq!(snap.last_hour_breakdown.local, 0);
        // Lifetime counters are unaffected by pruning.
        assert_eq!(snap.total, 2);
    }
}
