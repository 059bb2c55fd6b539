//! # Response resolver
//! Orchestrates one inbound message through the pipeline: malformed-input
//! short-circuit, lookup-table match, remote fallback, global truncation,
//! and exactly one analytics record. Every failure mode comes back as a
//! typed outcome; `resolve` never returns an error.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::analytics::Analytics;
use crate::gateway::FallbackGateway;
use crate::lookup::LookupHandle;
use crate::outcome::{ResolutionOutcome, ResolutionRequest, ResponseSource, INVALID_FORMAT_TEXT};

/// Marker appended when a response is cut down to the configured length.
const ELLIPSIS: &str = "...";

pub struct ResponseResolver {
    lookup: LookupHandle,
    gateway: Arc<FallbackGateway>,
    analytics: Arc<Analytics>,
    max_response_length: usize,
}

impl ResponseResolver {
    pub fn new(
        lookup: LookupHandle,
        gateway: Arc<FallbackGateway>,
        analytics: Arc<Analytics>,
        max_response_length: usize,
    ) -> Self {
        Self {
            lookup,
            gateway,
            analytics,
            max_response_length,
        }
    }

    /// Resolve one request to exactly one outcome.
    pub async fn resolve(&self, req: ResolutionRequest) -> ResolutionOutcome {
        let started = Instant::now();

        // Malformed input bypasses matcher and gateway entirely.
        let text = match req.text.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => {
                let outcome = ResolutionOutcome::failure(
                    ResponseSource::Error,
                    INVALID_FORMAT_TEXT,
                    Some("invalid format".to_string()),
                );
                self.analytics.record(&outcome);
                return outcome;
            }
        };

        let mut outcome = match self.lookup.find_match(text) {
            Some(entry) => {
                debug!(requester = %req.requester_id, "local match");
                ResolutionOutcome {
                    text: entry.answer,
                    source: ResponseSource::Local,
                    confidence: 1.0,
                    latency_ms: started.elapsed().as_millis() as u64,
                    error_detail: None,
                }
            }
            None => {
                debug!(requester = %req.requester_id, "no local match, consulting fallback");
                let mut out = self.gateway.complete(text).await;
                // Full elapsed time, not just the gateway's internal measure.
                out.latency_ms = started.elapsed().as_millis() as u64;
                out
            }
        };

        outcome.text = truncate(outcome.text, self.max_response_length);

        self.analytics.record(&outcome);
        outcome
    }

}

/// Cap `text` at `max_len` characters, ellipsis included.
fn truncate(text: String, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text;
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
