//! Shared pipeline types: the per-message request, the single outcome it
//! resolves to, and the fixed user-safe texts for every failure branch.

use serde::{Deserialize, Serialize};

/// Which path produced a response. Exactly one per request, never
/// ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Answer came from the static lookup table.
    Local,
    /// Answer came from the generative fallback service.
    Remote,
    /// Fallback window exhausted; canned "high traffic" reply.
    RateLimited,
    /// Fallback administratively off or its client never initialized.
    Disabled,
    /// Timeout, upstream failure, empty body, or malformed input.
    Error,
}

impl ResponseSource {
    /// Stable label used for metrics and the stats breakdown.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Local => "local",
            ResponseSource::Remote => "remote",
            ResponseSource::RateLimited => "rate_limited",
            ResponseSource::Disabled => "disabled",
            ResponseSource::Error => "error",
        }
    }
}

/// One inbound message, as seen by the resolver. `text` is `None` when
/// the transport delivered something that was not a string.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub text: Option<String>,
    pub conversation_id: Option<String>,
    pub requester_id: String,
}

impl ResolutionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            conversation_id: None,
            requester_id: "anonymous".to_string(),
        }
    }
}

/// The single normalized result of resolving one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub text: String,
    pub source: ResponseSource,
    /// 1.0 for local hits, a fixed 0.8 stand-in for remote answers
    /// (the upstream reports no real score), 0 for every failure branch.
    pub confidence: f32,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ResolutionOutcome {
    pub fn failure(source: ResponseSource, text: &str, detail: Option<String>) -> Self {
        Self {
            text: text.to_string(),
            source,
            confidence: 0.0,
            latency_ms: 0,
            error_detail: detail,
        }
    }
}

// Fixed reply texts. These are the only failure strings users ever see;
// the internal cause stays in `error_detail` and the stats surface.
pub const DISABLED_TEXT: &str = "I'm sorry, I don't have an answer for that.";
pub const RATE_LIMITED_TEXT: &str =
    "I'm experiencing high traffic. Please try again in a moment.";
pub const ERROR_TEXT: &str =
    "I'm having trouble accessing my knowledge base right now. Please try again later.";
pub const INVALID_FORMAT_TEXT: &str = "Invalid message format. Please send a text message.";
