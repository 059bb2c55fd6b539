//! # Fallback gateway
//! Provider abstraction + the guarded path to the remote completion
//! service: disabled check, rate-limit admission, deadline-bounded call,
//! reply sanitation. Every failure mode is converted into a typed
//! outcome; nothing is raised past this boundary.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::outcome::{
    ResolutionOutcome, ResponseSource, DISABLED_TEXT, ERROR_TEXT, RATE_LIMITED_TEXT,
};
use crate::rate_limit::RateLimiter;

/// Confidence attached to every remote answer. The upstream service does
/// not report a real score; this is a documented stand-in, not a
/// measurement, and nothing downstream may branch on it.
pub const REMOTE_CONFIDENCE: f32 = 0.8;

const GEMINI_MODEL: &str = "gemini-2.5-flash";
const PROMPT_PREAMBLE: &str =
    "You are a helpful campus assistant. Answer this question concisely and helpfully: ";

/// Internal failure cause; surfaces only via `error_detail` and logs.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("timeout")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("empty response from provider")]
    EmptyResponse,
}

/// Low-level provider: does a *real* remote call. Separated so the same
/// gateway wraps production and test providers alike.
pub trait CompletionProvider: Send + Sync + 'static {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>>;
    /// Provider name for diagnostics/health output.
    fn name(&self) -> &'static str;
}

pub type DynProvider = Arc<dyn CompletionProvider>;

/// Gemini `generateContent` provider. Requires an API key.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("campus-assistant/0.1")
            .connect_timeout(Duration::from_secs(4))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: GEMINI_MODEL.to_string(),
        }
    }
}

impl CompletionProvider for GeminiProvider {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Part<'a> {
                text: &'a str,
            }
            #[derive(Serialize)]
            struct Content<'a> {
                parts: Vec<Part<'a>>,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                contents: Vec<Content<'a>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                #[serde(default)]
                candidates: Vec<Candidate>,
            }
            #[derive(Deserialize)]
            struct Candidate {
                content: RespContent,
            }
            #[derive(Deserialize)]
            struct RespContent {
                #[serde(default)]
                parts: Vec<RespPart>,
            }
            #[derive(Deserialize)]
            struct RespPart {
                #[serde(default)]
                text: String,
            }

            let url = format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
                self.model, self.api_key
            );
            let req = Req {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };

            let resp = self
                .http
                .post(&url)
                .json(&req)
                .send()
                .await
                .map_err(|e| GatewayError::Upstream(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(GatewayError::Upstream(format!(
                    "status {}",
                    resp.status()
                )));
            }

            let body: Resp = resp
                .json()
                .await
                .map_err(|e| GatewayError::Upstream(e.to_string()))?;

            let text = body
                .candidates
                .first()
                .map(|c| {
                    c.content
                        .parts
                        .iter()
                        .map(|p| p.text.as_str())
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            if text.trim().is_empty() {
                return Err(GatewayError::EmptyResponse);
            }
            Ok(text)
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Deterministic provider for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl CompletionProvider for MockProvider {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Health-probe summary for the companion endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_response: Option<ResponseSource>,
}

/// Snapshot of the gateway's own counters for the stats surface.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub enabled: bool,
    pub provider: Option<&'static str>,
    pub requests_in_last_minute: usize,
    pub rate_limit_per_minute: u32,
}

pub struct FallbackGateway {
    provider: Option<DynProvider>,
    limiter: RateLimiter,
    timeout: Duration,
}

impl FallbackGateway {
    /// Build from config. A disabled flag or a missing API key both yield
    /// a gateway with no provider, which answers every call with the
    /// fixed apology and never touches the limiter.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let provider: Option<DynProvider> = if !cfg.ai_fallback_enabled {
            info!("AI fallback is disabled");
            None
        } else if cfg.gemini_api_key.is_empty() {
            warn!("Gemini API key missing; AI fallback disabled");
            None
        } else {
            info!(model = GEMINI_MODEL, "Gemini provider initialized");
            Some(Arc::new(GeminiProvider::new(cfg.gemini_api_key.clone())))
        };

        Self {
            provider,
            limiter: RateLimiter::per_minute(cfg.ai_rate_limit_per_minute),
            timeout: cfg.ai_response_timeout,
        }
    }

    /// Test/bench constructor with an explicit provider and limiter.
    pub fn with_provider(
        provider: Option<DynProvider>,
        limiter: RateLimiter,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            limiter,
            timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Resolve one unmatched message against the remote service.
    ///
    /// Branch order: disabled → rate limit → deadline-bounded call.
    /// Latency here covers only the gateway's own work; the resolver
    /// overwrites it with the full elapsed time.
    pub async fn complete(&self, text: &str) -> ResolutionOutcome {
        let started = Instant::now();

        let Some(provider) = self.provider.as_ref() else {
            return ResolutionOutcome::failure(ResponseSource::Disabled, DISABLED_TEXT, None);
        };

        if !self.limiter.admit() {
            warn!("fallback rate limit exceeded");
            return ResolutionOutcome::failure(
                ResponseSource::RateLimited,
                RATE_LIMITED_TEXT,
                None,
            );
        }

        let prompt = format!("{PROMPT_PREAMBLE}{text}");

        let result = match tokio::time::timeout(self.timeout, provider.generate(&prompt)).await {
            Err(_elapsed) => Err(GatewayError::Timeout),
            Ok(Err(e)) => Err(e),
            Ok(Ok(raw)) if raw.trim().is_empty() => Err(GatewayError::EmptyResponse),
            Ok(Ok(raw)) => Ok(raw),
        };

        match result {
            Ok(raw) => ResolutionOutcome {
                text: sanitize_reply(raw.trim()),
                source: ResponseSource::Remote,
                confidence: REMOTE_CONFIDENCE,
                latency_ms: started.elapsed().as_millis() as u64,
                error_detail: None,
            },
            Err(err) => {
                warn!(provider = provider.name(), error = %err, "fallback call failed");
                let mut out =
                    ResolutionOutcome::failure(ResponseSource::Error, ERROR_TEXT, Some(err.to_string()));
                out.latency_ms = started.elapsed().as_millis() as u64;
                out
            }
        }
    }

    /// Probe with a benign test query for the health endpoint.
    pub async fn health_check(&self) -> HealthReport {
        let Some(provider) = self.provider.as_ref() else {
            return HealthReport {
                status: "disabled",
                message: "AI fallback is disabled".to_string(),
                last_response: None,
            };
        };

        let probe = self.complete("Hello").await;
        match probe.source {
            ResponseSource::Remote | ResponseSource::RateLimited => HealthReport {
                status: "healthy",
                message: format!("{} provider is operational", provider.name()),
                last_response: Some(probe.source),
            },
            _ => HealthReport {
                status: "error",
                message: probe
                    .error_detail
                    .unwrap_or_else(|| "probe failed".to_string()),
                last_response: Some(probe.source),
            },
        }
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            enabled: self.is_enabled(),
            provider: self.provider.as_ref().map(|p| p.name()),
            requests_in_last_minute: self.limiter.admitted_in_window(),
            rate_limit_per_minute: self.limiter.limit(),
        }
    }
}

// --- reply sanitation ---

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold regex"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("italic regex"));
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\*\s+").expect("bullet regex"));
static BREAKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("breaks regex"));

/// Flatten markdown emphasis for plain chat display: `**x**`/`*x*` lose
/// their markers, leading `*` bullets become `•`, runs of 3+ newlines
/// collapse to a blank line.
pub fn sanitize_reply(text: &str) -> String {
    let out = BOLD_RE.replace_all(text, "$1");
    let out = ITALIC_RE.replace_all(&out, "$1");
    let out = BULLET_RE.replace_all(&out, "• ");
    let out = BREAKS_RE.replace_all(&out, "\n\n");
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_and_italic() {
        assert_eq!(sanitize_reply("**bold** and *italic*"), "bold and italic");
    }

    #[test]
    fn converts_bullets_and_collapses_breaks() {
        let raw = "Intro\n\n\n\n* first\n  * second\n";
        assert_eq!(sanitize_reply(raw), "Intro\n\n• first\n• second");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitize_reply("  hi there \n\n"), "hi there");
    }
}
