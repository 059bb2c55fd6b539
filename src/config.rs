//! # Runtime configuration
//! Env-driven settings for the resolution pipeline. Every knob has a
//! production default so the service boots with nothing but a `.env`
//! (or no env at all, with the AI fallback off).

use std::path::PathBuf;
use std::time::Duration;

// --- env names & defaults ---
pub const ENV_AI_FALLBACK_ENABLED: &str = "AI_FALLBACK_ENABLED";
pub const ENV_AI_RESPONSE_TIMEOUT_MS: &str = "AI_RESPONSE_TIMEOUT_MS";
pub const ENV_AI_RATE_LIMIT_PER_MINUTE: &str = "AI_RATE_LIMIT_PER_MINUTE";
pub const ENV_MAX_RESPONSE_LENGTH: &str = "MAX_RESPONSE_LENGTH";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_ANSWERS_PATH: &str = "ANSWERS_PATH";
pub const ENV_ANSWERS_HOT_RELOAD: &str = "ANSWERS_HOT_RELOAD";

pub const DEFAULT_AI_RESPONSE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_AI_RATE_LIMIT_PER_MINUTE: u32 = 30;
pub const DEFAULT_MAX_RESPONSE_LENGTH: usize = 2_000;
pub const DEFAULT_ANSWERS_PATH: &str = "config/answers.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Master switch for the remote fallback; off means every miss is
    /// answered with the fixed apology text.
    pub ai_fallback_enabled: bool,
    pub ai_response_timeout: Duration,
    pub ai_rate_limit_per_minute: u32,
    /// Hard cap applied to every outgoing answer, local or remote.
    pub max_response_length: usize,
    pub gemini_api_key: String,
    pub answers_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_fallback_enabled: false,
            ai_response_timeout: Duration::from_millis(DEFAULT_AI_RESPONSE_TIMEOUT_MS),
            ai_rate_limit_per_minute: DEFAULT_AI_RATE_LIMIT_PER_MINUTE,
            max_response_length: DEFAULT_MAX_RESPONSE_LENGTH,
            gemini_api_key: String::new(),
            answers_path: PathBuf::from(DEFAULT_ANSWERS_PATH),
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment, falling back to the
    /// defaults above for anything missing or unparsable.
    pub fn from_env() -> Self {
        let enabled = env_flag(ENV_AI_FALLBACK_ENABLED);

        let timeout_ms = env_parse(ENV_AI_RESPONSE_TIMEOUT_MS)
            .filter(|&ms: &u64| ms > 0)
            .unwrap_or(DEFAULT_AI_RESPONSE_TIMEOUT_MS);

        let rate_limit = env_parse(ENV_AI_RATE_LIMIT_PER_MINUTE)
            .filter(|&n: &u32| n > 0)
            .unwrap_or(DEFAULT_AI_RATE_LIMIT_PER_MINUTE);

        // Anything below the ellipsis marker would truncate into nonsense.
        let max_len = env_parse(ENV_MAX_RESPONSE_LENGTH)
            .filter(|&n: &usize| n > 3)
            .unwrap_or(DEFAULT_MAX_RESPONSE_LENGTH);

        let answers_path = std::env::var(ENV_ANSWERS_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ANSWERS_PATH));

        Self {
            ai_fallback_enabled: enabled,
            ai_response_timeout: Duration::from_millis(timeout_ms),
            ai_rate_limit_per_minute: rate_limit,
            max_response_length: max_len,
            gemini_api_key: std::env::var(ENV_GEMINI_API_KEY).unwrap_or_default(),
            answers_path,
        }
    }

    pub fn hot_reload_requested() -> bool {
        env_flag(ENV_ANSWERS_HOT_RELOAD)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
