// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analytics;
pub mod api;
pub mod chat_store;
pub mod config;
pub mod gateway;
pub mod lookup;
pub mod matcher;
pub mod metrics;
pub mod outcome;
pub mod rate_limit;
pub mod resolver;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::outcome::{ResolutionOutcome, ResolutionRequest, ResponseSource};
pub use crate::resolver::ResponseResolver;
