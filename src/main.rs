//! Campus Assistant — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the answer table, the resolution
//! pipeline, shared state, and the metrics exporter.

use shuttle_axum::ShuttleAxum;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campus_assistant::api::{self, AppState};
use campus_assistant::config::AppConfig;
use campus_assistant::lookup::{start_hot_reload_thread, LookupHandle, LookupTable};
use campus_assistant::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campus_assistant=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::from_env();

    // A missing or malformed answers file is not fatal: the service
    // still runs, with every question going to the fallback path.
    let table = match LookupTable::load_from_file(&cfg.answers_path) {
        Ok(t) => t,
        Err(err) => {
            warn!(error = %err, path = %cfg.answers_path.display(), "answer table unavailable, starting empty");
            LookupTable::default()
        }
    };
    let lookup = LookupHandle::new(table);
    start_hot_reload_thread(lookup.clone(), cfg.answers_path.clone());

    let metrics = Metrics::init(cfg.ai_rate_limit_per_minute);

    let state = AppState::from_config(&cfg, lookup);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
