//! HTTP surface: the chat message endpoint, the stats/health pair, and
//! the admin reload route. Everything here is thin plumbing around the
//! resolver; no decision logic lives in the handlers.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use shuttle_axum::axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::analytics::{Analytics, Snapshot};
use crate::chat_store::{ChatRole, ChatStore, ChatTurn};
use crate::config::AppConfig;
use crate::gateway::{FallbackGateway, GatewayStats, HealthReport};
use crate::lookup::LookupHandle;
use crate::outcome::ResolutionRequest;
use crate::resolver::ResponseResolver;

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<ResponseResolver>,
    gateway: Arc<FallbackGateway>,
    analytics: Arc<Analytics>,
    lookup: LookupHandle,
    chats: Arc<ChatStore>,
    answers_path: PathBuf,
}

impl AppState {
    /// Wire the pipeline from config: gateway, analytics, and resolver
    /// are constructed once here and shared by handle, never ambient.
    pub fn from_config(cfg: &AppConfig, lookup: LookupHandle) -> Self {
        let gateway = Arc::new(FallbackGateway::from_config(cfg));
        let analytics = Arc::new(Analytics::new());
        let resolver = Arc::new(ResponseResolver::new(
            lookup.clone(),
            gateway.clone(),
            analytics.clone(),
            cfg.max_response_length,
        ));
        Self {
            resolver,
            gateway,
            analytics,
            lookup,
            chats: Arc::new(ChatStore::new()),
            answers_path: cfg.answers_path.clone(),
        }
    }

    /// Test constructor with pre-built components.
    pub fn with_components(
        resolver: Arc<ResponseResolver>,
        gateway: Arc<FallbackGateway>,
        analytics: Arc<Analytics>,
        lookup: LookupHandle,
        answers_path: PathBuf,
    ) -> Self {
        Self {
            resolver,
            gateway,
            analytics,
            lookup,
            chats: Arc::new(ChatStore::new()),
            answers_path,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/new", post(new_chat))
        .route("/chat/{chat_id}/history", get(chat_history))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .route("/admin/reload-answers", get(admin_reload_answers))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct ChatMessage {
    /// Raw JSON on purpose: a missing or non-string `content` must become
    /// the fixed invalid-format reply, not a 422 from the extractor.
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default, rename = "chatId")]
    chat_id: Option<String>,
}

#[derive(serde::Serialize)]
struct ChatReply {
    content: String,
    role: &'static str,
    #[serde(rename = "chatId", skip_serializing_if = "Option::is_none")]
    chat_id: Option<String>,
    time: String,
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(msg): Json<ChatMessage>,
) -> Json<ChatReply> {
    let requester_id = headers
        .get("x-requester-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    let text = msg.content.as_str().map(str::to_string);
    let req = ResolutionRequest {
        text: text.clone(),
        conversation_id: msg.chat_id.clone(),
        requester_id,
    };

    let outcome = state.resolver.resolve(req).await;

    // Persist the turn pair after resolution. A sink failure is logged
    // and never blocks delivery of the answer.
    if let Some(chat_id) = msg.chat_id.as_deref() {
        if let Some(user_text) = text {
            if let Err(err) = state
                .chats
                .append_turn(chat_id, ChatTurn::now(ChatRole::User, user_text))
            {
                warn!(error = %err, "failed to persist user turn");
            }
        }
        if let Err(err) = state
            .chats
            .append_turn(chat_id, ChatTurn::now(ChatRole::Assistant, outcome.text.clone()))
        {
            warn!(error = %err, "failed to persist assistant turn");
        }
    }

    Json(ChatReply {
        content: outcome.text,
        role: "assistant",
        chat_id: msg.chat_id,
        time: Utc::now().to_rfc3339(),
    })
}

#[derive(serde::Serialize)]
struct NewChatResp {
    #[serde(rename = "chatId")]
    chat_id: String,
}

async fn new_chat(State(state): State<AppState>) -> (StatusCode, Json<NewChatResp>) {
    let chat_id = state.chats.create_chat();
    (StatusCode::CREATED, Json(NewChatResp { chat_id }))
}

async fn chat_history(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<ChatTurn>>, StatusCode> {
    state
        .chats
        .history(&chat_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(serde::Serialize)]
struct StatsResp {
    analytics: Snapshot,
    gateway: GatewayStats,
    answer_entries: usize,
}

async fn stats(State(state): State<AppState>) -> Json<StatsResp> {
    Json(StatsResp {
        analytics: state.analytics.snapshot(),
        gateway: state.gateway.stats(),
        answer_entries: state.lookup.entry_count(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.gateway.health_check().await)
}

async fn admin_reload_answers(State(state): State<AppState>) -> String {
    match state.lookup.reload_from_file(&state.answers_path) {
        Ok(count) => format!("reloaded ({count} entries)"),
        Err(err) => format!("failed: {err}"),
    }
}
