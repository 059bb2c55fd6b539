//! # Conversation sink
//! In-memory per-chat turn log. The pipeline never calls this; the
//! message handler appends accepted turns after resolution, and a failed
//! append is a typed result the caller logs without blocking delivery.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub time: DateTime<Utc>,
}

impl ChatTurn {
    pub fn now(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            time: Utc::now(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("chat {0} not found")]
    UnknownChat(String),
}

/// Turns keyed by chat id. Appends are keyed on chat existence: writing
/// to an unknown chat fails rather than creating one implicitly.
#[derive(Debug, Default)]
pub struct ChatStore {
    inner: Mutex<HashMap<String, Vec<ChatTurn>>>,
    next_id: AtomicU64,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chat and return its id.
    pub fn create_chat(&self) -> String {
        let id = format!("chat-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner
            .lock()
            .expect("chat store mutex poisoned")
            .insert(id.clone(), Vec::new());
        id
    }

    pub fn append_turn(&self, chat_id: &str, turn: ChatTurn) -> Result<(), SinkError> {
        let mut chats = self.inner.lock().expect("chat store mutex poisoned");
        match chats.get_mut(chat_id) {
            Some(history) => {
                history.push(turn);
                Ok(())
            }
            None => Err(SinkError::UnknownChat(chat_id.to_string())),
        }
    }

    pub fn history(&self, chat_id: &str) -> Option<Vec<ChatTurn>> {
        self.inner
            .lock()
            .expect("chat store mutex poisoned")
            .get(chat_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_are_keyed_on_existence() {
        let store = ChatStore::new();
        let err = store
            .append_turn("chat-404", ChatTurn::now(ChatRole::User, "hi"))
            .unwrap_err();
        assert_eq!(err, SinkError::UnknownChat("chat-404".to_string()));

        let id = store.create_chat();
        store
            .append_turn(&id, ChatTurn::now(ChatRole::User, "hi"))
            .expect("append to existing chat");
        store
            .append_turn(&id, ChatTurn::now(ChatRole::Assistant, "hello"))
            .expect("append reply");

        let history = store.history(&id).expect("history exists");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].role, ChatRole::Assistant);
    }

    #[test]
    fn chat_ids_are_unique() {
        let store = ChatStore::new();
        let a = store.create_chat();
        let b = store.create_chat();
        assert_ne!(a, b);
    }
}
