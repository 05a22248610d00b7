// src/core/session.rs — Per-run conversation transcript

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provider::{Message, Role};

/// Ordered, append-only conversation shared by every stage of one
/// generation run. Created at run start, passed by `&mut` through the
/// pipeline, discarded at run end. Every model call appends exactly one
/// request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub id: String,
    pub created_at: DateTime<Utc>,
    messages: Vec<Message>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// The full history, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Record one completed request/response exchange.
    pub fn record_exchange(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: prompt.into(),
        });
        self.messages.push(Message {
            role: Role::Assistant,
            content: response.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
