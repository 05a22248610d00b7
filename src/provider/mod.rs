// src/provider/mod.rs — Model provider layer

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::infra::errors::SceneForgeError;

/// Core trait for the text/vision generation collaborators.
///
/// Responses carry no schema guarantees: they may contain surrounding
/// prose, markdown fences, or malformed JSON. Callers run them through
/// the sanitizer / JSON extractor.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Text generation. `history` is the session transcript so far; the
    /// prompt is appended as the final user message.
    async fn generate(
        &self,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, SceneForgeError>;

    /// Vision generation over a set of rendered views.
    async fn generate_with_images(
        &self,
        history: &[Message],
        prompt: &str,
        images: &[PathBuf],
    ) -> Result<String, SceneForgeError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}
