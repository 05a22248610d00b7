// src/provider/openai.rs — OpenAI-compatible chat completions provider
//
// One provider covers both collaborator contracts: plain text generation
// and vision generation over rendered views (images are inlined as
// base64 data URLs, the OpenAI-compatible vision format).

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use super::{Message, ModelProvider, Role};
use crate::infra::errors::SceneForgeError;

/// Extra attempts after the first call when the failure is retriable
/// (429, 5xx, timeout, connect failure).
const MAX_RETRIES: u32 = 2;

const RETRY_DELAY: Duration = Duration::from_millis(250);

pub struct OpenAiProvider {
    id_str: String,
    api_key: String,
    base_url: String,
    /// Model for text generation (synthesis, rewriting, consolidation).
    text_model: String,
    /// Model for vision calls (judge evaluation over rendered views).
    vision_model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        text_model: String,
        vision_model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            id_str: "openai".into(),
            api_key,
            base_url,
            text_model,
            vision_model,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn err(&self, message: String, retriable: bool) -> SceneForgeError {
        SceneForgeError::Provider {
            provider: self.id_str.clone(),
            message,
            retriable,
        }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    async fn chat(&self, model: &str, messages: Vec<Value>) -> Result<String, SceneForgeError> {
        let mut attempt: u32 = 0;
        loop {
            match self.chat_once(model, &messages).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retriable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, "Retriable provider failure, retrying: {e}");
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn chat_once(&self, model: &str, messages: &[Value]) -> Result<String, SceneForgeError> {
        let body = json!({
            "model": model,
            "messages": messages,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(
                "User-Agent",
                format!("sceneforge/{}", env!("CARGO_PKG_VERSION")),
            )
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let retriable = e.is_timeout() || e.is_connect();
                self.err(format!("Request failed: {e}"), retriable)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let retriable = status.as_u16() == 429 || status.is_server_error();
            return Err(self.err(format!("HTTP {status}: {body}"), retriable));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| self.err(format!("Failed to parse response: {e}"), false))?;

        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| self.err("Response missing message content".into(), false))
    }

    fn text_messages(history: &[Message], prompt: &str) -> Vec<Value> {
        let mut messages: Vec<Value> = history
            .iter()
            .map(|m| json!({"role": Self::role_str(m.role), "content": m.content}))
            .collect();
        messages.push(json!({"role": "user", "content": prompt}));
        messages
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    async fn generate(
        &self,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, SceneForgeError> {
        self.chat(&self.text_model, Self::text_messages(history, prompt))
            .await
    }

    async fn generate_with_images(
        &self,
        history: &[Message],
        prompt: &str,
        images: &[PathBuf],
    ) -> Result<String, SceneForgeError> {
        let mut parts: Vec<Value> = vec![json!({"type": "text", "text": prompt})];
        for path in images {
            let bytes = std::fs::read(path)?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            let mime = match path.extension().and_then(|e| e.to_str()) {
                Some("jpg") | Some("jpeg") => "image/jpeg",
                _ => "image/png",
            };
            parts.push(json!({
                "type": "image_url",
                "image_url": {"url": format!("data:{mime};base64,{encoded}")},
            }));
        }

        let mut messages: Vec<Value> = history
            .iter()
            .map(|m| json!({"role": Self::role_str(m.role), "content": m.content}))
            .collect();
        messages.push(json!({"role": "user", "content": parts}));

        self.chat(&self.vision_model, messages).await
    }
}
