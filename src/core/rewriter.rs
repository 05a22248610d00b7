// src/core/rewriter.rs — Prompt rewriting stage

use std::sync::Arc;

use super::prompts;
use super::session::SessionContext;
use crate::infra::errors::SceneForgeError;
use crate::provider::ModelProvider;

/// Converts an ambiguous user request into a structured natural-language
/// description. Pure request/response: one generation call, no retry, no
/// fallback. A failure here is fatal for the run — there is nothing to
/// decompose without it.
pub struct PromptRewriter {
    provider: Arc<dyn ModelProvider>,
}

impl PromptRewriter {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    pub async fn rewrite(
        &self,
        session: &mut SessionContext,
        raw_request: &str,
    ) -> Result<String, SceneForgeError> {
        let prompt = prompts::rewrite(raw_request);
        let response = self.provider.generate(session.messages(), &prompt).await?;
        session.record_exchange(prompt, response.clone());
        tracing::debug!(chars = response.len(), "Rewrote user request");
        Ok(response)
    }
}
