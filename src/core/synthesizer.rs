// src/core/synthesizer.rs — Per-object code synthesis and optimization

use std::sync::Arc;

use super::executor::CodeExecutor;
use super::prompts;
use super::sanitizer;
use super::session::SessionContext;
use super::types::ObjectSpec;
use crate::infra::errors::SceneForgeError;
use crate::provider::ModelProvider;
use crate::retrieval::{Corpus, DocRetriever};

/// Outcome of one synthesis or optimization call. The code is always
/// present — a persistent execution failure is surfaced, not fatal,
/// because one broken object must not derail the whole scene.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub code: String,
    /// The first attempt's code, before any correction. Equal to `code`
    /// when no correction ran; kept for the artifact directory.
    pub first_code: String,
    /// Error text of the final attempt, if it still failed.
    pub final_error: Option<String>,
    /// Number of corrective round-trips actually issued.
    pub corrections: u8,
}

impl SynthesisOutcome {
    pub fn succeeded(&self) -> bool {
        self.final_error.is_none()
    }
}

/// Generates procedural-modeling code for one `ObjectSpec`, with a
/// bounded error-correction protocol shared by both modes: after each
/// generation the code runs through the executor; each failure buys at
/// most one corrective regeneration until the retry budget is spent, and
/// the final attempt's result stands either way.
pub struct ModelSynthesizer {
    provider: Arc<dyn ModelProvider>,
    retriever: Arc<dyn DocRetriever>,
    executor: Arc<CodeExecutor>,
    correction_retries: u8,
}

impl ModelSynthesizer {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        retriever: Arc<dyn DocRetriever>,
        executor: Arc<CodeExecutor>,
        correction_retries: u8,
    ) -> Self {
        Self {
            provider,
            retriever,
            executor,
            correction_retries,
        }
    }

    /// Generate and execute initial code for one object. Component-bearing
    /// specs additionally pull component documentation.
    pub async fn synthesize(
        &self,
        session: &mut SessionContext,
        spec: &ObjectSpec,
        scene_context: &str,
    ) -> Result<SynthesisOutcome, SceneForgeError> {
        let query = format!("{} {}", spec.object_type, spec.description);
        let mut docs = self.retriever.query(Corpus::Generation, &query).await?;

        if !spec.components.is_empty() {
            let component_query = spec
                .components
                .iter()
                .map(|c| format!("{} {}", c.shape, c.name))
                .collect::<Vec<_>>()
                .join(", ");
            let component_docs = self
                .retriever
                .query(Corpus::Component, &component_query)
                .await?;
            docs.push_str("\n\n");
            docs.push_str(&component_docs);
        }

        let prompt = prompts::synthesize(spec, scene_context, &docs);
        self.generate_with_correction(session, &prompt).await
    }

    /// Regenerate code for an object according to consolidated reviewer
    /// suggestions. Same correction protocol as `synthesize`.
    pub async fn optimize(
        &self,
        session: &mut SessionContext,
        spec: &ObjectSpec,
        current_code: &str,
        priority_suggestions: &[String],
    ) -> Result<SynthesisOutcome, SceneForgeError> {
        let query = format!(
            "{}: {}",
            spec.object_type,
            priority_suggestions.join("; ")
        );
        let docs = self.retriever.query(Corpus::Modification, &query).await?;
        let prompt = prompts::optimize(spec, current_code, priority_suggestions, &docs);
        self.generate_with_correction(session, &prompt).await
    }

    async fn generate_with_correction(
        &self,
        session: &mut SessionContext,
        prompt: &str,
    ) -> Result<SynthesisOutcome, SceneForgeError> {
        let response = self.provider.generate(session.messages(), prompt).await?;
        session.record_exchange(prompt, response.clone());
        let mut code = sanitizer::sanitize_code(&response);
        let first_code = code.clone();

        let mut error = match self.executor.execute(&code).await {
            Ok(()) => None,
            Err(e) => Some(e),
        };

        let mut corrections = 0u8;
        while error.is_some() && corrections < self.correction_retries {
            corrections += 1;
            let err_text = error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            tracing::info!(
                attempt = corrections,
                error = %err_text,
                "Generated code failed, requesting correction"
            );

            let correction = prompts::correct(prompt, &code, &err_text);
            let response = self
                .provider
                .generate(session.messages(), &correction)
                .await?;
            session.record_exchange(correction, response.clone());
            code = sanitizer::sanitize_code(&response);

            error = match self.executor.execute(&code).await {
                Ok(()) => None,
                Err(e) => Some(e),
            };
        }

        if let Some(ref e) = error {
            tracing::warn!(
                corrections,
                error = %e,
                "Code still failing after correction budget; continuing with best effort"
            );
        }

        Ok(SynthesisOutcome {
            code,
            first_code,
            final_error: error.map(|e| e.to_string()),
            corrections,
        })
    }
}
