// src/core/decomposer.rs — Scene decomposition stage

use std::sync::Arc;

use super::prompts;
use super::sanitizer;
use super::session::SessionContext;
use super::types::SceneDescription;
use crate::infra::errors::SceneForgeError;
use crate::provider::ModelProvider;

/// Converts the rewritten description into a `SceneDescription`.
///
/// The model is instructed (not code-enforced) to infer missing fields;
/// validation stops at "valid JSON with a non-empty objects list".
/// A parse failure is fatal: there is no meaningful partial scene.
pub struct SceneDecomposer {
    provider: Arc<dyn ModelProvider>,
}

impl SceneDecomposer {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    pub async fn decompose(
        &self,
        session: &mut SessionContext,
        raw_request: &str,
        structured_request: &str,
    ) -> Result<SceneDescription, SceneForgeError> {
        let prompt = prompts::decompose(raw_request, structured_request);
        let response = self.provider.generate(session.messages(), &prompt).await?;
        session.record_exchange(prompt, response.clone());

        let value = sanitizer::extract_json(&response)?;
        let mut scene: SceneDescription = serde_json::from_value(value)
            .map_err(|e| SceneForgeError::Decomposition(e.to_string()))?;

        if scene.objects.is_empty() {
            return Err(SceneForgeError::Decomposition(
                "decomposition returned an empty objects list".into(),
            ));
        }

        // Quantities below 1 violate the component invariant; clamp
        // rather than fail, matching the loose-validation policy.
        for obj in &mut scene.objects {
            for comp in &mut obj.components {
                if comp.quantity < 1 {
                    tracing::warn!(
                        object = %obj.object_type,
                        component = %comp.name,
                        "Component quantity below 1, clamping"
                    );
                    comp.quantity = 1;
                }
            }
        }

        tracing::info!(
            scene = %scene.scene_name,
            objects = scene.objects.len(),
            "Decomposed scene"
        );
        Ok(scene)
    }
}
