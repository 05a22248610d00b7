// src/core/composer.rs — Scene composition stage

use std::sync::Arc;

use super::executor::CodeExecutor;
use super::prompts;
use super::session::SessionContext;
use super::types::SceneDescription;
use crate::infra::errors::SceneForgeError;
use crate::provider::ModelProvider;

/// Generates and executes placement code for the whole scene once every
/// object exists. Single shot: no evaluate/optimize loop, and an
/// execution failure is logged rather than retried.
pub struct SceneComposer {
    provider: Arc<dyn ModelProvider>,
    executor: Arc<CodeExecutor>,
}

impl SceneComposer {
    pub fn new(provider: Arc<dyn ModelProvider>, executor: Arc<CodeExecutor>) -> Self {
        Self { provider, executor }
    }

    pub async fn compose(
        &self,
        session: &mut SessionContext,
        scene: &SceneDescription,
    ) -> Result<(), SceneForgeError> {
        let prompt = prompts::compose(scene);
        let response = self.provider.generate(session.messages(), &prompt).await?;
        session.record_exchange(prompt, response.clone());

        if let Some(err) = self.executor.execute_soft(&response).await {
            tracing::warn!(scene = %scene.scene_name, "Composition code failed: {err}");
        } else {
            tracing::info!(scene = %scene.scene_name, "Scene composed");
        }
        Ok(())
    }
}
