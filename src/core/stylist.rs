// src/core/stylist.rs — Material styling stage

use std::sync::Arc;

use super::executor::CodeExecutor;
use super::prompts::{self, MaterialMapping};
use super::sanitizer;
use super::session::SessionContext;
use super::types::ObjectRecord;
use crate::infra::errors::SceneForgeError;
use crate::provider::ModelProvider;
use crate::retrieval::{Corpus, DocRetriever};

/// Two-step terminal stage: infer a material category per object from the
/// composed scene, then generate and execute assignment code constrained
/// to a fixed allowed-parameter list. Single shot, failures logged.
pub struct MaterialStylist {
    provider: Arc<dyn ModelProvider>,
    retriever: Arc<dyn DocRetriever>,
    executor: Arc<CodeExecutor>,
}

impl MaterialStylist {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        retriever: Arc<dyn DocRetriever>,
        executor: Arc<CodeExecutor>,
    ) -> Self {
        Self {
            provider,
            retriever,
            executor,
        }
    }

    pub async fn apply_materials(
        &self,
        session: &mut SessionContext,
        scene_context: &str,
        scene_info: &[ObjectRecord],
    ) -> Result<(), SceneForgeError> {
        if scene_info.is_empty() {
            tracing::warn!("No objects reported by the host; skipping materials");
            return Ok(());
        }

        // Step 1: category per object.
        let prompt = prompts::material_map(scene_context, scene_info);
        let response = self.provider.generate(session.messages(), &prompt).await?;
        session.record_exchange(prompt, response.clone());

        let mappings = match sanitizer::extract_json(&response) {
            Ok(value) => parse_mappings(&value),
            Err(e) => {
                tracing::warn!("Material mapping unparseable ({e}); skipping materials");
                return Ok(());
            }
        };
        if mappings.is_empty() {
            tracing::warn!("Material mapping empty; skipping materials");
            return Ok(());
        }

        // Step 2: generate and run the assignment code.
        let categories: Vec<&str> = mappings.iter().map(|m| m.category.as_str()).collect();
        let docs = self
            .retriever
            .query(Corpus::Material, &categories.join(", "))
            .await?;

        let prompt = prompts::material_apply(&mappings, &docs);
        let response = self.provider.generate(session.messages(), &prompt).await?;
        session.record_exchange(prompt, response.clone());

        if let Some(err) = self.executor.execute_soft(&response).await {
            tracing::warn!("Material assignment code failed: {err}");
        } else {
            tracing::info!(objects = mappings.len(), "Materials applied");
        }
        Ok(())
    }
}

fn parse_mappings(value: &serde_json::Value) -> Vec<MaterialMapping> {
    value["materials"]
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(object, category)| {
                    category.as_str().map(|c| MaterialMapping {
                        object: object.clone(),
                        category: c.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
