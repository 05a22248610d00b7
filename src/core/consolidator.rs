// src/core/consolidator.rs — Suggestion consolidation stage

use std::sync::Arc;

use super::prompts;
use super::sanitizer;
use super::session::SessionContext;
use super::types::SuggestionSet;
use crate::infra::errors::SceneForgeError;
use crate::provider::ModelProvider;

/// Collapses the union of all judges' suggestions into priority vs
/// secondary buckets through one model call.
///
/// Near-duplicates are collapsed locally first (normalized Levenshtein
/// similarity) so the model sees each distinct point once. A parse
/// failure of the model's response is a hard error of the current
/// optimization iteration — there is no safe deterministic split.
pub struct SuggestionConsolidator {
    provider: Arc<dyn ModelProvider>,
    similarity_threshold: f64,
}

impl SuggestionConsolidator {
    pub fn new(provider: Arc<dyn ModelProvider>, similarity_threshold: f64) -> Self {
        Self {
            provider,
            similarity_threshold,
        }
    }

    pub async fn consolidate(
        &self,
        session: &mut SessionContext,
        suggestions: &[String],
        current_code: &str,
    ) -> Result<SuggestionSet, SceneForgeError> {
        let collapsed = collapse_near_duplicates(suggestions, self.similarity_threshold);
        if collapsed.is_empty() {
            return Ok(SuggestionSet {
                priority_suggestions: Vec::new(),
                secondary_suggestions: Vec::new(),
            });
        }

        let prompt = prompts::consolidate(&collapsed, current_code);
        let response = self.provider.generate(session.messages(), &prompt).await?;
        session.record_exchange(prompt, response.clone());

        let value = sanitizer::extract_json(&response)
            .map_err(|e| SceneForgeError::Consolidation(e.to_string()))?;
        let set: SuggestionSet = serde_json::from_value(value)
            .map_err(|e| SceneForgeError::Consolidation(e.to_string()))?;

        tracing::debug!(
            priority = set.priority_suggestions.len(),
            secondary = set.secondary_suggestions.len(),
            "Consolidated suggestions"
        );
        Ok(set)
    }
}

/// Drop suggestions that are near-duplicates of an earlier one, keeping
/// first-seen order. Comparison is case-insensitive normalized
/// Levenshtein similarity.
pub fn collapse_near_duplicates(suggestions: &[String], threshold: f64) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();

    for s in suggestions {
        let candidate = s.trim();
        if candidate.is_empty() {
            continue;
        }
        let duplicate = kept.iter().any(|k| {
            strsim::normalized_levenshtein(&k.to_lowercase(), &candidate.to_lowercase())
                >= threshold
        });
        if !duplicate {
            kept.push(candidate.to_string());
        }
    }

    kept
}
