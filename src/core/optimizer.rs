// src/core/optimizer.rs — Bounded evaluate → consolidate → optimize loop

use std::sync::Arc;

use super::consolidator::SuggestionConsolidator;
use super::session::SessionContext;
use super::synthesizer::ModelSynthesizer;
use super::types::{
    GeneratedArtifact, IterationRecord, ObjectSpec, OptimizationOutcome, ProgressEvent, Status,
};
use crate::evaluator::judges::EvalContext;
use crate::evaluator::{aggregate, MultiEvaluator};
use crate::host::ScriptHost;
use crate::infra::artifacts::RunArtifacts;
use crate::infra::errors::SceneForgeError;

/// The bounded controller for one object.
///
/// State machine per iteration: render views, evaluate with the full
/// judge roster, stop on PASS/GOOD; otherwise consolidate suggestions
/// and regenerate — unless the iteration budget is spent, in which case
/// the loop stops with a warning outcome and whatever code it has.
/// For a budget of N this performs at most N evaluation calls and at
/// most N-1 optimize calls.
pub struct OptimizationLoop {
    evaluator: MultiEvaluator,
    consolidator: SuggestionConsolidator,
    synthesizer: Arc<ModelSynthesizer>,
    host: Arc<dyn ScriptHost>,
    max_iterations: u8,
}

impl OptimizationLoop {
    pub fn new(
        evaluator: MultiEvaluator,
        consolidator: SuggestionConsolidator,
        synthesizer: Arc<ModelSynthesizer>,
        host: Arc<dyn ScriptHost>,
        max_iterations: u8,
    ) -> Self {
        Self {
            evaluator,
            consolidator,
            synthesizer,
            host,
            max_iterations: max_iterations.max(1),
        }
    }

    pub async fn run(
        &self,
        session: &mut SessionContext,
        spec: &ObjectSpec,
        scene_context: &str,
        mut artifact: GeneratedArtifact,
        artifacts: Option<&RunArtifacts>,
        emit: &dyn Fn(ProgressEvent),
    ) -> Result<OptimizationOutcome, SceneForgeError> {
        let mut records: Vec<IterationRecord> = Vec::new();

        let eval_ctx = EvalContext {
            object_type: spec.object_type.clone(),
            description: spec.description.clone(),
            scene_context: scene_context.to_string(),
            components: spec
                .components
                .iter()
                .map(|c| format!("{}x {} ({})", c.quantity, c.name, c.shape))
                .collect(),
        };

        for i in 0..self.max_iterations {
            emit(ProgressEvent::IterationStart {
                object_type: spec.object_type.clone(),
                iteration: i,
                max_iterations: self.max_iterations,
            });

            // Evaluation always observes the scene state produced by the
            // immediately preceding execute step.
            self.host.refresh_view().await?;
            let screenshots = self.host.capture().await?;

            let results = self.evaluator.evaluate(session, &screenshots, &eval_ctx).await?;
            let agg = aggregate(&results);

            emit(ProgressEvent::IterationEnd {
                object_type: spec.object_type.clone(),
                iteration: i,
                status: agg.final_status,
                score: agg.average_score,
            });

            if agg.final_status != Status::NotPass {
                tracing::info!(
                    object = %spec.object_type,
                    iteration = i,
                    status = %agg.final_status,
                    score = agg.average_score,
                    "Object accepted"
                );
                let record = make_record(i, &agg, Vec::new());
                persist(artifacts, &spec.object_type, &record, None);
                records.push(record);
                return Ok(OptimizationOutcome {
                    artifact,
                    records,
                    exhausted: false,
                });
            }

            if i + 1 >= self.max_iterations {
                tracing::warn!(
                    object = %spec.object_type,
                    iterations = self.max_iterations,
                    score = agg.average_score,
                    "Optimization budget exhausted without passing; keeping last code"
                );
                let record = make_record(i, &agg, Vec::new());
                persist(artifacts, &spec.object_type, &record, None);
                records.push(record);
                return Ok(OptimizationOutcome {
                    artifact,
                    records,
                    exhausted: true,
                });
            }

            // A consolidation parse failure is a hard error of this
            // iteration: it ends this object's loop with a warning
            // outcome, keeping the current code. The rest of the scene
            // proceeds.
            let set = match self
                .consolidator
                .consolidate(session, &agg.unique_suggestions, artifact.current_code())
                .await
            {
                Ok(set) => set,
                Err(e @ SceneForgeError::Consolidation(_)) => {
                    tracing::warn!(
                        object = %spec.object_type,
                        iteration = i,
                        "Consolidation unusable, stopping this object's optimization: {e}"
                    );
                    let record = make_record(i, &agg, Vec::new());
                    persist(artifacts, &spec.object_type, &record, None);
                    records.push(record);
                    return Ok(OptimizationOutcome {
                        artifact,
                        records,
                        exhausted: true,
                    });
                }
                Err(other) => return Err(other),
            };
            let priority = if set.priority_suggestions.is_empty() {
                agg.unique_suggestions.clone()
            } else {
                set.priority_suggestions
            };

            let outcome = self
                .synthesizer
                .optimize(session, spec, artifact.current_code(), &priority)
                .await?;
            artifact.optimized_model_code = Some(outcome.code.clone());

            let record = make_record(i, &agg, priority);
            persist(artifacts, &spec.object_type, &record, Some(&outcome.code));
            records.push(record);
        }

        // Unreachable: every path above returns before the budget loops out.
        Ok(OptimizationOutcome {
            artifact,
            records,
            exhausted: true,
        })
    }
}

fn make_record(
    iteration: u8,
    agg: &crate::core::types::AggregateResult,
    priority_suggestions: Vec<String>,
) -> IterationRecord {
    IterationRecord {
        iteration,
        status: agg.final_status,
        score: agg.average_score,
        analysis: agg.combined_analysis.clone(),
        suggestions: agg.unique_suggestions.clone(),
        priority_suggestions,
    }
}

/// Artifact writes are audit bookkeeping; failures are logged, never fatal.
fn persist(
    artifacts: Option<&RunArtifacts>,
    object_type: &str,
    record: &IterationRecord,
    optimization_code: Option<&str>,
) {
    let Some(artifacts) = artifacts else { return };
    if let Err(e) = artifacts.write_iteration(object_type, record, optimization_code) {
        tracing::warn!(object = object_type, "Failed to persist iteration record: {e}");
    }
}
