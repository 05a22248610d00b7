// src/core/pipeline.rs — End-to-end generation pipeline

use std::path::PathBuf;
use std::sync::Arc;

use super::composer::SceneComposer;
use super::consolidator::SuggestionConsolidator;
use super::decomposer::SceneDecomposer;
use super::executor::CodeExecutor;
use super::optimizer::OptimizationLoop;
use super::rewriter::PromptRewriter;
use super::session::SessionContext;
use super::stylist::MaterialStylist;
use super::synthesizer::ModelSynthesizer;
use super::types::{
    GeneratedArtifact, IterationRecord, ProgressEvent, SceneDescription,
};
use crate::evaluator::MultiEvaluator;
use crate::host::ScriptHost;
use crate::infra::artifacts::RunArtifacts;
use crate::infra::config::Config;
use crate::provider::ModelProvider;
use crate::retrieval::DocRetriever;

/// Final result of one generation run.
pub struct PipelineResult {
    pub scene: SceneDescription,
    pub objects: Vec<ObjectResult>,
    pub run_dir: Option<PathBuf>,
}

pub struct ObjectResult {
    pub artifact: GeneratedArtifact,
    pub records: Vec<IterationRecord>,
    pub exhausted: bool,
}

/// The central pipeline: rewrite → decompose → per-object synthesize +
/// optimize → compose → style. Every stage is a blocking (awaited) call
/// and objects are processed strictly in decomposition order.
pub struct Pipeline {
    rewriter: PromptRewriter,
    decomposer: SceneDecomposer,
    synthesizer: Arc<ModelSynthesizer>,
    optimizer: OptimizationLoop,
    composer: SceneComposer,
    stylist: MaterialStylist,
    host: Arc<dyn ScriptHost>,
    runs_dir: PathBuf,
    enable_materials: bool,
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send>>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        retriever: Arc<dyn DocRetriever>,
        host: Arc<dyn ScriptHost>,
        config: &Config,
    ) -> Self {
        let executor = Arc::new(CodeExecutor::new(host.clone()));
        let synthesizer = Arc::new(ModelSynthesizer::new(
            provider.clone(),
            retriever.clone(),
            executor.clone(),
            config.pipeline.correction_retries,
        ));
        let optimizer = OptimizationLoop::new(
            MultiEvaluator::new(provider.clone()),
            SuggestionConsolidator::new(provider.clone(), config.pipeline.suggestion_similarity),
            synthesizer.clone(),
            host.clone(),
            config.pipeline.max_iterations,
        );

        Self {
            rewriter: PromptRewriter::new(provider.clone()),
            decomposer: SceneDecomposer::new(provider.clone()),
            synthesizer,
            optimizer,
            composer: SceneComposer::new(provider.clone(), executor.clone()),
            stylist: MaterialStylist::new(provider, retriever, executor),
            host,
            runs_dir: config.output.resolved_runs_dir(),
            enable_materials: config.pipeline.enable_materials,
            on_progress: None,
        }
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run the full pipeline for one user request.
    ///
    /// Rewrite and decompose failures are fatal (there is no scene
    /// without them). Per-object code failures degrade; composition and
    /// material failures are logged and skipped.
    pub async fn run(&self, request: &str) -> anyhow::Result<PipelineResult> {
        let mut session = SessionContext::new();

        let structured = self.rewriter.rewrite(&mut session, request).await?;
        let scene = self
            .decomposer
            .decompose(&mut session, request, &structured)
            .await?;

        self.emit(ProgressEvent::SceneDecomposed {
            scene_name: scene.scene_name.clone(),
            objects: scene.objects.len(),
        });

        // Artifact bookkeeping is best-effort; a run without an artifact
        // directory still produces a scene.
        let artifacts = match RunArtifacts::create(&self.runs_dir, &scene.scene_name) {
            Ok(a) => {
                if let Err(e) = a.write_scene_description(&scene) {
                    tracing::warn!("Failed to write scene_description.json: {e}");
                }
                Some(a)
            }
            Err(e) => {
                tracing::warn!("Failed to create run directory: {e}");
                None
            }
        };

        let total = scene.objects.len();
        let mut objects = Vec::with_capacity(total);

        for (index, spec) in scene.objects.iter().enumerate() {
            self.emit(ProgressEvent::ObjectStart {
                object_type: spec.object_type.clone(),
                index,
                total,
            });

            let synth = self
                .synthesizer
                .synthesize(&mut session, spec, &scene.scene_context)
                .await?;

            if let Some(ref a) = artifacts {
                if let Err(e) = a.write_generation_code(&spec.object_type, &synth.first_code) {
                    tracing::warn!("Failed to write generation code: {e}");
                }
                if synth.corrections > 0 {
                    if let Err(e) =
                        a.write_corrected_generation_code(&spec.object_type, &synth.code)
                    {
                        tracing::warn!("Failed to write corrected code: {e}");
                    }
                }
            }
            if let Some(ref err) = synth.final_error {
                tracing::warn!(
                    object = %spec.object_type,
                    "Object code still failing after correction; evaluating as-is: {err}"
                );
            }

            let artifact = GeneratedArtifact::new(&spec.object_type, synth.code);
            let outcome = self
                .optimizer
                .run(
                    &mut session,
                    spec,
                    &scene.scene_context,
                    artifact,
                    artifacts.as_ref(),
                    &|e| self.emit(e),
                )
                .await?;

            self.emit(ProgressEvent::ObjectDone {
                object_type: spec.object_type.clone(),
                exhausted: outcome.exhausted,
            });
            objects.push(ObjectResult {
                artifact: outcome.artifact,
                records: outcome.records,
                exhausted: outcome.exhausted,
            });
        }

        self.emit(ProgressEvent::Composing);
        if let Err(e) = self.composer.compose(&mut session, &scene).await {
            tracing::warn!("Scene composition failed: {e}");
        }

        if self.enable_materials {
            self.emit(ProgressEvent::ApplyingMaterials);
            match self.host.describe_scene().await {
                Ok(scene_info) => {
                    if let Err(e) = self
                        .stylist
                        .apply_materials(&mut session, &scene.scene_context, &scene_info)
                        .await
                    {
                        tracing::warn!("Material styling failed: {e}");
                    }
                }
                Err(e) => tracing::warn!("Scene introspection failed, skipping materials: {e}"),
            }
        }

        if let Some(ref a) = artifacts {
            self.save_final_screenshot(a).await;
        }

        let run_dir = artifacts.map(|a| a.run_dir().to_path_buf());
        self.emit(ProgressEvent::Complete {
            run_dir: run_dir.clone(),
        });

        Ok(PipelineResult {
            scene,
            objects,
            run_dir,
        })
    }

    async fn save_final_screenshot(&self, artifacts: &RunArtifacts) {
        let result = async {
            self.host.refresh_view().await?;
            self.host.capture().await
        }
        .await;

        match result {
            Ok(shots) => {
                if let Some(first) = shots.first() {
                    if let Err(e) = artifacts.save_final_screenshot(first) {
                        tracing::warn!("Failed to save final screenshot: {e}");
                    }
                }
            }
            Err(e) => tracing::warn!("Final capture failed: {e}"),
        }
    }
}
