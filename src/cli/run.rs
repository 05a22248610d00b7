// src/cli/run.rs — The `run` command and operator boundary

use std::sync::Arc;
use std::time::Duration;

use crate::core::pipeline::Pipeline;
use crate::core::types::ProgressEvent;
use crate::host::bridge::HostBridge;
use crate::host::ScriptHost;
use crate::infra::config::Config;
use crate::provider::openai::OpenAiProvider;
use crate::provider::ModelProvider;
use crate::retrieval::http::HttpRetriever;
use crate::retrieval::{DisabledRetriever, DocRetriever};

/// Build collaborators from config and run the pipeline.
///
/// This is the operator boundary: every otherwise-unhandled error lands
/// here, gets logged, and turns into a generic failure message — the
/// user never sees a backtrace.
pub async fn run_pipeline(
    config: &Config,
    request: &str,
    max_iterations: Option<u8>,
    no_materials: bool,
) -> i32 {
    let mut config = config.clone();
    if let Some(n) = max_iterations {
        config.pipeline.max_iterations = n;
    }
    if no_materials {
        config.pipeline.enable_materials = false;
    }

    let api_key = match config.api_key() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiProvider::new(
        api_key,
        config.models.base_url.clone(),
        config.models.generator.clone(),
        config.models.evaluator.clone(),
        Duration::from_secs(config.models.timeout_seconds),
    ));

    let retriever: Arc<dyn DocRetriever> = if config.retrieval.enabled {
        Arc::new(HttpRetriever::new(
            config.retrieval.endpoint.clone(),
            Duration::from_secs(config.retrieval.timeout_seconds),
        ))
    } else {
        Arc::new(DisabledRetriever)
    };

    let host: Arc<dyn ScriptHost> = Arc::new(HostBridge::new(
        config.host.endpoint.clone(),
        Duration::from_secs(config.host.timeout_seconds),
    ));

    let pipeline = Pipeline::new(provider, retriever, host, &config).with_progress(print_progress);

    match pipeline.run(request).await {
        Ok(result) => {
            let exhausted: Vec<&str> = result
                .objects
                .iter()
                .filter(|o| o.exhausted)
                .map(|o| o.artifact.object_type.as_str())
                .collect();
            if exhausted.is_empty() {
                println!("Scene '{}' generated successfully.", result.scene.scene_name);
            } else {
                println!(
                    "Scene '{}' generated; {} object(s) did not fully pass review: {}",
                    result.scene.scene_name,
                    exhausted.len(),
                    exhausted.join(", ")
                );
            }
            if let Some(dir) = result.run_dir {
                println!("Artifacts: {}", dir.display());
            }
            0
        }
        Err(e) => {
            tracing::error!("Pipeline failed: {e:#}");
            eprintln!("Scene generation failed. Check the logs for details.");
            1
        }
    }
}

fn print_progress(event: ProgressEvent) {
    match event {
        ProgressEvent::SceneDecomposed { scene_name, objects } => {
            println!("Scene '{scene_name}': {objects} object(s)");
        }
        ProgressEvent::ObjectStart { object_type, index, total } => {
            println!("[{}/{}] Generating '{object_type}'", index + 1, total);
        }
        ProgressEvent::IterationStart { iteration, max_iterations, .. } => {
            println!("  evaluating (iteration {}/{})", iteration + 1, max_iterations);
        }
        ProgressEvent::IterationEnd { status, score, .. } => {
            println!("  verdict: {status} (score {score:.1})");
        }
        ProgressEvent::ObjectDone { object_type, exhausted } => {
            if exhausted {
                println!("  '{object_type}' kept with warnings");
            } else {
                println!("  '{object_type}' accepted");
            }
        }
        ProgressEvent::Composing => println!("Composing scene..."),
        ProgressEvent::ApplyingMaterials => println!("Applying materials..."),
        ProgressEvent::Complete { .. } => {}
    }
}
