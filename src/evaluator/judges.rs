// src/evaluator/judges.rs — Judge personas

use async_trait::async_trait;
use std::path::PathBuf;

use crate::infra::errors::SceneForgeError;
use crate::provider::{Message, ModelProvider};

/// What a judge gets to look at besides the rendered views.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub object_type: String,
    pub description: String,
    pub scene_context: String,
    /// Component summary lines ("4x leg (cylinder)").
    pub components: Vec<String>,
}

/// A judge inspects the same rendered views as every other judge and
/// returns free text that should contain a JSON verdict. The roster is a
/// closed, explicitly ordered list built at startup — no runtime
/// discovery.
#[async_trait]
pub trait Judge: Send + Sync {
    fn name(&self) -> &'static str;

    fn get_prompt(&self, ctx: &EvalContext) -> String;

    async fn analyze(
        &self,
        provider: &dyn ModelProvider,
        history: &[Message],
        prompt: &str,
        images: &[PathBuf],
    ) -> Result<String, SceneForgeError> {
        provider.generate_with_images(history, prompt, images).await
    }
}

/// The fixed roster, in evaluation order.
pub fn default_roster() -> Vec<Box<dyn Judge>> {
    vec![
        Box::new(StructureJudge),
        Box::new(ProportionJudge),
        Box::new(FidelityJudge),
    ]
}

const VERDICT_FORMAT: &str = r#"Respond with JSON only, in this exact shape:
{"analysis": "<what you observed>", "status": "NOT_PASS" | "PASS" | "GOOD", "score": <0-10>, "suggestions": ["<concrete fix>", ...]}

Status meaning: NOT_PASS = defects that must be fixed; PASS = acceptable; GOOD = no meaningful improvement needed."#;

/// Checks that every expected part exists and is connected sensibly.
pub struct StructureJudge;

impl Judge for StructureJudge {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn get_prompt(&self, ctx: &EvalContext) -> String {
        format!(
            "You are a structural reviewer for 3D models. The images show canonical views of a model of: {} ({}).\n\
             Expected components:\n{}\n\n\
             Judge only structure: are all expected parts present, attached where they should be, \
             with nothing floating, duplicated, or missing? Ignore materials and colors.\n\n{}",
            ctx.object_type,
            ctx.description,
            bullet_list(&ctx.components),
            VERDICT_FORMAT,
        )
    }
}

/// Checks relative dimensions and overall silhouette.
pub struct ProportionJudge;

impl Judge for ProportionJudge {
    fn name(&self) -> &'static str {
        "proportion"
    }

    fn get_prompt(&self, ctx: &EvalContext) -> String {
        format!(
            "You are a proportion reviewer for 3D models. The images show canonical views of a model of: {} ({}).\n\n\
             Judge only proportions: relative sizes of parts, overall silhouette, symmetry where the \
             real object is symmetric. Ignore materials, colors, and missing decorative detail.\n\n{}",
            ctx.object_type, ctx.description, VERDICT_FORMAT,
        )
    }
}

/// Checks that the model actually depicts what was asked for.
pub struct FidelityJudge;

impl Judge for FidelityJudge {
    fn name(&self) -> &'static str {
        "fidelity"
    }

    fn get_prompt(&self, ctx: &EvalContext) -> String {
        format!(
            "You are reviewing whether a 3D model matches its request. The images show canonical views.\n\
             Requested object: {}\nDescription: {}\nScene context: {}\n\n\
             Judge only fidelity to the request: would a person recognize this as the requested object? \
             Are explicitly requested features present? Ignore materials and rendering quality.\n\n{}",
            ctx.object_type, ctx.description, ctx.scene_context, VERDICT_FORMAT,
        )
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none specified)".into();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}
