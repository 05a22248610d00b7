// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The decomposed scene: one per user request, immutable after decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDescription {
    pub scene_name: String,
    #[serde(default)]
    pub scene_context: String,
    pub objects: Vec<ObjectSpec>,
}

/// One physical object in the scene. Never mutated after decomposition;
/// only the generated code associated with it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub object_type: String,
    /// Free-text spatial hint ("left of the desk, facing the window").
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

/// A geometric component of an object. `shape` is an open tag set — the
/// synthesizer may invent new shape names, so it is a plain string, and
/// `dimensions` keys vary by shape without schema enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub shape: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, f64>,
}

fn default_quantity() -> u32 {
    1
}

/// Judge verdict for one evaluation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    NotPass,
    Pass,
    Good,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::NotPass => write!(f, "NOT_PASS"),
            Status::Pass => write!(f, "PASS"),
            Status::Good => write!(f, "GOOD"),
        }
    }
}

impl Status {
    /// Lenient parse of model-produced status strings.
    pub fn parse(s: &str) -> Option<Status> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "NOT_PASS" | "FAIL" | "FAILED" => Some(Status::NotPass),
            "PASS" | "PASSED" | "OK" => Some(Status::Pass),
            "GOOD" | "EXCELLENT" => Some(Status::Good),
            _ => None,
        }
    }
}

/// One judge's verdict. Produced once per judge per evaluation call and
/// never merged in place — aggregation derives a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub analysis: String,
    pub status: Status,
    /// Score in [0, 10].
    pub score: f32,
    pub suggestions: Vec<String>,
}

impl EvaluationResult {
    /// The deterministic substitute used when a judge's response cannot be
    /// parsed. Always negative-leaning: a parse failure must never pass.
    pub fn parse_failure(judge: &str) -> Self {
        Self {
            analysis: format!("{judge}: response could not be parsed"),
            status: Status::NotPass,
            score: 0.0,
            suggestions: vec!["Regenerate and re-evaluate; the previous evaluation response was unparseable".into()],
        }
    }
}

/// Pure function of a set of EvaluationResults; no independent lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub combined_analysis: String,
    pub final_status: Status,
    pub average_score: f32,
    pub unique_suggestions: Vec<String>,
}

/// Consolidated suggestions for one optimization iteration. Recomputed
/// every iteration, never persisted across them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionSet {
    #[serde(default)]
    pub priority_suggestions: Vec<String>,
    #[serde(default)]
    pub secondary_suggestions: Vec<String>,
}

/// Append-only audit record of one optimization iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u8,
    pub status: Status,
    pub score: f32,
    pub analysis: String,
    pub suggestions: Vec<String>,
    pub priority_suggestions: Vec<String>,
}

/// Generated code for one object. `optimized_model_code` stays `None` until
/// an optimization pass succeeds, then is overwritten each pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub object_type: String,
    pub initial_model_code: String,
    pub optimized_model_code: Option<String>,
}

impl GeneratedArtifact {
    pub fn new(object_type: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            initial_model_code: code.into(),
            optimized_model_code: None,
        }
    }

    /// The code currently representing this object on the host.
    pub fn current_code(&self) -> &str {
        self.optimized_model_code
            .as_deref()
            .unwrap_or(&self.initial_model_code)
    }
}

/// Outcome of one object's optimization loop.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub artifact: GeneratedArtifact,
    pub records: Vec<IterationRecord>,
    /// True when the loop exhausted its budget without reaching PASS/GOOD.
    pub exhausted: bool,
}

/// One object as reported by the host's scene introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub location: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default)]
    pub dimensions: [f64; 3],
    #[serde(default)]
    pub materials: Vec<String>,
}

/// Real-time progress events emitted by the pipeline for CLI display.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    SceneDecomposed {
        scene_name: String,
        objects: usize,
    },
    ObjectStart {
        object_type: String,
        index: usize,
        total: usize,
    },
    IterationStart {
        object_type: String,
        iteration: u8,
        max_iterations: u8,
    },
    IterationEnd {
        object_type: String,
        iteration: u8,
        status: Status,
        score: f32,
    },
    ObjectDone {
        object_type: String,
        exhausted: bool,
    },
    Composing,
    ApplyingMaterials,
    Complete {
        run_dir: Option<std::path::PathBuf>,
    },
}
