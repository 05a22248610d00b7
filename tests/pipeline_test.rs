// tests/pipeline_test.rs — Integration tests: pipeline with mock collaborators

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sceneforge::core::pipeline::Pipeline;
use sceneforge::core::session::SessionContext;
use sceneforge::core::synthesizer::ModelSynthesizer;
use sceneforge::core::executor::CodeExecutor;
use sceneforge::core::types::{ComponentSpec, ObjectSpec, Status};
use sceneforge::host::ScriptHost;
use sceneforge::infra::config::Config;
use sceneforge::infra::errors::{ExecError, SceneForgeError};
use sceneforge::provider::{Message, ModelProvider};
use sceneforge::retrieval::{Corpus, DisabledRetriever, DocRetriever};

const SCENE_JSON: &str = r#"{
    "scene_name": "test_room",
    "scene_context": "a plain test room",
    "objects": [
        {
            "object_type": "table",
            "position": "center",
            "description": "a small table",
            "components": [
                {"name": "top", "quantity": 1, "shape": "cuboid", "dimensions": {"x": 1.0}}
            ]
        }
    ]
}"#;

const TWO_OBJECT_SCENE_JSON: &str = r#"{
    "scene_name": "test_room",
    "scene_context": "a plain test room",
    "objects": [
        {
            "object_type": "table",
            "position": "center",
            "description": "a small table",
            "components": []
        },
        {
            "object_type": "chair",
            "position": "next to the table",
            "description": "a simple chair",
            "components": []
        }
    ]
}"#;

/// Routes canned responses by prompt content and pops judge verdicts from
/// a scripted queue. Counts optimize and correction prompts.
struct MockProvider {
    verdicts: Mutex<VecDeque<String>>,
    vision_calls: AtomicUsize,
    optimize_calls: AtomicUsize,
    correction_calls: AtomicUsize,
    generated_code: String,
    scene_json: String,
    consolidation_response: String,
}

impl MockProvider {
    fn new(verdicts: Vec<&str>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().map(String::from).collect()),
            vision_calls: AtomicUsize::new(0),
            optimize_calls: AtomicUsize::new(0),
            correction_calls: AtomicUsize::new(0),
            generated_code: "create_object()".into(),
            scene_json: SCENE_JSON.into(),
            consolidation_response:
                r#"{"priority_suggestions": ["make the top thicker"], "secondary_suggestions": []}"#
                    .into(),
        }
    }

    fn with_generated_code(mut self, code: &str) -> Self {
        self.generated_code = code.into();
        self
    }

    fn with_scene(mut self, scene_json: &str) -> Self {
        self.scene_json = scene_json.into();
        self
    }

    fn with_consolidation_response(mut self, response: &str) -> Self {
        self.consolidation_response = response.into();
        self
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        _history: &[Message],
        prompt: &str,
    ) -> Result<String, SceneForgeError> {
        if prompt.contains("Rewrite the user's request") {
            return Ok("A plain test room with one small table. (inferred)".into());
        }
        if prompt.contains("Decompose the scene") {
            return Ok(format!("Here is the scene:\n{}", self.scene_json));
        }
        if prompt.contains("failed to execute") {
            self.correction_calls.fetch_add(1, Ordering::SeqCst);
            return Ok("```python\ncreate_object_fixed()\n```".into());
        }
        if prompt.contains("Improve the existing script") {
            let n = self.optimize_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(format!("create_object_v{}()", n + 2));
        }
        if prompt.contains("consolidating reviewer suggestions") {
            return Ok(self.consolidation_response.clone());
        }
        if prompt.contains("arranges the already-created objects") {
            return Ok("arrange()".into());
        }
        if prompt.contains("Assign one material category") {
            return Ok(r#"{"materials": {"table": "wood"}}"#.into());
        }
        if prompt.contains("creates and assigns materials") {
            return Ok("assign_materials()".into());
        }
        // Object synthesis
        Ok(format!("```python\n{}\n```", self.generated_code))
    }

    async fn generate_with_images(
        &self,
        _history: &[Message],
        _prompt: &str,
        _images: &[PathBuf],
    ) -> Result<String, SceneForgeError> {
        self.vision_calls.fetch_add(1, Ordering::SeqCst);
        let mut verdicts = self.verdicts.lock().unwrap();
        Ok(verdicts
            .pop_front()
            .unwrap_or_else(|| r#"{"analysis": "fine", "status": "GOOD", "score": 9.0, "suggestions": []}"#.into()))
    }
}

/// Host that fails any script containing "fail_marker" with a syntax
/// error, and otherwise accepts everything.
struct MockHost {
    runs: AtomicUsize,
}

impl MockHost {
    fn new() -> Self {
        Self {
            runs: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ScriptHost for MockHost {
    async fn run(&self, code: &str) -> Result<(), ExecError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if code.contains("fail_marker") {
            return Err(ExecError::Syntax {
                line: 1,
                message: "invalid syntax".into(),
            });
        }
        Ok(())
    }

    async fn capture(&self) -> Result<Vec<PathBuf>, SceneForgeError> {
        Ok(vec![
            PathBuf::from("/tmp/view_front.png"),
            PathBuf::from("/tmp/view_side.png"),
        ])
    }

    async fn refresh_view(&self) -> Result<(), SceneForgeError> {
        Ok(())
    }

    async fn describe_scene(
        &self,
    ) -> Result<Vec<sceneforge::core::types::ObjectRecord>, SceneForgeError> {
        Ok(vec![sceneforge::core::types::ObjectRecord {
            name: "table".into(),
            object_type: "MESH".into(),
            location: [0.0; 3],
            rotation: [0.0; 3],
            dimensions: [1.0, 1.0, 0.7],
            materials: vec![],
        }])
    }
}

fn test_config(runs_dir: &std::path::Path, max_iterations: u8) -> Config {
    let mut config = Config::default();
    config.pipeline.max_iterations = max_iterations;
    config.output.runs_dir = Some(runs_dir.to_path_buf());
    config
}

fn verdict(status: &str, score: f32, suggestion: &str) -> String {
    format!(
        r#"{{"analysis": "looked at it", "status": "{status}", "score": {score}, "suggestions": ["{suggestion}"]}}"#
    )
}

fn table_spec() -> ObjectSpec {
    ObjectSpec {
        object_type: "table".into(),
        position: "center".into(),
        description: "a small table".into(),
        components: vec![ComponentSpec {
            name: "top".into(),
            quantity: 1,
            shape: "cuboid".into(),
            dimensions: Default::default(),
        }],
    }
}

// ─── Full pipeline ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pipeline_accepts_on_first_evaluation() {
    let tmp = tempfile::tempdir().unwrap();
    // Three judges, all GOOD on the first (and only) evaluation.
    let provider = Arc::new(MockProvider::new(vec![]));
    let host = Arc::new(MockHost::new());

    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(DisabledRetriever),
        host.clone(),
        &test_config(tmp.path(), 2),
    );

    let result = pipeline.run("a table in a room").await.unwrap();

    assert_eq!(result.scene.scene_name, "test_room");
    assert_eq!(result.objects.len(), 1);
    let obj = &result.objects[0];
    assert!(!obj.exhausted);
    // First evaluation passed: no optimize pass ran.
    assert!(obj.artifact.optimized_model_code.is_none());
    assert_eq!(obj.records.len(), 1);
    assert_eq!(obj.records[0].status, Status::Good);
    assert_eq!(provider.optimize_calls.load(Ordering::SeqCst), 0);
    // 3 judges on the single evaluation
    assert_eq!(provider.vision_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_pipeline_writes_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::new(vec![]));
    let pipeline = Pipeline::new(
        provider,
        Arc::new(DisabledRetriever),
        Arc::new(MockHost::new()),
        &test_config(tmp.path(), 2),
    );

    let result = pipeline.run("a table").await.unwrap();
    let run_dir = result.run_dir.expect("run dir created");

    assert!(run_dir.join("scene_description.json").is_file());
    assert!(run_dir.join("table").join("table_generation_code.py").is_file());
    assert!(run_dir
        .join("table")
        .join("iteration_0")
        .join("table_evaluation_results.json")
        .is_file());
}

#[tokio::test]
async fn test_loop_bounded_and_keeps_last_optimized_code() {
    let tmp = tempfile::tempdir().unwrap();
    // max_iterations = 2; both evaluations NOT_PASS (3 judges each).
    let np = verdict("NOT_PASS", 3.0, "make the top thicker");
    let provider = Arc::new(MockProvider::new(vec![
        np.as_str(), &np, &np, // iteration 0
        &np, &np, &np, // iteration 1 (last allowed)
    ]));
    let host = Arc::new(MockHost::new());

    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(DisabledRetriever),
        host,
        &test_config(tmp.path(), 2),
    );

    let result = pipeline.run("a table").await.unwrap();
    let obj = &result.objects[0];

    // Warning outcome after the final iteration, keeping the code of the
    // single optimize pass between the two evaluations.
    assert!(obj.exhausted);
    assert_eq!(obj.records.len(), 2);
    assert_eq!(obj.records[1].status, Status::NotPass);
    assert_eq!(obj.artifact.optimized_model_code.as_deref(), Some("create_object_v2()"));

    // Boundedness: N evaluations (x3 judges), N-1 optimize calls.
    assert_eq!(provider.vision_calls.load(Ordering::SeqCst), 6);
    assert_eq!(provider.optimize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_loop_stops_as_soon_as_it_passes() {
    let tmp = tempfile::tempdir().unwrap();
    let np = verdict("NOT_PASS", 4.0, "fix it");
    let pass = verdict("PASS", 7.0, "");
    // Iteration 0: one judge fails. Iteration 1: all pass.
    let provider = Arc::new(MockProvider::new(vec![
        pass.as_str(), &np, &pass, // iteration 0 -> NOT_PASS
        &pass, &pass, &pass, // iteration 1 -> PASS
    ]));

    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(DisabledRetriever),
        Arc::new(MockHost::new()),
        &test_config(tmp.path(), 5),
    );

    let result = pipeline.run("a table").await.unwrap();
    let obj = &result.objects[0];

    assert!(!obj.exhausted);
    assert_eq!(obj.records.len(), 2);
    assert_eq!(obj.records[0].status, Status::NotPass);
    assert_eq!(obj.records[1].status, Status::Pass);
    // Stopped well before the budget of 5.
    assert_eq!(provider.vision_calls.load(Ordering::SeqCst), 6);
    assert_eq!(provider.optimize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unparseable_consolidation_stops_only_that_object() {
    let tmp = tempfile::tempdir().unwrap();
    // First object fails evaluation and then gets a consolidation
    // response with no JSON in it; the second object's evaluations all
    // default to GOOD (empty verdict queue).
    let np = verdict("NOT_PASS", 3.0, "make the top thicker");
    let provider = Arc::new(
        MockProvider::new(vec![np.as_str(), &np, &np])
            .with_scene(TWO_OBJECT_SCENE_JSON)
            .with_consolidation_response("no json here at all"),
    );
    let host = Arc::new(MockHost::new());

    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(DisabledRetriever),
        host.clone(),
        &test_config(tmp.path(), 3),
    );

    let result = pipeline.run("a table and a chair").await.unwrap();

    // The broken consolidation ends the first object's loop with a
    // warning outcome keeping its current code, and the run continues.
    assert_eq!(result.objects.len(), 2);
    let table = &result.objects[0];
    assert!(table.exhausted);
    assert_eq!(table.records.len(), 1);
    assert!(table.artifact.optimized_model_code.is_none());
    assert!(!result.objects[1].exhausted);
    assert_eq!(provider.optimize_calls.load(Ordering::SeqCst), 0);

    // Composition and materials still ran: two synthesis executions,
    // one arrangement, one material assignment.
    assert_eq!(host.runs.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_judge_parse_failure_counts_as_not_pass() {
    let tmp = tempfile::tempdir().unwrap();
    let pass = verdict("PASS", 7.0, "");
    // One judge answers prose; normalized fallback is NOT_PASS, so the
    // iteration fails and an optimize pass runs.
    let provider = Arc::new(MockProvider::new(vec![
        pass.as_str(),
        "I am not sure what to say about this.",
        &pass,
    ]));

    let pipeline = Pipeline::new(
        provider.clone(),
        Arc::new(DisabledRetriever),
        Arc::new(MockHost::new()),
        &test_config(tmp.path(), 2),
    );

    let result = pipeline.run("a table").await.unwrap();
    let obj = &result.objects[0];
    assert_eq!(obj.records[0].status, Status::NotPass);
    assert_eq!(provider.optimize_calls.load(Ordering::SeqCst), 1);
}

// ─── Error-correction protocol ──────────────────────────────────────────────

#[tokio::test]
async fn test_synthesis_correction_replaces_failing_code() {
    // First generation fails on the host; the single corrective
    // round-trip succeeds and its code becomes final.
    let provider = Arc::new(MockProvider::new(vec![]).with_generated_code("fail_marker()"));
    let host = Arc::new(MockHost::new());
    let executor = Arc::new(CodeExecutor::new(host.clone()));
    let synthesizer = ModelSynthesizer::new(
        provider.clone(),
        Arc::new(DisabledRetriever),
        executor,
        1,
    );

    let mut session = SessionContext::new();
    let outcome = synthesizer
        .synthesize(&mut session, &table_spec(), "a room")
        .await
        .unwrap();

    assert!(outcome.succeeded());
    assert_eq!(outcome.corrections, 1);
    assert_eq!(outcome.code, "create_object_fixed()");
    assert_eq!(outcome.first_code, "fail_marker()");
    assert_eq!(provider.correction_calls.load(Ordering::SeqCst), 1);
    // Two executions: the failing attempt and the corrected one.
    assert_eq!(host.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_persistent_failure_is_non_fatal() {
    /// Host that rejects everything.
    struct AlwaysFailHost;

    #[async_trait]
    impl ScriptHost for AlwaysFailHost {
        async fn run(&self, _code: &str) -> Result<(), ExecError> {
            Err(ExecError::Runtime {
                kind: "RuntimeError".into(),
                message: "boom".into(),
                traceback: String::new(),
            })
        }
        async fn capture(&self) -> Result<Vec<PathBuf>, SceneForgeError> {
            Ok(vec![])
        }
        async fn refresh_view(&self) -> Result<(), SceneForgeError> {
            Ok(())
        }
        async fn describe_scene(
            &self,
        ) -> Result<Vec<sceneforge::core::types::ObjectRecord>, SceneForgeError> {
            Ok(vec![])
        }
    }

    let provider = Arc::new(MockProvider::new(vec![]));
    let executor = Arc::new(CodeExecutor::new(Arc::new(AlwaysFailHost)));
    let synthesizer = ModelSynthesizer::new(
        provider.clone(),
        Arc::new(DisabledRetriever),
        executor,
        1,
    );

    let mut session = SessionContext::new();
    let outcome = synthesizer
        .synthesize(&mut session, &table_spec(), "a room")
        .await
        .unwrap();

    // Best-effort: the (still broken) corrected code is returned, with
    // the final error surfaced, after exactly the budgeted retries.
    assert!(!outcome.succeeded());
    assert_eq!(outcome.corrections, 1);
    assert!(outcome.final_error.unwrap().contains("RuntimeError"));
    assert_eq!(provider.correction_calls.load(Ordering::SeqCst), 1);
}

// ─── Session & retrieval semantics ──────────────────────────────────────────

#[tokio::test]
async fn test_session_transcript_grows_one_pair_per_call() {
    let provider = Arc::new(MockProvider::new(vec![]));
    let executor = Arc::new(CodeExecutor::new(Arc::new(MockHost::new())));
    let synthesizer =
        ModelSynthesizer::new(provider, Arc::new(DisabledRetriever), executor, 1);

    let mut session = SessionContext::new();
    synthesizer
        .synthesize(&mut session, &table_spec(), "a room")
        .await
        .unwrap();

    // One generation call, no correction needed: exactly one pair.
    assert_eq!(session.len(), 2);
}

#[tokio::test]
async fn test_synthesis_consults_component_docs_when_spec_has_components() {
    /// Retriever that records which corpora were queried.
    struct RecordingRetriever {
        corpora: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl DocRetriever for RecordingRetriever {
        async fn query(&self, corpus: Corpus, _text: &str) -> Result<String, SceneForgeError> {
            self.corpora.lock().unwrap().push(corpus.as_str());
            Ok(corpus.sentinel())
        }
    }

    let retriever = Arc::new(RecordingRetriever {
        corpora: Mutex::new(Vec::new()),
    });
    let executor = Arc::new(CodeExecutor::new(Arc::new(MockHost::new())));
    let synthesizer = ModelSynthesizer::new(
        Arc::new(MockProvider::new(vec![])),
        retriever.clone(),
        executor,
        1,
    );

    // Component-bearing spec: generation docs plus component docs.
    let mut session = SessionContext::new();
    synthesizer
        .synthesize(&mut session, &table_spec(), "a room")
        .await
        .unwrap();
    assert_eq!(
        *retriever.corpora.lock().unwrap(),
        vec!["generation", "component"]
    );

    // No components: only the generation corpus is consulted.
    retriever.corpora.lock().unwrap().clear();
    let mut bare = table_spec();
    bare.components.clear();
    synthesizer
        .synthesize(&mut session, &bare, "a room")
        .await
        .unwrap();
    assert_eq!(*retriever.corpora.lock().unwrap(), vec!["generation"]);
}

#[tokio::test]
async fn test_retrieval_sentinel_is_not_an_error() {
    let r = DisabledRetriever;
    for corpus in [
        Corpus::Generation,
        Corpus::Modification,
        Corpus::Component,
        Corpus::Material,
    ] {
        let doc = r.query(corpus, "anything").await.unwrap();
        assert!(doc.starts_with("No relevant"));
        assert!(doc.ends_with("information found."));
    }
}

// ─── Decomposition failure is fatal ─────────────────────────────────────────

#[tokio::test]
async fn test_unparseable_decomposition_fails_the_run() {
    /// Provider whose decomposition response has no JSON at all.
    struct BadDecomposer;

    #[async_trait]
    impl ModelProvider for BadDecomposer {
        fn id(&self) -> &str {
            "bad"
        }
        async fn generate(
            &self,
            _history: &[Message],
            prompt: &str,
        ) -> Result<String, SceneForgeError> {
            if prompt.contains("Decompose the scene") {
                Ok("I cannot produce JSON today.".into())
            } else {
                Ok("structured description".into())
            }
        }
        async fn generate_with_images(
            &self,
            _history: &[Message],
            _prompt: &str,
            _images: &[PathBuf],
        ) -> Result<String, SceneForgeError> {
            Ok(String::new())
        }
    }

    let tmp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        Arc::new(BadDecomposer),
        Arc::new(DisabledRetriever),
        Arc::new(MockHost::new()),
        &test_config(tmp.path(), 2),
    );

    assert!(pipeline.run("a table").await.is_err());
}
