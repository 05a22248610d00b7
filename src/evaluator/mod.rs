// src/evaluator/mod.rs — Multi-judge evaluation and aggregation

pub mod judges;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::sanitizer;
use crate::core::session::SessionContext;
use crate::core::types::{AggregateResult, EvaluationResult, Status};
use crate::infra::errors::SceneForgeError;
use crate::provider::ModelProvider;
use judges::{EvalContext, Judge};

/// Runs the fixed judge roster sequentially against the same screenshot
/// set and aggregates their verdicts.
pub struct MultiEvaluator {
    provider: Arc<dyn ModelProvider>,
    roster: Vec<Box<dyn Judge>>,
}

impl MultiEvaluator {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            roster: judges::default_roster(),
        }
    }

    /// Replace the roster. Used by tests to install canned judges.
    pub fn with_roster(mut self, roster: Vec<Box<dyn Judge>>) -> Self {
        self.roster = roster;
        self
    }

    pub fn judge_names(&self) -> Vec<&'static str> {
        self.roster.iter().map(|j| j.name()).collect()
    }

    /// Evaluate the current renders with every judge, in roster order.
    ///
    /// A judge whose response cannot be parsed is substituted with the
    /// deterministic NOT_PASS/score-0 default rather than failing the
    /// whole evaluation. A judge whose *call* fails (provider error)
    /// propagates: there is nothing to substitute for a missing look at
    /// the screenshots.
    pub async fn evaluate(
        &self,
        session: &mut SessionContext,
        screenshots: &[PathBuf],
        ctx: &EvalContext,
    ) -> Result<BTreeMap<String, EvaluationResult>, SceneForgeError> {
        let mut results = BTreeMap::new();

        for judge in &self.roster {
            let prompt = judge.get_prompt(ctx);
            let response = judge
                .analyze(self.provider.as_ref(), session.messages(), &prompt, screenshots)
                .await?;
            session.record_exchange(prompt, response.clone());

            let result = parse_judge_response(judge.name(), &response);
            tracing::debug!(
                judge = judge.name(),
                status = %result.status,
                score = result.score,
                "Judge verdict"
            );
            results.insert(judge.name().to_string(), result);
        }

        Ok(results)
    }
}

/// Parse one judge's free-text response into an `EvaluationResult`.
/// Total: any shortfall yields the deterministic parse-failure default.
pub fn parse_judge_response(judge: &str, response: &str) -> EvaluationResult {
    let Ok(value) = sanitizer::extract_json(response) else {
        tracing::warn!(judge, "Judge response had no parseable JSON, substituting default");
        return EvaluationResult::parse_failure(judge);
    };

    let Some(status) = value["status"].as_str().and_then(Status::parse) else {
        tracing::warn!(judge, "Judge response missing a usable status, substituting default");
        return EvaluationResult::parse_failure(judge);
    };

    let score = value["score"].as_f64().unwrap_or(0.0).clamp(0.0, 10.0) as f32;
    let analysis = value["analysis"].as_str().unwrap_or_default().to_string();
    let suggestions = value["suggestions"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|s| s.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    EvaluationResult {
        analysis,
        status,
        score,
        suggestions,
    }
}

/// Pure aggregation over judge verdicts.
///
/// - `final_status`: NOT_PASS if any judge said NOT_PASS; else GOOD only
///   if all said GOOD; else PASS.
/// - `average_score`: unweighted mean, computed fresh every call.
/// - `unique_suggestions`: set-deduplicated union, first-seen order.
/// - `combined_analysis`: plain concatenation, no summarization.
pub fn aggregate(results: &BTreeMap<String, EvaluationResult>) -> AggregateResult {
    let n = results.len();

    let final_status = if results.values().any(|r| r.status == Status::NotPass) {
        Status::NotPass
    } else if n > 0 && results.values().all(|r| r.status == Status::Good) {
        Status::Good
    } else {
        Status::Pass
    };

    let average_score = if n == 0 {
        0.0
    } else {
        results.values().map(|r| r.score).sum::<f32>() / n as f32
    };

    let mut seen = std::collections::HashSet::new();
    let mut unique_suggestions = Vec::new();
    for r in results.values() {
        for s in &r.suggestions {
            if seen.insert(s.clone()) {
                unique_suggestions.push(s.clone());
            }
        }
    }

    let combined_analysis = results
        .iter()
        .map(|(name, r)| format!("[{name}] {}", r.analysis))
        .collect::<Vec<_>>()
        .join("\n");

    AggregateResult {
        combined_analysis,
        final_status,
        average_score,
        unique_suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: Status, score: f32, suggestions: &[&str]) -> EvaluationResult {
        EvaluationResult {
            analysis: format!("analysis at {score}"),
            status,
            score,
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn results(list: &[(&str, EvaluationResult)]) -> BTreeMap<String, EvaluationResult> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // ─── aggregate: status rules ────────────────────────────────

    #[test]
    fn test_any_not_pass_wins() {
        let r = results(&[
            ("a", result(Status::Pass, 6.0, &[])),
            ("b", result(Status::Pass, 7.0, &[])),
            ("c", result(Status::NotPass, 3.0, &[])),
        ]);
        let agg = aggregate(&r);
        assert_eq!(agg.final_status, Status::NotPass);
        assert!((agg.average_score - 16.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_all_good_is_good() {
        let r = results(&[
            ("a", result(Status::Good, 8.0, &[])),
            ("b", result(Status::Good, 9.0, &[])),
            ("c", result(Status::Good, 8.5, &[])),
        ]);
        let agg = aggregate(&r);
        assert_eq!(agg.final_status, Status::Good);
        assert!((agg.average_score - 8.5).abs() < 1e-5);
    }

    #[test]
    fn test_mixed_good_pass_is_pass() {
        let r = results(&[
            ("a", result(Status::Good, 8.0, &[])),
            ("b", result(Status::Pass, 6.0, &[])),
        ]);
        assert_eq!(aggregate(&r).final_status, Status::Pass);
    }

    #[test]
    fn test_good_with_not_pass_is_not_pass() {
        let r = results(&[
            ("a", result(Status::Good, 9.0, &[])),
            ("b", result(Status::NotPass, 2.0, &[])),
        ]);
        assert_eq!(aggregate(&r).final_status, Status::NotPass);
    }

    #[test]
    fn test_empty_results() {
        let agg = aggregate(&BTreeMap::new());
        assert_eq!(agg.final_status, Status::Pass);
        assert_eq!(agg.average_score, 0.0);
        assert!(agg.unique_suggestions.is_empty());
    }

    // ─── aggregate: suggestions and analysis ────────────────────

    #[test]
    fn test_suggestions_deduplicated_across_judges() {
        let r = results(&[
            ("a", result(Status::Pass, 6.0, &["thicken the legs", "add a backrest"])),
            ("b", result(Status::Pass, 6.0, &["thicken the legs", "center the seat"])),
        ]);
        let agg = aggregate(&r);
        assert_eq!(agg.unique_suggestions.len(), 3);
        assert_eq!(
            agg.unique_suggestions
                .iter()
                .filter(|s| s.as_str() == "thicken the legs")
                .count(),
            1
        );
    }

    #[test]
    fn test_combined_analysis_concatenates_all() {
        let r = results(&[
            ("a", result(Status::Pass, 5.0, &[])),
            ("b", result(Status::Pass, 7.0, &[])),
        ]);
        let agg = aggregate(&r);
        assert!(agg.combined_analysis.contains("[a]"));
        assert!(agg.combined_analysis.contains("[b]"));
        assert!(agg.combined_analysis.contains("analysis at 5"));
    }

    // ─── parse_judge_response ───────────────────────────────────

    #[test]
    fn test_parse_valid_verdict() {
        let r = parse_judge_response(
            "structure",
            r#"Here is my verdict: {"analysis": "solid", "status": "GOOD", "score": 8.5, "suggestions": []}"#,
        );
        assert_eq!(r.status, Status::Good);
        assert!((r.score - 8.5).abs() < 1e-6);
        assert_eq!(r.analysis, "solid");
    }

    #[test]
    fn test_parse_garbage_falls_back_to_not_pass() {
        let r = parse_judge_response("proportion", "I cannot evaluate this.");
        assert_eq!(r.status, Status::NotPass);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.suggestions.len(), 1);
    }

    #[test]
    fn test_parse_missing_status_falls_back() {
        let r = parse_judge_response("fidelity", r#"{"score": 9.0}"#);
        assert_eq!(r.status, Status::NotPass);
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn test_parse_clamps_score_range() {
        let r = parse_judge_response(
            "structure",
            r#"{"analysis": "", "status": "PASS", "score": 14.0, "suggestions": []}"#,
        );
        assert_eq!(r.score, 10.0);
        let r = parse_judge_response(
            "structure",
            r#"{"analysis": "", "status": "PASS", "score": -2.0, "suggestions": []}"#,
        );
        assert_eq!(r.score, 0.0);
    }

    // ─── evaluate: roster and session ───────────────────────────

    struct DeadProvider;

    #[async_trait::async_trait]
    impl crate::provider::ModelProvider for DeadProvider {
        fn id(&self) -> &str {
            "dead"
        }

        async fn generate(
            &self,
            _history: &[crate::provider::Message],
            _prompt: &str,
        ) -> Result<String, SceneForgeError> {
            panic!("canned judges never reach the provider")
        }

        async fn generate_with_images(
            &self,
            _history: &[crate::provider::Message],
            _prompt: &str,
            _images: &[PathBuf],
        ) -> Result<String, SceneForgeError> {
            panic!("canned judges never reach the provider")
        }
    }

    struct CannedJudge {
        name: &'static str,
        response: &'static str,
    }

    #[async_trait::async_trait]
    impl Judge for CannedJudge {
        fn name(&self) -> &'static str {
            self.name
        }

        fn get_prompt(&self, _ctx: &EvalContext) -> String {
            format!("prompt from {}", self.name)
        }

        async fn analyze(
            &self,
            _provider: &dyn crate::provider::ModelProvider,
            _history: &[crate::provider::Message],
            _prompt: &str,
            _images: &[PathBuf],
        ) -> Result<String, SceneForgeError> {
            Ok(self.response.to_string())
        }
    }

    fn eval_ctx() -> EvalContext {
        EvalContext {
            object_type: "chair".into(),
            description: "a wooden chair".into(),
            scene_context: "a study".into(),
            components: vec![],
        }
    }

    #[tokio::test]
    async fn test_evaluate_records_one_exchange_per_judge() {
        let evaluator = MultiEvaluator::new(Arc::new(DeadProvider)).with_roster(vec![
            Box::new(CannedJudge {
                name: "alpha",
                response: r#"{"analysis": "fine", "status": "GOOD", "score": 8.0, "suggestions": []}"#,
            }),
            Box::new(CannedJudge {
                name: "beta",
                response: "no verdict at all",
            }),
        ]);
        assert_eq!(evaluator.judge_names(), vec!["alpha", "beta"]);

        let mut session = SessionContext::new();
        let results = evaluator
            .evaluate(&mut session, &[], &eval_ctx())
            .await
            .unwrap();

        // One user+assistant pair per judge.
        assert_eq!(session.messages().len(), 4);
        assert_eq!(results["alpha"].status, Status::Good);
        // Unparseable judge substituted, not fatal.
        assert_eq!(results["beta"].status, Status::NotPass);
        assert_eq!(results["beta"].score, 0.0);
    }

    #[test]
    fn test_parse_lenient_status_spelling() {
        let r = parse_judge_response(
            "structure",
            r#"{"analysis": "", "status": "not pass", "score": 2.0, "suggestions": []}"#,
        );
        assert_eq!(r.status, Status::NotPass);
        assert!((r.score - 2.0).abs() < 1e-6);
    }
}
