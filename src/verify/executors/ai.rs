//! `ai` executor: agent-judged acceptance criteria.

use std::sync::{Arc, LazyLock};

use minijinja::{context, Environment};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::tail_excerpt;
use crate::ports::{AgentCaller, AgentOptions};
use crate::strategy::{
    AiMode, AiStrategy, FailureReason, Feature, StrategyResult, VerificationStrategy,
};
use crate::verify::{ExecuteFuture, ExecutionContext, StrategyExecutor};

/// Default timeout for `ai` strategies.
pub const DEFAULT_AI_TIMEOUT_MS: u64 = 300_000;

/// Confidence below which a criterion forces `needs_review`.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

const AUTONOMOUS_TEMPLATE: &str = include_str!("prompts/ai_autonomous.md");
const DIFF_TEMPLATE: &str = include_str!("prompts/ai_diff.md");

static PROMPTS: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("autonomous", AUTONOMOUS_TEMPLATE)
        .expect("autonomous template should be valid");
    env.add_template("diff", DIFF_TEMPLATE).expect("diff template should be valid");
    env
});

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json[ \t]*\r?\n?(.*?)```").expect("fenced json pattern must compile")
});

/// Tri-state outcome of an AI review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every criterion is satisfied.
    Pass,
    /// At least one criterion is not satisfied.
    Fail,
    /// A human should look.
    NeedsReview,
}

impl Verdict {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            "needs_review" => Some(Self::NeedsReview),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::NeedsReview => "needs_review",
        }
    }
}

/// One criterion as judged by the agent. Missing fields take defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CriterionAssessment {
    index: usize,
    satisfied: bool,
    confidence: Option<f64>,
    reasoning: String,
}

/// The JSON object the agent is asked to reply with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Assessment {
    criteria_results: Vec<CriterionAssessment>,
    verdict: Option<String>,
    overall_reasoning: String,
    suggestions: Vec<String>,
}

/// Parses the agent output, falling back to the first fenced JSON block.
fn parse_assessment(raw: &str) -> Result<Assessment, String> {
    let direct = match serde_json::from_str::<Assessment>(raw.trim()) {
        Ok(assessment) => return Ok(assessment),
        Err(e) => e,
    };
    let Some(block) = FENCED_JSON.captures(raw).and_then(|caps| caps.get(1)) else {
        return Err(format!("response is not JSON: {direct}"));
    };
    serde_json::from_str::<Assessment>(block.as_str().trim())
        .map_err(|e| format!("fenced JSON block is malformed: {e}"))
}

#[derive(Serialize)]
struct CriterionContext<'a> {
    index: usize,
    text: &'a str,
}

/// Renders the prompt for `feature`, using `custom` as the template when given.
fn render_prompt(
    feature: &Feature,
    mode: AiMode,
    custom: Option<&str>,
) -> Result<String, minijinja::Error> {
    let criteria: Vec<CriterionContext<'_>> = feature
        .acceptance
        .iter()
        .enumerate()
        .map(|(i, text)| CriterionContext { index: i + 1, text })
        .collect();
    let ctx = context! {
        feature => context! {
            id => feature.id,
            description => feature.description,
            module => feature.module,
            acceptance => feature.acceptance,
        },
        criteria => criteria,
        mode => mode.as_str(),
    };
    match custom {
        Some(template) => PROMPTS.render_str(template, ctx),
        None => PROMPTS.get_template(mode.as_str())?.render(ctx),
    }
}

/// Asks an AI agent whether the feature meets its acceptance criteria.
pub struct AiExecutor {
    agent: Arc<dyn AgentCaller>,
    default_model: Option<String>,
}

impl AiExecutor {
    /// Creates an executor consulting `agent`.
    pub fn new(agent: Arc<dyn AgentCaller>) -> Self {
        Self { agent, default_model: None }
    }

    /// Sets the model requested when a strategy names none.
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    async fn run(&self, ctx: &ExecutionContext<'_>, strategy: &AiStrategy) -> StrategyResult {
        let custom = strategy.custom_prompt.as_deref();
        let prompt = match render_prompt(ctx.feature, strategy.mode, custom) {
            Ok(prompt) => prompt,
            Err(e) => {
                return StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("Failed to render prompt: {e}"),
                );
            }
        };
        let options = AgentOptions {
            model: strategy.model.clone().or_else(|| self.default_model.clone()),
            cwd: ctx.project_root.to_path_buf(),
            timeout_ms: Some(strategy.timeout.unwrap_or(DEFAULT_AI_TIMEOUT_MS)),
        };
        debug!(
            feature = %ctx.feature.id,
            mode = strategy.mode.as_str(),
            model = ?options.model,
            "calling agent"
        );

        let response = match self.agent.call(&prompt, &options).await {
            Ok(response) if response.success => response,
            Ok(response) => {
                let error = response.error.unwrap_or_else(|| "agent reported failure".to_string());
                return StrategyResult::failure(
                    FailureReason::AiCallFailed,
                    format!("AI agent call failed: {error}"),
                )
                .with_detail("error", error)
                .with_detail("agentUsed", response.agent_used);
            }
            Err(e) => {
                return StrategyResult::failure(
                    FailureReason::AiCallFailed,
                    format!("AI agent call failed: {e}"),
                )
                .with_detail("error", e);
            }
        };

        let min_confidence = strategy.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE);
        let base = StrategyResult::fail("")
            .with_detail("mode", strategy.mode.as_str())
            .with_detail("minConfidence", min_confidence)
            .with_detail("agentUsed", response.agent_used.clone());

        let assessment = match parse_assessment(&response.output) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(feature = %ctx.feature.id, error = %e, "unparsable AI response");
                let mut result = base
                    .with_detail("verdict", Verdict::NeedsReview.as_str())
                    .with_detail("parseError", e)
                    .with_detail("rawOutput", tail_excerpt(&response.output));
                result.output = "AI response could not be parsed; needs review".to_string();
                return result;
            }
        };

        let low_confidence: Vec<Value> = assessment
            .criteria_results
            .iter()
            .filter(|c| c.confidence.unwrap_or(0.0) < min_confidence)
            .map(|c| json!({"index": c.index, "confidence": c.confidence}))
            .collect();
        let reported = assessment.verdict.as_deref().and_then(Verdict::parse);
        let verdict = match reported {
            Some(verdict) if low_confidence.is_empty() => verdict,
            _ => Verdict::NeedsReview,
        };

        let satisfied = assessment.criteria_results.iter().filter(|c| c.satisfied).count();
        let judged = assessment.criteria_results.len();
        let mut result = base
            .with_detail("verdict", verdict.as_str())
            .with_detail("reportedVerdict", reported.map(Verdict::as_str))
            .with_detail("criteriaResults", json!(assessment.criteria_results))
            .with_detail("lowConfidenceCriteria", Value::Array(low_confidence))
            .with_detail("overallReasoning", assessment.overall_reasoning.as_str())
            .with_detail("suggestions", json!(assessment.suggestions));
        result.success = verdict == Verdict::Pass;
        result.output = format!(
            "AI verdict: {} ({satisfied}/{judged} criteria satisfied)",
            verdict.as_str()
        );
        result
    }
}

impl StrategyExecutor for AiExecutor {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext<'a>,
        strategy: &'a VerificationStrategy,
    ) -> ExecuteFuture<'a> {
        Box::pin(async move {
            match strategy {
                VerificationStrategy::Ai(ai) => self.run(ctx, ai).await,
                other => StrategyResult::failure(
                    FailureReason::InvalidConfig,
                    format!("ai executor cannot run a '{}' strategy", other.kind()),
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::ports::{AgentFuture, AgentResponse};
    use crate::verify::StrategyRegistry;

    struct Canned {
        reply: Result<AgentResponse, String>,
        prompts: Mutex<Vec<(String, AgentOptions)>>,
    }

    impl Canned {
        fn answering(output: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(AgentResponse {
                    success: true,
                    output: output.into(),
                    agent_used: Some("stub".into()),
                    error: None,
                }),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl AgentCaller for Canned {
        fn call(&self, prompt: &str, options: &AgentOptions) -> AgentFuture<'_> {
            self.prompts.lock().unwrap().push((prompt.to_string(), options.clone()));
            let reply = self.reply.clone();
            Box::pin(async move { reply })
        }
    }

    fn feature() -> Feature {
        Feature::new("auth.login", "Users can log in")
            .with_acceptance(["Shows a login form", "Rejects bad passwords"])
    }

    async fn run(agent: Arc<Canned>, strategy: AiStrategy) -> StrategyResult {
        let registry = StrategyRegistry::new();
        let feature = feature();
        let ctx = ExecutionContext {
            registry: &registry,
            project_root: Path::new("/project"),
            feature: &feature,
        };
        AiExecutor::new(agent).execute(&ctx, &VerificationStrategy::Ai(strategy)).await
    }

    const CONFIDENT_PASS: &str = r#"{
        "criteriaResults": [
            {"index": 1, "satisfied": true, "confidence": 0.95, "reasoning": "form exists"},
            {"index": 2, "satisfied": true, "confidence": 0.9, "reasoning": "tested"}
        ],
        "verdict": "pass",
        "overallReasoning": "done"
    }"#;

    #[tokio::test]
    async fn confident_pass_succeeds() {
        let agent = Canned::answering(CONFIDENT_PASS);
        let result = run(agent.clone(), AiStrategy::default()).await;
        assert!(result.success, "{}", result.output);
        assert_eq!(result.detail("verdict"), Some(&json!("pass")));

        let (prompt, options) = agent.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("1. Shows a login form"));
        assert!(prompt.contains("2. Rejects bad passwords"));
        assert_eq!(options.timeout_ms, Some(DEFAULT_AI_TIMEOUT_MS));
        assert_eq!(options.cwd, Path::new("/project"));
    }

    #[tokio::test]
    async fn low_confidence_forces_review() {
        let output = CONFIDENT_PASS.replace("0.9,", "0.5,");
        let result = run(Canned::answering(&output), AiStrategy::default()).await;
        assert!(!result.success);
        assert_eq!(result.detail("verdict"), Some(&json!("needs_review")));
        assert_eq!(result.detail("reportedVerdict"), Some(&json!("pass")));
        assert_eq!(
            result.detail("lowConfidenceCriteria"),
            Some(&json!([{"index": 2, "confidence": 0.5}]))
        );

        let strict = AiStrategy { min_confidence: Some(0.4), ..AiStrategy::default() };
        assert!(run(Canned::answering(&output), strict).await.success);
    }

    #[tokio::test]
    async fn fenced_json_is_extracted() {
        let output = format!("Here is my review:\n```json\n{CONFIDENT_PASS}\n```\nThanks.");
        assert!(run(Canned::answering(&output), AiStrategy::default()).await.success);
    }

    #[tokio::test]
    async fn malformed_output_needs_review() {
        let result = run(Canned::answering("I think it works."), AiStrategy::default()).await;
        assert!(!result.success);
        assert_eq!(result.detail("verdict"), Some(&json!("needs_review")));
        assert!(result.detail("parseError").is_some());
        assert_eq!(result.reason(), None);
    }

    #[tokio::test]
    async fn agent_failures_are_reported() {
        let agent = Arc::new(Canned {
            reply: Err("connection reset".into()),
            prompts: Mutex::new(Vec::new()),
        });
        assert_eq!(run(agent, AiStrategy::default()).await.reason(), Some("ai-call-failed"));

        let agent = Arc::new(Canned {
            reply: Ok(AgentResponse {
                success: false,
                error: Some("rate limited".into()),
                ..AgentResponse::default()
            }),
            prompts: Mutex::new(Vec::new()),
        });
        let result = run(agent, AiStrategy::default()).await;
        assert_eq!(result.reason(), Some("ai-call-failed"));
        assert_eq!(result.detail("error"), Some(&json!("rate limited")));
    }

    #[tokio::test]
    async fn custom_prompt_and_diff_mode() {
        let agent = Canned::answering(CONFIDENT_PASS);
        let strategy = AiStrategy {
            custom_prompt: Some(
                "Check {{ feature.id }} ({{ criteria | length }} criteria, {{ mode }})".into(),
            ),
            mode: AiMode::Diff,
            model: Some("small".into()),
            ..AiStrategy::default()
        };
        run(agent.clone(), strategy).await;
        let (prompt, options) = agent.prompts.lock().unwrap()[0].clone();
        assert_eq!(prompt, "Check auth.login (2 criteria, diff)");
        assert_eq!(options.model.as_deref(), Some("small"));

        let diff = render_prompt(&feature(), AiMode::Diff, None).unwrap();
        assert!(diff.contains("git diff"));
    }

    #[tokio::test]
    async fn broken_custom_template_is_invalid_config() {
        let strategy = AiStrategy {
            custom_prompt: Some("{% for %}".into()),
            ..AiStrategy::default()
        };
        let agent = Canned::answering(CONFIDENT_PASS);
        let result = run(agent.clone(), strategy).await;
        assert_eq!(result.reason(), Some("invalid-config"));
        assert!(agent.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_confidence_counts_as_low() {
        let raw = r#"{"criteriaResults":[{"index":1,"satisfied":true}],"verdict":"pass"}"#;
        let assessment = parse_assessment(raw).unwrap();
        assert_eq!(assessment.criteria_results[0].confidence, None);
    }
}
