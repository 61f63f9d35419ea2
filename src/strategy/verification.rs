//! Verification strategy types.
//!
//! A strategy tree is declared in a feature's frontmatter and deserialized into
//! [`VerificationStrategy`]. The `type` field selects the variant; everything
//! else is variant-specific and written in camelCase.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::check::FileCheck;

/// Tag identifying a strategy type. Used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Unit/integration test suite.
    Test,
    /// End-to-end test suite.
    E2e,
    /// Project script.
    Script,
    /// Arbitrary shell command.
    Command,
    /// Filesystem checks.
    File,
    /// HTTP request with response assertions.
    Http,
    /// Human confirmation.
    Manual,
    /// Agent-judged acceptance criteria.
    Ai,
    /// Boolean combination of nested strategies.
    Composite,
}

impl StrategyKind {
    /// Every strategy kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Test,
        Self::E2e,
        Self::Script,
        Self::Command,
        Self::File,
        Self::Http,
        Self::Manual,
        Self::Ai,
        Self::Composite,
    ];

    /// The `type` tag as written in strategy documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::E2e => "e2e",
            Self::Script => "script",
            Self::Command => "command",
            Self::File => "file",
            Self::Http => "http",
            Self::Manual => "manual",
            Self::Ai => "ai",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that may be written either as a scalar or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single accepted value.
    One(T),
    /// A set of accepted values.
    Many(Vec<T>),
}

impl<T: PartialEq + Clone> OneOrMany<T> {
    /// Returns `true` if `value` is one of the accepted values.
    pub fn contains(&self, value: &T) -> bool {
        match self {
            Self::One(expected) => expected == value,
            Self::Many(expected) => expected.contains(value),
        }
    }

    /// All accepted values as a list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::One(expected) => vec![expected.clone()],
            Self::Many(expected) => expected.clone(),
        }
    }
}

/// Subprocess options shared by `test`, `e2e`, `script` and `command`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Working directory relative to the project root.
    #[serde(default)]
    pub cwd: Option<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Wall-clock timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Expectations evaluated against a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputExpectations {
    /// Accepted exit code(s). Defaults to `0`.
    #[serde(default)]
    pub expected_exit_code: Option<OneOrMany<i32>>,
    /// Regex that stdout must match.
    #[serde(default, alias = "outputPattern")]
    pub stdout_pattern: Option<String>,
    /// Regex that stderr must match.
    #[serde(default)]
    pub stderr_pattern: Option<String>,
    /// Regexes that must not match stdout or stderr.
    #[serde(default)]
    pub not_patterns: Vec<String>,
}

/// Configuration for `test` and `e2e` strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// Explicit command; overrides the detected test command.
    #[serde(default)]
    pub command: Option<String>,
    /// File filter passed to the framework.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Test names to select.
    #[serde(default)]
    pub cases: Vec<String>,
    /// Extra arguments appended to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Subprocess options.
    #[serde(flatten)]
    pub process: ProcessOptions,
    /// Exit code and output expectations.
    #[serde(flatten)]
    pub expect: OutputExpectations,
}

/// Configuration for `script` strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// Explicit command line; takes precedence over `path`.
    #[serde(default)]
    pub command: Option<String>,
    /// Script path relative to the project root.
    #[serde(default)]
    pub path: Option<String>,
    /// Arguments passed to the script.
    #[serde(default)]
    pub args: Vec<String>,
    /// Subprocess options.
    #[serde(flatten)]
    pub process: ProcessOptions,
    /// Exit code and output expectations.
    #[serde(flatten)]
    pub expect: OutputExpectations,
}

/// Configuration for `command` strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// Shell command line.
    #[serde(default)]
    pub command: String,
    /// Arguments appended to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Subprocess options.
    #[serde(flatten)]
    pub process: ProcessOptions,
    /// Exit code and output expectations.
    #[serde(flatten)]
    pub expect: OutputExpectations,
}

/// Configuration for `file` strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// Single glob relative to the project root.
    #[serde(default)]
    pub path: Option<String>,
    /// Additional globs relative to the project root.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Checks applied to every matched file. Empty means `["exists"]`.
    #[serde(default)]
    pub checks: Vec<FileCheck>,
}

impl FileStrategy {
    /// All configured globs, `path` first.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        self.path.iter().chain(&self.paths).map(String::as_str).collect()
    }
}

/// A JSON-path assertion on an HTTP response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonAssertion {
    /// Dotted path with `[n]` and `[*]` segments.
    pub path: String,
    /// Value the path must deep-equal.
    #[serde(default)]
    pub expected: serde_json::Value,
}

/// Configuration for `http` strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// Target URL; `${VAR}` tokens are substituted from the environment.
    pub url: String,
    /// HTTP method. Defaults to `GET`.
    #[serde(default)]
    pub method: Option<String>,
    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request body. Strings are sent raw, anything else as JSON.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    /// Accepted status code(s). Any 2xx when absent.
    #[serde(default)]
    pub expected_status: Option<OneOrMany<u16>>,
    /// Regex the response body must match.
    #[serde(default)]
    pub expected_body_pattern: Option<String>,
    /// JSON-path assertions on the response body.
    #[serde(default)]
    pub json_assertions: Vec<JsonAssertion>,
    /// Hosts the request may target; exact names or `*.suffix` wildcards.
    #[serde(default)]
    pub allowed_hosts: Option<Vec<String>>,
    /// Request timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Configuration for `manual` strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// What the reviewer should do or confirm.
    #[serde(default)]
    pub instructions: String,
    /// Items the reviewer confirms one by one.
    #[serde(default)]
    pub checklist: Vec<String>,
    /// Who implements the check.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Who signs off.
    #[serde(default)]
    pub reviewer: Option<String>,
}

/// How the AI reviewer inspects the project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    /// The agent explores the project on its own.
    #[default]
    Autonomous,
    /// The agent reviews the working-tree diff.
    Diff,
}

impl AiMode {
    /// Lowercase name as written in strategy documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Autonomous => "autonomous",
            Self::Diff => "diff",
        }
    }
}

/// Configuration for `ai` strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// Review mode.
    #[serde(default)]
    pub mode: AiMode,
    /// Prompt template replacing the built-in one.
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Confidence below which a criterion forces `needs_review`. Defaults to 0.7.
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Model requested from the agent.
    #[serde(default)]
    pub model: Option<String>,
    /// Agent call timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Boolean operator joining composite children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeOperator {
    /// Every child must pass.
    #[default]
    And,
    /// At least one child must pass.
    Or,
}

impl CompositeOperator {
    /// Lowercase name as written in strategy documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Configuration for `composite` strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeStrategy {
    /// Whether the caller treats this strategy as blocking.
    #[serde(default)]
    pub required: bool,
    /// Operator; takes precedence over `logic`.
    #[serde(default)]
    pub operator: Option<CompositeOperator>,
    /// Alias for `operator`.
    #[serde(default)]
    pub logic: Option<CompositeOperator>,
    /// Children, evaluated in order.
    #[serde(default)]
    pub strategies: Vec<VerificationStrategy>,
}

impl CompositeStrategy {
    /// The effective operator: `operator`, then `logic`, then `and`.
    #[must_use]
    pub fn resolved_operator(&self) -> CompositeOperator {
        self.operator.or(self.logic).unwrap_or_default()
    }
}

/// A declarative verification strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerificationStrategy {
    /// Run the project's test suite.
    Test(TestStrategy),
    /// Run the project's end-to-end suite.
    E2e(TestStrategy),
    /// Run a project script.
    Script(ScriptStrategy),
    /// Run a shell command.
    Command(CommandStrategy),
    /// Check files on disk.
    File(FileStrategy),
    /// Issue an HTTP request.
    Http(HttpStrategy),
    /// Ask a human.
    Manual(ManualStrategy),
    /// Ask an AI agent to judge the acceptance criteria.
    Ai(AiStrategy),
    /// Combine nested strategies.
    Composite(CompositeStrategy),
}

impl VerificationStrategy {
    /// The strategy's type tag.
    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Test(_) => StrategyKind::Test,
            Self::E2e(_) => StrategyKind::E2e,
            Self::Script(_) => StrategyKind::Script,
            Self::Command(_) => StrategyKind::Command,
            Self::File(_) => StrategyKind::File,
            Self::Http(_) => StrategyKind::Http,
            Self::Manual(_) => StrategyKind::Manual,
            Self::Ai(_) => StrategyKind::Ai,
            Self::Composite(_) => StrategyKind::Composite,
        }
    }

    /// Whether the caller should treat a failure as blocking.
    #[must_use]
    pub fn is_required(&self) -> bool {
        match self {
            Self::Test(s) | Self::E2e(s) => s.required,
            Self::Script(s) => s.required,
            Self::Command(s) => s.required,
            Self::File(s) => s.required,
            Self::Http(s) => s.required,
            Self::Manual(s) => s.required,
            Self::Ai(s) => s.required,
            Self::Composite(s) => s.required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_composite_tree() {
        let strategy: VerificationStrategy = serde_json::from_value(json!({
            "type": "composite",
            "logic": "or",
            "strategies": [
                {"type": "command", "command": "make check", "expectedExitCode": [0, 2]},
                {"type": "file", "paths": ["src/*.ts"], "checks": [{"containsPattern": "export"}]},
                {"type": "composite", "strategies": []}
            ]
        }))
        .unwrap();

        let VerificationStrategy::Composite(composite) = &strategy else {
            panic!("expected composite, got {strategy:?}");
        };
        assert_eq!(composite.resolved_operator(), CompositeOperator::Or);
        assert_eq!(composite.strategies.len(), 3);
        assert_eq!(composite.strategies[0].kind(), StrategyKind::Command);

        let VerificationStrategy::Command(command) = &composite.strategies[0] else {
            panic!("expected command");
        };
        assert_eq!(command.expect.expected_exit_code, Some(OneOrMany::Many(vec![0, 2])));
    }

    #[test]
    fn operator_takes_precedence_over_logic() {
        let composite = CompositeStrategy {
            operator: Some(CompositeOperator::And),
            logic: Some(CompositeOperator::Or),
            ..CompositeStrategy::default()
        };
        assert_eq!(composite.resolved_operator(), CompositeOperator::And);
        assert_eq!(CompositeStrategy::default().resolved_operator(), CompositeOperator::And);
    }

    #[test]
    fn output_pattern_is_an_alias_for_stdout_pattern() {
        let strategy: VerificationStrategy = serde_json::from_value(json!({
            "type": "test",
            "outputPattern": "ok",
            "timeout": 5000,
            "env": {"NODE_ENV": "test"}
        }))
        .unwrap();

        let VerificationStrategy::Test(test) = strategy else {
            panic!("expected test");
        };
        assert_eq!(test.expect.stdout_pattern.as_deref(), Some("ok"));
        assert_eq!(test.process.timeout, Some(5000));
        assert_eq!(test.process.env.get("NODE_ENV").map(String::as_str), Some("test"));
    }

    #[test]
    fn yaml_round_trip_preserves_tree() {
        let strategy = VerificationStrategy::Composite(CompositeStrategy {
            required: true,
            operator: Some(CompositeOperator::And),
            logic: None,
            strategies: vec![
                VerificationStrategy::Http(HttpStrategy {
                    url: "http://localhost:3000/health".into(),
                    expected_status: Some(OneOrMany::One(200)),
                    ..HttpStrategy::default()
                }),
                VerificationStrategy::Ai(AiStrategy {
                    mode: AiMode::Diff,
                    min_confidence: Some(0.8),
                    ..AiStrategy::default()
                }),
            ],
        });

        let yaml = serde_yaml::to_string(&strategy).unwrap();
        let parsed: VerificationStrategy = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, strategy);
        assert!(parsed.is_required());
    }

    #[test]
    fn one_or_many_membership() {
        assert!(OneOrMany::One(201).contains(&201));
        assert!(!OneOrMany::One(201).contains(&200));
        assert!(OneOrMany::Many(vec![200, 204]).contains(&204));
        assert_eq!(OneOrMany::One(3).to_vec(), vec![3]);
    }

    #[test]
    fn kind_tags_match_serialized_type() {
        for kind in StrategyKind::ALL {
            let tag = serde_json::to_value(kind).unwrap();
            assert_eq!(tag, json!(kind.as_str()));
        }
    }
}
