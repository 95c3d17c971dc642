//! Inference Stage — the shared contract of the four pipeline stages.
//!
//! A stage reads the `AgentContext`, makes one backend call, and returns an
//! `AgentResult`. Stages hold only immutable settings and an injected backend, so
//! one instance serves every concurrent candidate.
//!
//! Errors stop at the stage boundary: `run_stage` applies the timeout and turns any
//! `StageError` into `AgentResult { success: false, confidence: 0.0 }`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::checklist::TemplateError;
use crate::llm_client::prompts::CONFIDENCE_INSTRUCTION;
use crate::llm_client::{CompletionOptions, LlmError};
use crate::pipeline::context::AgentContext;

/// Default resume character budget sent to the backend.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Extraction,
    Analysis,
    Scoring,
    Recommendation,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Extraction,
        StageKind::Analysis,
        StageKind::Scoring,
        StageKind::Recommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Extraction => "extraction",
            StageKind::Analysis => "analysis",
            StageKind::Scoring => "scoring",
            StageKind::Recommendation => "recommendation",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one stage invocation. Built through the constructors, which clamp
/// confidence into [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    pub data: Value,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

impl AgentResult {
    pub fn success(data: Value, confidence: f64) -> Self {
        Self {
            success: true,
            data,
            confidence: clamp_confidence(confidence),
            reasoning: None,
            next_actions: Vec::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: json!({ "error": error }),
            confidence: 0.0,
            reasoning: Some(error),
            next_actions: Vec::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_next_actions(mut self, next_actions: Vec<String>) -> Self {
        self.next_actions = next_actions;
        self
    }
}

/// Maps NaN to 0 and clamps into [0, 1].
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("inference backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("malformed {stage} output: {source}")]
    Malformed {
        stage: StageKind,
        source: serde_json::Error,
    },

    #[error("checklist template rejected: {0}")]
    Template(#[from] TemplateError),

    #[error("{stage} timed out after {}s", .timeout.as_secs())]
    Timeout { stage: StageKind, timeout: Duration },
}

/// Immutable per-stage configuration passed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSettings {
    pub options: CompletionOptions,
    pub max_input_chars: usize,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            options: CompletionOptions::default(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

/// One pipeline unit. Implementations must not mutate themselves between calls.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, StageError>;
}

/// Runs a stage under a timeout and converts every failure into data.
pub async fn run_stage(stage: &dyn Stage, ctx: &AgentContext, timeout: Duration) -> AgentResult {
    let kind = stage.kind();
    match tokio::time::timeout(timeout, stage.execute(ctx)).await {
        Ok(Ok(result)) => {
            debug!(
                "Stage {} finished: success={}, confidence={:.2}",
                kind, result.success, result.confidence
            );
            result
        }
        Ok(Err(e)) => {
            warn!("Stage {} failed: {}", kind, e);
            AgentResult::failure(e.to_string())
        }
        Err(_) => {
            let e = StageError::Timeout {
                stage: kind,
                timeout,
            };
            warn!("{}", e);
            AgentResult::failure(e.to_string())
        }
    }
}

/// Deserializes a backend value into a stage's typed output.
pub(crate) fn parse_output<T: DeserializeOwned>(
    stage: StageKind,
    value: Value,
) -> Result<T, StageError> {
    serde_json::from_value(value).map_err(|source| StageError::Malformed { stage, source })
}

/// Fills a prompt template. `{confidence_instruction}` is always available.
pub(crate) fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut prompt = template.replace("{confidence_instruction}", CONFIDENCE_INSTRUCTION);
    for (key, value) in values {
        prompt = prompt.replace(&format!("{{{key}}}"), value);
    }
    prompt
}

/// Pretty JSON for prompts; `null` when a prior stage left nothing behind.
pub(crate) fn prompt_json(value: Option<&Value>) -> String {
    value
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_else(|| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{FakeBackend, Scripted};
    use crate::pipeline::analysis::AnalysisStage;
    use std::sync::Arc;

    #[test]
    fn test_success_clamps_confidence() {
        assert_eq!(AgentResult::success(json!({}), 1.7).confidence, 1.0);
        assert_eq!(AgentResult::success(json!({}), -0.3).confidence, 0.0);
        assert_eq!(AgentResult::success(json!({}), f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_failure_carries_error_as_data() {
        let result = AgentResult::failure("backend down");
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.data["error"], "backend down");
        assert_eq!(result.reasoning.as_deref(), Some("backend down"));
    }

    #[test]
    fn test_stage_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_value(StageKind::Recommendation).unwrap(), "recommendation");
        assert_eq!(StageKind::Scoring.to_string(), "scoring");
    }

    #[test]
    fn test_fill_template_replaces_placeholders() {
        let prompt = fill_template("A={a} B={b} C={confidence_instruction}", &[("a", "1"), ("b", "2")]);
        assert!(prompt.starts_with("A=1 B=2 C="));
        assert!(prompt.contains("0.0 and 1.0"));
    }

    #[tokio::test]
    async fn test_run_stage_converts_backend_error() {
        let backend = Arc::new(
            FakeBackend::new().with(StageKind::Analysis, Scripted::Fail("503".to_string())),
        );
        let stage = AnalysisStage::new(backend, StageSettings::default());
        let ctx = AgentContext::new("resume", "jd", None);
        let result = run_stage(&stage, &ctx, Duration::from_secs(5)).await;
        assert!(!result.success);
        assert!(result.reasoning.unwrap().contains("inference backend failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stage_times_out() {
        let backend = Arc::new(FakeBackend::new().with(StageKind::Analysis, Scripted::Hang));
        let stage = AnalysisStage::new(backend, StageSettings::default());
        let ctx = AgentContext::new("resume", "jd", None);
        let result = run_stage(&stage, &ctx, Duration::from_secs(2)).await;
        assert!(!result.success);
        assert!(result.reasoning.unwrap().contains("timed out after 2s"));
    }
}
