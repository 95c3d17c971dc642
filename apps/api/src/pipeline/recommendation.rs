//! Recommendation stage — interview plan and next steps for candidates that cleared
//! the score threshold. Below the threshold the orchestrator commits
//! `RecommendationOutput::below_threshold` instead of calling this stage.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::llm_client::prompts::system_prompt;
use crate::llm_client::InferenceBackend;
use crate::pipeline::analysis::RecommendationTier;
use crate::pipeline::context::AgentContext;
use crate::pipeline::prompts::{RECOMMENDATION_PROMPT_TEMPLATE, RECOMMENDATION_ROLE};
use crate::pipeline::stage::{
    fill_template, parse_output, prompt_json, AgentResult, Stage, StageError, StageKind,
    StageSettings,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationOutput {
    pub recommendation: RecommendationTier,
    pub interview_questions: Vec<String>,
    pub next_steps: Vec<String>,
    pub hiring_manager_note: Option<String>,
    pub confidence: f64,
}

impl RecommendationOutput {
    /// Default outcome for a candidate whose overall score missed the threshold.
    pub fn below_threshold(overall_score: f64, threshold: f64) -> Self {
        Self {
            recommendation: RecommendationTier::NotRecommended,
            interview_questions: Vec::new(),
            next_steps: vec![
                "Send a polite rejection".to_string(),
                "Keep the resume on file for future openings".to_string(),
            ],
            hiring_manager_note: Some(format!(
                "Overall score {overall_score:.1} is below the interview threshold of {threshold:.0}."
            )),
            confidence: 0.0,
        }
    }
}

pub struct RecommendationStage {
    backend: Arc<dyn InferenceBackend>,
    settings: StageSettings,
    system: String,
}

impl RecommendationStage {
    pub fn new(backend: Arc<dyn InferenceBackend>, settings: StageSettings) -> Self {
        Self {
            backend,
            settings,
            system: system_prompt(RECOMMENDATION_ROLE),
        }
    }
}

#[async_trait]
impl Stage for RecommendationStage {
    fn kind(&self) -> StageKind {
        StageKind::Recommendation
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, StageError> {
        let prompt = fill_template(
            RECOMMENDATION_PROMPT_TEMPLATE,
            &[
                ("extraction_json", &prompt_json(ctx.previous(StageKind::Extraction))),
                ("analysis_json", &prompt_json(ctx.previous(StageKind::Analysis))),
                ("scoring_json", &prompt_json(ctx.previous(StageKind::Scoring))),
                ("jd_text", &ctx.jd_requirements),
            ],
        );
        let raw = self
            .backend
            .complete(&self.system, &prompt, &self.settings.options)
            .await?;
        let output: RecommendationOutput = parse_output(StageKind::Recommendation, raw)?;

        info!(
            "Recommendation '{}' with {} interview questions",
            output.recommendation,
            output.interview_questions.len()
        );

        let data = serde_json::to_value(&output).map_err(|source| StageError::Malformed {
            stage: StageKind::Recommendation,
            source,
        })?;
        let next_actions = output.next_steps.clone();
        let mut result = AgentResult::success(data, output.confidence).with_next_actions(next_actions);
        if let Some(note) = output.hiring_manager_note {
            result = result.with_reasoning(note);
        }
        Ok(result)
    }
}
