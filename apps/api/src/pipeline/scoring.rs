//! Scoring stage — five-dimension breakdown plus the deterministic checklist.
//!
//! Algorithm:
//! 1. If the context carries a template, run the checklist scorer on the candidate
//!    evidence (a template that fails validation fails the stage)
//! 2. One backend call for the per-dimension scores
//! 3. Clamp each dimension to [0, 100]; overall = Σ dimension × SCORE_WEIGHTS
//!
//! The model never supplies `overall_score`; it is always recomputed here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::checklist::scorer::{self, ChecklistScore};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::InferenceBackend;
use crate::pipeline::context::AgentContext;
use crate::pipeline::prompts::{SCORING_PROMPT_TEMPLATE, SCORING_ROLE};
use crate::pipeline::stage::{
    fill_template, parse_output, prompt_json, AgentResult, Stage, StageError, StageKind,
    StageSettings,
};

/// Weights of skill, experience, education, cultural fit, and additional value.
pub const SCORE_WEIGHTS: [f64; 5] = [0.40, 0.25, 0.15, 0.10, 0.10];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBreakdown {
    pub skill: f64,
    pub experience: f64,
    pub education: f64,
    pub cultural_fit: f64,
    pub additional_value: f64,
}

impl ScoreBreakdown {
    fn dimensions(&self) -> [f64; 5] {
        [
            self.skill,
            self.experience,
            self.education,
            self.cultural_fit,
            self.additional_value,
        ]
    }

    /// Every dimension clamped to [0, 100]; NaN becomes 0.
    pub fn clamped(self) -> Self {
        let c = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
        Self {
            skill: c(self.skill),
            experience: c(self.experience),
            education: c(self.education),
            cultural_fit: c(self.cultural_fit),
            additional_value: c(self.additional_value),
        }
    }

    /// Weighted overall score in [0, 100].
    pub fn overall(&self) -> f64 {
        let total: f64 = self
            .clamped()
            .dimensions()
            .iter()
            .zip(SCORE_WEIGHTS)
            .map(|(score, weight)| score * weight)
            .sum();
        total.clamp(0.0, 100.0)
    }
}

/// What the model returns.
#[derive(Debug, Clone, Deserialize)]
struct ModelScoring {
    score_breakdown: ScoreBreakdown,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    confidence: f64,
}

/// What the stage commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutput {
    pub overall_score: f64,
    pub score_breakdown: ScoreBreakdown,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub checklist: Option<ChecklistScore>,
    #[serde(default)]
    pub confidence: f64,
}

pub struct ScoringStage {
    backend: Arc<dyn InferenceBackend>,
    settings: StageSettings,
    system: String,
}

impl ScoringStage {
    pub fn new(backend: Arc<dyn InferenceBackend>, settings: StageSettings) -> Self {
        Self {
            backend,
            settings,
            system: system_prompt(SCORING_ROLE),
        }
    }
}

#[async_trait]
impl Stage for ScoringStage {
    fn kind(&self) -> StageKind {
        StageKind::Scoring
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, StageError> {
        let checklist = match &ctx.template {
            Some(template) => Some(scorer::score(&ctx.candidate_evidence(), template)?),
            None => None,
        };

        let weights_json = ctx
            .template
            .as_ref()
            .and_then(|t| serde_json::to_string_pretty(&t.weights).ok())
            .unwrap_or_else(|| "null".to_string());
        let checklist_summary = checklist
            .as_ref()
            .map(summarize_checklist)
            .unwrap_or_else(|| "(no checklist for this role)".to_string());

        let prompt = fill_template(
            SCORING_PROMPT_TEMPLATE,
            &[
                ("extraction_json", &prompt_json(ctx.previous(StageKind::Extraction))),
                ("analysis_json", &prompt_json(ctx.previous(StageKind::Analysis))),
                ("weights_json", &weights_json),
                ("checklist_summary", &checklist_summary),
            ],
        );
        let raw = self
            .backend
            .complete(&self.system, &prompt, &self.settings.options)
            .await?;
        let model: ModelScoring = parse_output(StageKind::Scoring, raw)?;

        let breakdown = model.score_breakdown.clamped();
        let output = ScoringOutput {
            overall_score: breakdown.overall(),
            score_breakdown: breakdown,
            rationale: model.rationale,
            checklist,
            confidence: model.confidence,
        };

        info!(
            "Scoring: overall {:.1}, checklist {}",
            output.overall_score,
            output
                .checklist
                .as_ref()
                .map(|c| format!("{:.1}", c.overall))
                .unwrap_or_else(|| "n/a".to_string())
        );

        let data = serde_json::to_value(&output).map_err(|source| StageError::Malformed {
            stage: StageKind::Scoring,
            source,
        })?;
        let mut result = AgentResult::success(data, output.confidence);
        if let Some(rationale) = output.rationale {
            result = result.with_reasoning(rationale);
        }
        Ok(result)
    }
}

fn summarize_checklist(checklist: &ChecklistScore) -> String {
    let mut lines = vec![format!("overall: {:.1}/100", checklist.overall)];
    for item in &checklist.items {
        lines.push(format!(
            "- {} ({}): {} coverage {:.2}; matched [{}]; missing [{}]",
            item.id,
            if item.must { "must" } else { "optional" },
            if item.passed { "PASSED" } else { "FAILED" },
            item.coverage,
            item.matched_tags.join(", "),
            item.missing_tags.join(", ")
        ));
    }
    lines.join("\n")
}
