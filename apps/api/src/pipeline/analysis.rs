//! Analysis stage — compares extracted facts with the JD and checklist.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::llm_client::prompts::system_prompt;
use crate::llm_client::InferenceBackend;
use crate::pipeline::context::AgentContext;
use crate::pipeline::prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_ROLE};
use crate::pipeline::stage::{
    fill_template, parse_output, prompt_json, AgentResult, Stage, StageError, StageKind,
    StageSettings,
};

/// Hiring recommendation tiers, strongest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum RecommendationTier {
    #[serde(rename = "strongly recommended")]
    StronglyRecommended,
    #[serde(rename = "recommended")]
    Recommended,
    #[default]
    #[serde(rename = "consider")]
    Consider,
    #[serde(rename = "not recommended")]
    NotRecommended,
}

impl RecommendationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationTier::StronglyRecommended => "strongly recommended",
            RecommendationTier::Recommended => "recommended",
            RecommendationTier::Consider => "consider",
            RecommendationTier::NotRecommended => "not recommended",
        }
    }
}

impl fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the tier names in any case, with `_` or `-` in place of spaces.
impl TryFrom<String> for RecommendationTier {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "strongly recommended" => Ok(RecommendationTier::StronglyRecommended),
            "recommended" => Ok(RecommendationTier::Recommended),
            "consider" => Ok(RecommendationTier::Consider),
            "not recommended" => Ok(RecommendationTier::NotRecommended),
            _ => Err(format!("unknown recommendation tier '{raw}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOutput {
    pub matched_skills: Vec<String>,
    pub inferred_skills: Vec<String>,
    pub additional_skills: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendation: RecommendationTier,
    pub summary: Option<String>,
    pub confidence: f64,
}

pub struct AnalysisStage {
    backend: Arc<dyn InferenceBackend>,
    settings: StageSettings,
    system: String,
}

impl AnalysisStage {
    pub fn new(backend: Arc<dyn InferenceBackend>, settings: StageSettings) -> Self {
        Self {
            backend,
            settings,
            system: system_prompt(ANALYSIS_ROLE),
        }
    }
}

#[async_trait]
impl Stage for AnalysisStage {
    fn kind(&self) -> StageKind {
        StageKind::Analysis
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, StageError> {
        let checklist_text = ctx
            .template
            .as_ref()
            .map(|t| t.checklist_text())
            .unwrap_or_else(|| "(no checklist for this role)".to_string());
        let extraction_json = prompt_json(ctx.previous(StageKind::Extraction));

        let prompt = fill_template(
            ANALYSIS_PROMPT_TEMPLATE,
            &[
                ("extraction_json", &extraction_json),
                ("jd_text", &ctx.jd_requirements),
                ("checklist_text", &checklist_text),
            ],
        );
        let raw = self
            .backend
            .complete(&self.system, &prompt, &self.settings.options)
            .await?;
        let output: AnalysisOutput = parse_output(StageKind::Analysis, raw)?;

        info!(
            "Analysis: {} matched, {} inferred, recommendation '{}'",
            output.matched_skills.len(),
            output.inferred_skills.len(),
            output.recommendation
        );

        let reasoning = output.summary.clone();
        let data = serde_json::to_value(&output).map_err(|source| StageError::Malformed {
            stage: StageKind::Analysis,
            source,
        })?;
        let mut result = AgentResult::success(data, output.confidence);
        if let Some(summary) = reasoning {
            result = result.with_reasoning(summary);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::fixtures::react_template;
    use crate::pipeline::test_support::{FakeBackend, Scripted};
    use serde_json::json;

    #[test]
    fn test_tier_parses_loose_spellings() {
        for raw in ["Strongly Recommended", "strongly_recommended", "STRONGLY-recommended"] {
            assert_eq!(
                RecommendationTier::try_from(raw.to_string()),
                Ok(RecommendationTier::StronglyRecommended)
            );
        }
        assert!(RecommendationTier::try_from("maybe".to_string()).is_err());
    }

    #[test]
    fn test_tier_serializes_with_spaces() {
        assert_eq!(
            serde_json::to_value(RecommendationTier::NotRecommended).unwrap(),
            "not recommended"
        );
        let tier: RecommendationTier = serde_json::from_value(json!("Not Recommended")).unwrap();
        assert_eq!(tier, RecommendationTier::NotRecommended);
    }

    #[tokio::test]
    async fn test_analysis_prompt_includes_extraction_and_checklist() {
        let backend = Arc::new(FakeBackend::new().with(
            StageKind::Analysis,
            Scripted::Reply(json!({
                "matched_skills": ["React"],
                "recommendation": "recommended",
                "summary": "Solid frontend profile",
                "confidence": 0.8
            })),
        ));
        let stage = AnalysisStage::new(backend.clone(), StageSettings::default());
        let mut ctx = AgentContext::new("resume", "We need React", Some(Arc::new(react_template())));
        ctx.commit(StageKind::Extraction, json!({"skills": ["React"]}));

        let result = stage.execute(&ctx).await.unwrap();
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.data["recommendation"], "recommended");
        assert_eq!(result.reasoning.as_deref(), Some("Solid frontend profile"));

        let prompt = backend.last_prompt(StageKind::Analysis).unwrap();
        assert!(prompt.contains("We need React"));
        assert!(prompt.contains("[MUST] Builds UIs in React and Node"));
        assert!(prompt.contains("\"skills\""));
    }

    #[tokio::test]
    async fn test_analysis_unknown_tier_is_malformed() {
        let backend = Arc::new(FakeBackend::new().with(
            StageKind::Analysis,
            Scripted::Reply(json!({"recommendation": "hire immediately"})),
        ));
        let stage = AnalysisStage::new(backend, StageSettings::default());
        let ctx = AgentContext::new("resume", "jd", None);
        assert!(matches!(
            stage.execute(&ctx).await,
            Err(StageError::Malformed { stage: StageKind::Analysis, .. })
        ));
    }
}
