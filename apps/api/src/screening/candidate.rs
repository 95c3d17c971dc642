//! Candidate aggregate — folds a `PipelineOutcome` into the record returned to
//! callers.
//!
//! Algorithm:
//! 1. Typed views of each stage's committed data (absent data reads as empty)
//! 2. Checklist: the scoring stage's result, else a fresh deterministic run on the
//!    context evidence when a template is present
//! 3. Status: Failed → placeholder; Halted → Partial; Done → Evaluated
//! 4. Recommendation: recommendation stage (real or below-threshold default),
//!    else the analysis tier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::checklist::scorer::{self, ChecklistItemResult, ChecklistScore};
use crate::pipeline::analysis::{AnalysisOutput, RecommendationTier};
use crate::pipeline::extraction::ExtractionOutput;
use crate::pipeline::recommendation::RecommendationOutput;
use crate::pipeline::scoring::{ScoreBreakdown, ScoringOutput};
use crate::pipeline::{PipelineOutcome, PipelineState, StageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Evaluated,
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInsights {
    pub workflow_log: Vec<String>,
    pub confidence: f64,
    pub overall_score: Option<f64>,
    pub score_breakdown: Option<ScoreBreakdown>,
    pub recommendation: Option<RecommendationTier>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub interview_questions: Vec<String>,
    pub next_steps: Vec<String>,
    pub hiring_manager_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub file_name: String,
    pub status: CandidateStatus,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub years_of_experience: f64,
    pub education_level: Option<String>,
    pub skills: Vec<String>,
    pub matched_skills: Vec<String>,
    pub inferred_skills: Vec<String>,
    pub additional_skills: Vec<String>,
    pub checklist: Vec<ChecklistItemResult>,
    /// Checklist score, 0 – 100
    pub score: f64,
    pub analysis: Option<String>,
    pub insights: Option<PipelineInsights>,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    /// Minimal record for a candidate whose evaluation could not complete.
    pub fn placeholder(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            status: CandidateStatus::Failed,
            name: None,
            email: None,
            phone: None,
            location: None,
            years_of_experience: 0.0,
            education_level: None,
            skills: Vec::new(),
            matched_skills: Vec::new(),
            inferred_skills: Vec::new(),
            additional_skills: Vec::new(),
            checklist: Vec::new(),
            score: 0.0,
            analysis: Some(error.into()),
            insights: None,
            created_at: Utc::now(),
        }
    }
}

pub fn build_candidate(file_name: &str, outcome: &PipelineOutcome) -> Candidate {
    if !outcome.success {
        let error = outcome
            .error
            .clone()
            .unwrap_or_else(|| "pipeline failed".to_string());
        return Candidate::placeholder(file_name, format!("Evaluation failed: {error}"));
    }

    let ctx = &outcome.context;
    let extraction: ExtractionOutput = ctx.previous_as(StageKind::Extraction).unwrap_or_default();
    let analysis: Option<AnalysisOutput> = ctx.previous_as(StageKind::Analysis);
    let scoring: Option<ScoringOutput> = ctx.previous_as(StageKind::Scoring);
    let recommendation: Option<RecommendationOutput> = ctx.previous_as(StageKind::Recommendation);

    let checklist = scoring
        .as_ref()
        .and_then(|s| s.checklist.clone())
        .or_else(|| deterministic_checklist(outcome));

    let (status, note) = match outcome.final_state {
        PipelineState::Halted => (
            CandidateStatus::Partial,
            Some("Extraction confidence too low for a full evaluation; only the checklist was scored".to_string()),
        ),
        _ => (
            CandidateStatus::Evaluated,
            analysis.as_ref().and_then(|a| a.summary.clone()),
        ),
    };

    let insights = PipelineInsights {
        workflow_log: outcome.workflow_log.clone(),
        confidence: outcome.confidence,
        overall_score: scoring.as_ref().map(|s| s.overall_score),
        score_breakdown: scoring.as_ref().map(|s| s.score_breakdown),
        recommendation: recommendation
            .as_ref()
            .map(|r| r.recommendation)
            .or_else(|| analysis.as_ref().map(|a| a.recommendation)),
        strengths: analysis.as_ref().map(|a| a.strengths.clone()).unwrap_or_default(),
        weaknesses: analysis.as_ref().map(|a| a.weaknesses.clone()).unwrap_or_default(),
        interview_questions: recommendation
            .as_ref()
            .map(|r| r.interview_questions.clone())
            .unwrap_or_default(),
        next_steps: recommendation
            .as_ref()
            .map(|r| r.next_steps.clone())
            .unwrap_or_default(),
        hiring_manager_note: recommendation.and_then(|r| r.hiring_manager_note),
    };

    let analysis = analysis.unwrap_or_default();
    Candidate {
        id: Uuid::new_v4(),
        file_name: file_name.to_string(),
        status,
        name: extraction.name,
        email: extraction.email,
        phone: extraction.phone,
        location: extraction.location,
        years_of_experience: extraction.years_of_experience,
        education_level: extraction.education_level,
        skills: extraction.skills,
        matched_skills: analysis.matched_skills,
        inferred_skills: analysis.inferred_skills,
        additional_skills: analysis.additional_skills,
        score: checklist.as_ref().map(|c| c.overall).unwrap_or_default(),
        checklist: checklist.map(|c| c.items).unwrap_or_default(),
        analysis: note,
        insights: Some(insights),
        created_at: Utc::now(),
    }
}

fn deterministic_checklist(outcome: &PipelineOutcome) -> Option<ChecklistScore> {
    let template = outcome.context.template.as_ref()?;
    match scorer::score(&outcome.context.candidate_evidence(), template) {
        Ok(checklist) => Some(checklist),
        Err(e) => {
            warn!("Checklist scoring skipped: {}", e);
            None
        }
    }
}

/// Highest score first; failed candidates always last.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        let a_failed = a.status == CandidateStatus::Failed;
        let b_failed = b.status == CandidateStatus::Failed;
        a_failed
            .cmp(&b_failed)
            .then_with(|| b.score.total_cmp(&a.score))
    });
}
