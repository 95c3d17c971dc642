use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::checklist::scorer::CandidateEvidence;
use crate::checklist::JdTemplate;
use crate::pipeline::analysis::AnalysisOutput;
use crate::pipeline::extraction::ExtractionOutput;
use crate::pipeline::stage::StageKind;

/// Everything one candidate's pipeline run knows. Stages read it; only the
/// orchestrator writes to it, between stages.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub resume_text: String,
    pub jd_requirements: String,
    pub template: Option<Arc<JdTemplate>>,
    previous_results: Map<String, Value>,
}

impl AgentContext {
    pub fn new(
        resume_text: impl Into<String>,
        jd_requirements: impl Into<String>,
        template: Option<Arc<JdTemplate>>,
    ) -> Self {
        Self {
            resume_text: resume_text.into(),
            jd_requirements: jd_requirements.into(),
            template,
            previous_results: Map::new(),
        }
    }

    /// Records a successful stage's data under the stage name.
    pub fn commit(&mut self, kind: StageKind, data: Value) {
        self.previous_results.insert(kind.as_str().to_string(), data);
    }

    pub fn previous(&self, kind: StageKind) -> Option<&Value> {
        self.previous_results.get(kind.as_str())
    }

    /// Typed view of a prior stage's data. A shape mismatch reads as absent.
    pub fn previous_as<T: DeserializeOwned>(&self, kind: StageKind) -> Option<T> {
        let value = self.previous(kind)?;
        match serde_json::from_value(value.clone()) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Ignoring {} data with unexpected shape: {}", kind, e);
                None
            }
        }
    }

    pub fn previous_results(&self) -> &Map<String, Value> {
        &self.previous_results
    }

    /// Checklist evidence: extracted skills plus the skills analysis matched or
    /// inferred, against the full resume text.
    pub fn candidate_evidence(&self) -> CandidateEvidence {
        let mut skills: Vec<String> = Vec::new();
        if let Some(extraction) = self.previous_as::<ExtractionOutput>(StageKind::Extraction) {
            skills.extend(extraction.skills);
        }
        if let Some(analysis) = self.previous_as::<AnalysisOutput>(StageKind::Analysis) {
            skills.extend(analysis.matched_skills);
            skills.extend(analysis.inferred_skills);
        }

        let mut seen = std::collections::HashSet::new();
        skills.retain(|s| seen.insert(s.trim().to_lowercase()));

        CandidateEvidence::new(skills, self.resume_text.clone())
    }
}
