//! Scripted inference backend for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm_client::{parse_json_object, CompletionOptions, InferenceBackend, LlmError};
use crate::pipeline::prompts::{ANALYSIS_ROLE, EXTRACTION_ROLE, RECOMMENDATION_ROLE, SCORING_ROLE};
use crate::pipeline::stage::StageKind;

#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(Value),
    Fail(String),
    /// Non-JSON model output.
    Malformed,
    /// Never answers; exercises stage timeouts.
    Hang,
}

/// Answers by stage, identified from the system prompt's role sentence.
#[derive(Default)]
pub struct FakeBackend {
    script: HashMap<StageKind, Scripted>,
    calls: Mutex<Vec<(StageKind, String)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: StageKind, reply: Scripted) -> Self {
        self.script.insert(kind, reply);
        self
    }

    pub fn calls(&self) -> Vec<StageKind> {
        self.calls.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }

    pub fn last_prompt(&self, kind: StageKind) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
    }
}

fn stage_for_system(system: &str) -> Option<StageKind> {
    [
        (EXTRACTION_ROLE, StageKind::Extraction),
        (ANALYSIS_ROLE, StageKind::Analysis),
        (SCORING_ROLE, StageKind::Scoring),
        (RECOMMENDATION_ROLE, StageKind::Recommendation),
    ]
    .into_iter()
    .find(|(role, _)| system.starts_with(role))
    .map(|(_, kind)| kind)
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<Value, LlmError> {
        let kind = stage_for_system(system).ok_or(LlmError::EmptyContent)?;
        self.calls.lock().unwrap().push((kind, prompt.to_string()));

        match self.script.get(&kind).cloned() {
            Some(Scripted::Reply(value)) => Ok(value),
            Some(Scripted::Fail(message)) => Err(LlmError::Api {
                status: 500,
                message,
            }),
            Some(Scripted::Malformed) => parse_json_object("I'm sorry, I can't do that."),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::EmptyContent)
            }
            None => Err(LlmError::EmptyContent),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Canned replies for a resume naming "Jane Doe" and React (no Node.js evidence)
// ────────────────────────────────────────────────────────────────────────────

pub fn extraction_reply(confidence: f64) -> Scripted {
    Scripted::Reply(json!({
        "name": "Jane Doe",
        "experience": [
            {"title": "React developer", "company": "Acme", "start_date": "2019-01", "end_date": "present"}
        ],
        "years_of_experience": 5,
        "skills": ["React"],
        "education_level": "Bachelor",
        "extraction_confidence": confidence
    }))
}

pub fn analysis_reply(confidence: f64) -> Scripted {
    Scripted::Reply(json!({
        "matched_skills": ["React"],
        "inferred_skills": [],
        "additional_skills": ["Figma"],
        "strengths": ["Production React experience"],
        "weaknesses": ["No Node.js experience"],
        "recommendation": "recommended",
        "summary": "Good frontend fit",
        "confidence": confidence
    }))
}

/// Every dimension set to `score`, so the weighted overall equals `score`.
pub fn scoring_reply(score: f64) -> Scripted {
    Scripted::Reply(json!({
        "score_breakdown": {
            "skill": score,
            "experience": score,
            "education": score,
            "cultural_fit": score,
            "additional_value": score
        },
        "rationale": "Scored from the analysis",
        "confidence": 0.75
    }))
}

pub fn recommendation_reply(confidence: f64) -> Scripted {
    Scripted::Reply(json!({
        "recommendation": "recommended",
        "interview_questions": ["How do you structure state in a large React app?"],
        "next_steps": ["Schedule a technical interview"],
        "hiring_manager_note": "Worth interviewing",
        "confidence": confidence
    }))
}
