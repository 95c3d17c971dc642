//! Axum route handlers for the Screening API.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::checklist::JdTemplate;
use crate::errors::AppError;
use crate::pipeline::stage::AgentResult;
use crate::pipeline::{AgentContext, ExecutionMode, StageKind};
use crate::screening::batch::{screen_batch, ResumeInput};
use crate::screening::candidate::Candidate;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScreeningRequest {
    #[serde(default)]
    pub role: Option<String>,
    /// Inline template; takes precedence over `role`.
    #[serde(default)]
    pub template: Option<JdTemplate>,
    pub jd_text: String,
    pub resumes: Vec<ResumeInput>,
}

#[derive(Debug, Serialize)]
pub struct ScreeningResponse {
    pub role: String,
    pub mode: ExecutionMode,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub template: Option<JdTemplate>,
    pub jd_text: String,
    pub resume_text: String,
    /// Stages to run side by side; each sees only the resume, JD and template.
    pub stages: Vec<StageKind>,
}

#[derive(Debug, Serialize)]
pub struct StageEvaluation {
    pub stage: StageKind,
    pub result: AgentResult,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub role: Option<String>,
    pub stages: Vec<StageEvaluation>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/templates/:role
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<JdTemplate>, AppError> {
    let template = state
        .templates
        .get(&role)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No JD template for role '{role}'")))?;
    Ok(Json(template.as_ref().clone()))
}

/// POST /api/v1/screenings
///
/// Screens a batch of resumes against one JD. The template is resolved (and an
/// inline one validated) before any candidate runs.
pub async fn handle_screen(
    State(state): State<AppState>,
    Json(request): Json<ScreeningRequest>,
) -> Result<Json<ScreeningResponse>, AppError> {
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }
    if request.resumes.is_empty() {
        return Err(AppError::Validation(
            "resumes must contain at least one entry".to_string(),
        ));
    }
    if let Some(resume) = request.resumes.iter().find(|r| r.text.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "resume '{}' has no text",
            resume.file_name
        )));
    }

    let template = resolve_template(&state, request.template, request.role)
        .await?
        .ok_or_else(|| AppError::Validation("either role or template is required".to_string()))?;

    info!(
        "Screening request: role '{}', {} resumes",
        template.role,
        request.resumes.len()
    );

    let candidates = screen_batch(
        Arc::clone(&state.orchestrator),
        Some(Arc::clone(&template)),
        &request.jd_text,
        request.resumes,
        state.config.max_concurrent_candidates,
    )
    .await;

    Ok(Json(ScreeningResponse {
        role: template.role.clone(),
        mode: state.orchestrator.policy().mode,
        candidates,
    }))
}

/// POST /api/v1/evaluations
///
/// Runs the requested stages concurrently against one resume. Results come back
/// in request order. A role or template is optional here; without one the scoring
/// stage reports no checklist.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Json<EvaluationResponse>, AppError> {
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    if request.stages.is_empty() {
        return Err(AppError::Validation(
            "stages must name at least one stage".to_string(),
        ));
    }

    let template = resolve_template(&state, request.template, request.role).await?;
    info!(
        "Collaborative evaluation: stages [{}]",
        request
            .stages
            .iter()
            .map(StageKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let role = template.as_ref().map(|t| t.role.clone());
    let ctx = Arc::new(AgentContext::new(request.resume_text, request.jd_text, template));
    let stages = state
        .orchestrator
        .run_collaborative(ctx, &request.stages)
        .await
        .into_iter()
        .map(|(stage, result)| StageEvaluation { stage, result })
        .collect();

    Ok(Json(EvaluationResponse { role, stages }))
}

/// An inline template wins over a role lookup and is validated here, before any
/// stage runs. `Ok(None)` when the request names neither.
async fn resolve_template(
    state: &AppState,
    inline: Option<JdTemplate>,
    role: Option<String>,
) -> Result<Option<Arc<JdTemplate>>, AppError> {
    match (inline, role) {
        (Some(template), _) => {
            template.validate()?;
            Ok(Some(Arc::new(template)))
        }
        (None, Some(role)) => state
            .templates
            .get(&role)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::NotFound(format!("No JD template for role '{role}'"))),
        (None, None) => Ok(None),
    }
}
