pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Templates API
        .route("/api/v1/templates/:role", get(handlers::handle_get_template))
        // Screening API
        .route("/api/v1/screenings", post(handlers::handle_screen))
        .route("/api/v1/evaluations", post(handlers::handle_evaluate))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::checklist::templates::BuiltinTemplates;
    use crate::config::Config;
    use crate::pipeline::test_support::{
        analysis_reply, extraction_reply, recommendation_reply, scoring_reply, FakeBackend,
    };
    use crate::pipeline::{ExecutionMode, Orchestrator, PipelinePolicy, StageKind, StageSet, StageSettings};

    fn test_state() -> AppState {
        let backend = Arc::new(
            FakeBackend::new()
                .with(StageKind::Extraction, extraction_reply(0.9))
                .with(StageKind::Analysis, analysis_reply(0.8))
                .with(StageKind::Scoring, scoring_reply(70.0))
                .with(StageKind::Recommendation, recommendation_reply(0.7)),
        );
        let orchestrator = Orchestrator::new(
            StageSet::llm(backend, StageSettings::default()),
            PipelinePolicy::fixed(),
        );
        AppState {
            orchestrator: Arc::new(orchestrator),
            templates: Arc::new(BuiltinTemplates::new()),
            config: Config {
                anthropic_api_key: "test-key".to_string(),
                redis_url: None,
                port: 0,
                rust_log: "debug".to_string(),
                pipeline_mode: ExecutionMode::Fixed,
                stage_timeout_secs: 5,
                max_resume_chars: 12_000,
                max_concurrent_candidates: 2,
            },
        }
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(test_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_builtin_template() {
        let request = Request::builder()
            .uri("/api/v1/templates/frontend-developer")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "Frontend Developer");
    }

    #[tokio::test]
    async fn test_unknown_template_is_404() {
        let request = Request::builder()
            .uri("/api/v1/templates/astronaut")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_screening_ranks_candidates() {
        let request = post_json(
            "/api/v1/screenings",
            json!({
                "role": "Frontend Developer",
                "jd_text": "Frontend engineer with React",
                "resumes": [
                    {"file_name": "jane.pdf", "text": "Jane Doe\nReact developer since 2019-01"}
                ]
            }),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "Frontend Developer");
        assert_eq!(body["mode"], "fixed");
        let candidates = body["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0]["status"], "evaluated");
        assert_eq!(candidates[0]["name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_inline_template_with_bad_weights_is_400() {
        let request = post_json(
            "/api/v1/screenings",
            json!({
                "template": {
                    "role": "Custom",
                    "weights": {"skills": 0.7},
                    "items": [{"id": "skills", "text": "React", "tags": ["react"]}]
                },
                "jd_text": "React role",
                "resumes": [{"file_name": "a.pdf", "text": "React"}]
            }),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_TEMPLATE");
    }

    #[tokio::test]
    async fn test_screening_requires_role_or_template() {
        let request = post_json(
            "/api/v1/screenings",
            json!({"jd_text": "React role", "resumes": [{"file_name": "a.pdf", "text": "React"}]}),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_evaluation_runs_stages_in_request_order() {
        let request = post_json(
            "/api/v1/evaluations",
            json!({
                "role": "Frontend Developer",
                "jd_text": "Frontend engineer with React",
                "resume_text": "Jane Doe\nReact developer since 2019-01",
                "stages": ["scoring", "extraction"]
            }),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "Frontend Developer");
        let stages = body["stages"].as_array().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0]["stage"], "scoring");
        assert_eq!(stages[1]["stage"], "extraction");
        assert_eq!(stages[1]["result"]["success"], true);
        assert_eq!(stages[1]["result"]["data"]["name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_evaluation_requires_stages() {
        let request = post_json(
            "/api/v1/evaluations",
            json!({"jd_text": "React role", "resume_text": "React", "stages": []}),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_screening_rejects_empty_batch() {
        let request = post_json(
            "/api/v1/screenings",
            json!({"role": "Frontend Developer", "jd_text": "React role", "resumes": []}),
        );
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
