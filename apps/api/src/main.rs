mod checklist;
mod config;
mod errors;
mod llm_client;
mod ontology;
mod pipeline;
mod routes;
mod screening;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::checklist::templates::{BuiltinTemplates, RedisTemplateStore, TemplateSource};
use crate::config::Config;
use crate::llm_client::{CompletionOptions, LlmClient};
use crate::pipeline::{Orchestrator, PipelinePolicy, StageSet, StageSettings};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build the pipeline
    let settings = StageSettings {
        options: CompletionOptions::default(),
        max_input_chars: config.max_resume_chars,
    };
    let policy = PipelinePolicy::for_mode(config.pipeline_mode)
        .with_stage_timeout(Duration::from_secs(config.stage_timeout_secs));
    info!(
        "Pipeline mode: {} (recommendation threshold {}, stage timeout {}s)",
        policy.mode.as_str(),
        policy.recommendation_threshold,
        config.stage_timeout_secs
    );
    let orchestrator = Arc::new(Orchestrator::new(StageSet::llm(llm, settings), policy));

    // Initialize template source
    let templates: Arc<dyn TemplateSource> = match &config.redis_url {
        Some(url) => {
            let redis = redis::Client::open(url.as_str())?;
            info!("Redis template store initialized");
            Arc::new(RedisTemplateStore::new(redis))
        }
        None => {
            info!("REDIS_URL not set; serving built-in templates only");
            Arc::new(BuiltinTemplates::new())
        }
    };

    // Build app state
    let state = AppState {
        orchestrator,
        templates,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
