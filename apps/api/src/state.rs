use std::sync::Arc;

use crate::checklist::templates::TemplateSource;
use crate::config::Config;
use crate::pipeline::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// One orchestrator serves every candidate; stages are immutable.
    pub orchestrator: Arc<Orchestrator>,
    /// Redis-backed with built-in fallback in production.
    pub templates: Arc<dyn TemplateSource>,
    pub config: Config,
}
