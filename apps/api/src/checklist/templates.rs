//! JD template lookup keyed by normalized role name.
//!
//! `RedisTemplateStore` reads `jd_template:<role>` JSON values and falls back to the
//! built-in set when Redis is unreachable or has no entry. Every template handed to
//! the pipeline has passed `JdTemplate::validate`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::checklist::{JdItem, JdTemplate, TemplateError};

const REDIS_KEY_PREFIX: &str = "jd_template:";

/// Source of JD templates. Carried in `AppState` as `Arc<dyn TemplateSource>`.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// `Ok(None)` when no template exists for the role. A stored template that breaks
    /// the weight invariants is an error, never a silent fallback.
    async fn get(&self, role: &str) -> Result<Option<Arc<JdTemplate>>, TemplateError>;
}

/// Lowercases and replaces every run of non-alphanumeric characters with `-`.
/// "Senior  Frontend Developer " → "senior-frontend-developer"
pub fn normalize_role(role: &str) -> String {
    role.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in defaults
// ────────────────────────────────────────────────────────────────────────────

pub struct BuiltinTemplates {
    templates: HashMap<String, Arc<JdTemplate>>,
}

impl BuiltinTemplates {
    pub fn new() -> Self {
        let templates = default_templates()
            .into_iter()
            .map(|t| (normalize_role(&t.role), Arc::new(t)))
            .collect();
        Self { templates }
    }

    pub fn lookup(&self, role: &str) -> Option<Arc<JdTemplate>> {
        self.templates.get(&normalize_role(role)).cloned()
    }
}

impl Default for BuiltinTemplates {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateSource for BuiltinTemplates {
    async fn get(&self, role: &str) -> Result<Option<Arc<JdTemplate>>, TemplateError> {
        match self.lookup(role) {
            Some(template) => {
                template.validate()?;
                Ok(Some(template))
            }
            None => Ok(None),
        }
    }
}

fn item(id: &str, text: &str, must: bool, very_must: &[&str], tags: &[&str]) -> JdItem {
    JdItem {
        id: id.to_string(),
        text: text.to_string(),
        must,
        very_must: very_must.iter().map(|s| s.to_string()).collect(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
    }
}

fn weights(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn default_templates() -> Vec<JdTemplate> {
    vec![
        JdTemplate {
            role: "Frontend Developer".to_string(),
            weights: weights(&[
                ("frameworks", 0.35),
                ("languages", 0.25),
                ("styling", 0.15),
                ("tooling", 0.15),
                ("testing", 0.10),
            ]),
            items: vec![
                item(
                    "frameworks",
                    "Production experience with a modern component framework",
                    true,
                    &["react"],
                    &["react", "redux", "next.js", "vue"],
                ),
                item(
                    "languages",
                    "Strong JavaScript and TypeScript",
                    true,
                    &["javascript"],
                    &["javascript", "typescript"],
                ),
                item("styling", "Semantic HTML and modern CSS", false, &[], &["html", "css", "sass"]),
                item("tooling", "Build and delivery tooling", false, &[], &["git", "webpack", "ci/cd"]),
                item("testing", "Automated UI testing", false, &[], &["jest", "cypress", "testing library"]),
            ],
        },
        JdTemplate {
            role: "Backend Developer".to_string(),
            weights: weights(&[
                ("services", 0.35),
                ("data", 0.25),
                ("infrastructure", 0.25),
                ("practices", 0.15),
            ]),
            items: vec![
                item(
                    "services",
                    "Designs and ships HTTP services",
                    true,
                    &["rest api"],
                    &["rest api", "node.js", "python", "java", "golang"],
                ),
                item(
                    "data",
                    "Relational and document databases",
                    true,
                    &["sql"],
                    &["sql", "postgresql", "mongodb"],
                ),
                item(
                    "infrastructure",
                    "Containerized deployment on cloud infrastructure",
                    false,
                    &[],
                    &["docker", "kubernetes", "aws"],
                ),
                item("practices", "Delivery practices", false, &[], &["git", "ci/cd", "agile"]),
            ],
        },
        JdTemplate {
            role: "Data Scientist".to_string(),
            weights: weights(&[
                ("modeling", 0.40),
                ("tooling", 0.30),
                ("data", 0.20),
                ("communication", 0.10),
            ]),
            items: vec![
                item(
                    "modeling",
                    "Builds and evaluates machine learning models",
                    true,
                    &["machine learning"],
                    &["machine learning", "statistics", "deep learning"],
                ),
                item(
                    "tooling",
                    "Python data stack",
                    true,
                    &["python"],
                    &["python", "pandas", "scikit-learn", "pytorch"],
                ),
                item("data", "Querying and shaping data", false, &[], &["sql", "data analysis"]),
                item(
                    "communication",
                    "Communicates findings to stakeholders",
                    false,
                    &[],
                    &["data visualization", "stakeholder communication"],
                ),
            ],
        },
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Redis-backed store
// ────────────────────────────────────────────────────────────────────────────

/// Key-value template store with built-in fallback.
pub struct RedisTemplateStore {
    client: redis::Client,
    fallback: BuiltinTemplates,
}

impl RedisTemplateStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            fallback: BuiltinTemplates::new(),
        }
    }

    async fn fetch(&self, key: &str) -> redis::RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }
}

#[async_trait]
impl TemplateSource for RedisTemplateStore {
    async fn get(&self, role: &str) -> Result<Option<Arc<JdTemplate>>, TemplateError> {
        let normalized = normalize_role(role);
        let key = format!("{REDIS_KEY_PREFIX}{normalized}");

        match self.fetch(&key).await {
            Ok(Some(raw)) => {
                let template = parse_stored_template(&normalized, &raw)?;
                debug!("Loaded JD template '{}' from Redis", normalized);
                Ok(Some(Arc::new(template)))
            }
            Ok(None) => {
                debug!("No stored template for '{}', using built-in defaults", normalized);
                self.fallback.get(role).await
            }
            Err(e) => {
                warn!("Template store unavailable ({e}), using built-in defaults");
                self.fallback.get(role).await
            }
        }
    }
}

/// Parses and validates a stored template JSON value.
fn parse_stored_template(role: &str, raw: &str) -> Result<JdTemplate, TemplateError> {
    let template: JdTemplate =
        serde_json::from_str(raw).map_err(|e| TemplateError::Malformed {
            role: role.to_string(),
            message: e.to_string(),
        })?;
    template.validate()?;
    Ok(template)
}
