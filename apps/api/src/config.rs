use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::pipeline::ExecutionMode;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Template store; built-in templates only when unset.
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub pipeline_mode: ExecutionMode,
    pub stage_timeout_secs: u64,
    pub max_resume_chars: usize,
    pub max_concurrent_candidates: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            redis_url: optional_env("REDIS_URL"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            pipeline_mode: parse_env("PIPELINE_MODE", ExecutionMode::Fixed)?,
            stage_timeout_secs: positive(parse_env("STAGE_TIMEOUT_SECS", 60)?, "STAGE_TIMEOUT_SECS")?,
            max_resume_chars: positive(parse_env("MAX_RESUME_CHARS", 12_000)?, "MAX_RESUME_CHARS")?,
            max_concurrent_candidates: positive(
                parse_env("MAX_CONCURRENT_CANDIDATES", 4)?,
                "MAX_CONCURRENT_CANDIDATES",
            )?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, optional_env(key).as_deref(), default)
}

fn parse_value<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
    }
}

fn positive<T: PartialEq + Default>(value: T, key: &str) -> Result<T> {
    if value == T::default() {
        Err(anyhow!("{key} must be greater than zero"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_defaults_when_unset() {
        assert_eq!(parse_value::<u16>("PORT", None, 8080).unwrap(), 8080);
    }

    #[test]
    fn test_parse_value_reads_mode() {
        let mode = parse_value("PIPELINE_MODE", Some("Adaptive"), ExecutionMode::Fixed).unwrap();
        assert_eq!(mode, ExecutionMode::Adaptive);
    }

    #[test]
    fn test_parse_value_reports_key_on_error() {
        let err = parse_value::<u64>("STAGE_TIMEOUT_SECS", Some("soon"), 60).unwrap_err();
        assert!(err.to_string().contains("STAGE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_positive_rejects_zero() {
        assert!(positive(0usize, "MAX_CONCURRENT_CANDIDATES").is_err());
        assert_eq!(positive(3usize, "MAX_CONCURRENT_CANDIDATES").unwrap(), 3);
    }
}
