//! Extraction stage — raw resume text to structured candidate facts.
//!
//! Algorithm:
//! 1. Truncate the resume on a char boundary to `max_input_chars`
//! 2. One backend call with the no-fabrication instruction
//! 3. Drop contact details and skills that do not appear in the resume text
//! 4. Recompute years of experience from merged date ranges (model value is the fallback)
//! 5. Confidence = model's self-report, capped when fields were dropped or nothing was found

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::prompts::{system_prompt, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::InferenceBackend;
use crate::ontology::{contains_term, normalize_skill, resolve};
use crate::pipeline::context::AgentContext;
use crate::pipeline::prompts::{EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_ROLE};
use crate::pipeline::stage::{
    fill_template, parse_output, AgentResult, Stage, StageError, StageKind, StageSettings,
};

/// Confidence ceiling once the guard had to drop unsupported fields.
const DROPPED_FIELDS_CONFIDENCE_CAP: f64 = 0.7;
/// Confidence ceiling when the model found no name, skills, or experience.
const EMPTY_EXTRACTION_CONFIDENCE_CAP: f64 = 0.2;
/// Shorter phone numbers cannot be checked against the text reliably.
const MIN_PHONE_DIGITS: usize = 7;

const PRESENT_MARKERS: &[&str] = &["present", "current", "now", "ongoing", "today"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOutput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub experience: Vec<ExperienceEntry>,
    pub years_of_experience: f64,
    pub skills: Vec<String>,
    pub education_level: Option<String>,
    pub extraction_confidence: f64,
}

impl ExtractionOutput {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.skills.is_empty() && self.experience.is_empty()
    }
}

pub struct ExtractionStage {
    backend: Arc<dyn InferenceBackend>,
    settings: StageSettings,
    system: String,
}

impl ExtractionStage {
    pub fn new(backend: Arc<dyn InferenceBackend>, settings: StageSettings) -> Self {
        Self {
            backend,
            settings,
            system: system_prompt(EXTRACTION_ROLE),
        }
    }
}

#[async_trait]
impl Stage for ExtractionStage {
    fn kind(&self) -> StageKind {
        StageKind::Extraction
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentResult, StageError> {
        let resume = truncate_chars(&ctx.resume_text, self.settings.max_input_chars);
        let truncated = resume.len() < ctx.resume_text.len();
        if truncated {
            warn!(
                "Resume truncated to {} chars for extraction",
                self.settings.max_input_chars
            );
        }

        let prompt = fill_template(
            EXTRACTION_PROMPT_TEMPLATE,
            &[
                ("no_fabrication", NO_FABRICATION_INSTRUCTION),
                ("resume_text", resume),
            ],
        );
        let raw = self
            .backend
            .complete(&self.system, &prompt, &self.settings.options)
            .await?;
        let mut output: ExtractionOutput = parse_output(StageKind::Extraction, raw)?;

        let dropped = drop_unsupported(&mut output, &ctx.resume_text);

        if let Some(years) = compute_years_of_experience(&output.experience, Utc::now().date_naive())
        {
            output.years_of_experience = years;
        }
        output.years_of_experience = output.years_of_experience.max(0.0);

        let mut confidence = output.extraction_confidence;
        let mut notes = Vec::new();
        if !dropped.is_empty() {
            confidence = confidence.min(DROPPED_FIELDS_CONFIDENCE_CAP);
            notes.push(format!(
                "Dropped values not found in the resume: {}",
                dropped.join(", ")
            ));
        }
        if output.is_empty() {
            confidence = confidence.min(EMPTY_EXTRACTION_CONFIDENCE_CAP);
            notes.push("No name, skills, or experience could be extracted".to_string());
        }
        if truncated {
            notes.push(format!(
                "Resume truncated to {} characters",
                self.settings.max_input_chars
            ));
        }

        info!(
            "Extracted {} skills, {} roles, {:.1} years",
            output.skills.len(),
            output.experience.len(),
            output.years_of_experience
        );

        let data = serde_json::to_value(&output)
            .map_err(|source| StageError::Malformed {
                stage: StageKind::Extraction,
                source,
            })?;
        let mut result = AgentResult::success(data, confidence);
        if !notes.is_empty() {
            result = result.with_reasoning(notes.join(". "));
        }
        Ok(result)
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fabrication guard
// ────────────────────────────────────────────────────────────────────────────

/// Removes extracted values the source text does not support. Returns labels for
/// what was dropped.
fn drop_unsupported(output: &mut ExtractionOutput, source: &str) -> Vec<String> {
    let haystack = normalize_skill(source);
    let mut dropped = Vec::new();

    if let Some(email) = output.email.take() {
        let needle = email.trim().to_lowercase();
        if !needle.is_empty() && haystack.contains(&needle) {
            output.email = Some(email);
        } else {
            dropped.push("email".to_string());
        }
    }

    if let Some(phone) = output.phone.take() {
        let digits = digits_only(&phone);
        if digits.len() >= MIN_PHONE_DIGITS && digits_only(source).contains(&digits) {
            output.phone = Some(phone);
        } else {
            dropped.push("phone".to_string());
        }
    }

    if let Some(name) = output.name.take() {
        let needle = normalize_skill(&name);
        if !needle.is_empty() && haystack.contains(&needle) {
            output.name = Some(name);
        } else {
            dropped.push("name".to_string());
        }
    }

    let mut seen = std::collections::HashSet::new();
    let mut removed = Vec::new();
    output.skills.retain(|skill| {
        let key = normalize_skill(skill);
        if key.is_empty() || !seen.insert(key.clone()) {
            return false;
        }
        if skill_in_text(&key, &haystack) {
            true
        } else {
            removed.push(skill.clone());
            false
        }
    });
    if !removed.is_empty() {
        dropped.push(format!("skills [{}]", removed.join(", ")));
    }

    dropped
}

/// True when the skill, or any exact variant of its ontology entry, is a whole term
/// of the text.
fn skill_in_text(skill: &str, haystack: &str) -> bool {
    if contains_term(haystack, skill) {
        return true;
    }
    resolve(skill).is_some_and(|entry| {
        std::iter::once(entry.key)
            .chain(entry.exact.iter().copied())
            .any(|variant| contains_term(haystack, variant))
    })
}

fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Years of experience
// ────────────────────────────────────────────────────────────────────────────

/// Total experience in years from the entries' date ranges, with overlapping ranges
/// counted once. `None` when no entry has a usable range.
pub fn compute_years_of_experience(entries: &[ExperienceEntry], today: NaiveDate) -> Option<f64> {
    let mut ranges: Vec<(NaiveDate, NaiveDate)> = entries
        .iter()
        .filter_map(|entry| {
            let start = parse_resume_date(entry.start_date.as_deref()?)?;
            let end = match entry.end_date.as_deref().map(str::trim) {
                None | Some("") => today,
                Some(raw) if is_present(raw) => today,
                Some(raw) => parse_resume_date(raw)?,
            };
            (end >= start).then_some((start, end.min(today)))
        })
        .filter(|(start, end)| start <= end)
        .collect();

    if ranges.is_empty() {
        return None;
    }

    ranges.sort();
    let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let days: i64 = merged.iter().map(|(s, e)| (*e - *s).num_days()).sum();
    Some((days as f64 / 365.25 * 10.0).round() / 10.0)
}

fn is_present(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    PRESENT_MARKERS.contains(&lower.as_str())
}

/// Accepts YYYY-MM-DD, YYYY-MM, MM/YYYY, "Jan 2020", "January 2020", and YYYY.
/// Partial dates resolve to the first day of the period.
fn parse_resume_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("01/{raw}"), "%d/%m/%Y") {
        return Some(date);
    }
    for format in ["%d %b %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("01 {raw}"), format) {
            return Some(date);
        }
    }
    if raw.len() == 4 {
        if let Ok(year) = raw.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    None
}
