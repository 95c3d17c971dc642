//! Checklist Scorer — deterministic evaluation of candidate evidence against a
//! weighted JD template.
//!
//! Algorithm:
//! 1. For each item tag: exact hit (evidence skill equals the tag, or the tag is a
//!    whole term of the evidence text) → similar hit → related hit → miss.
//!    Similar and related hits are checked against the evidence skills and against
//!    every ontology term found in the text.
//! 2. coverage = matched / tags (0.0 for an item without tags)
//! 3. must items pass when every `very_must` tag is among the matched tags and
//!    coverage ≥ MUST_COVERAGE_THRESHOLD; optional items pass when coverage > 0
//! 4. overall = 100 × Σ weights[item.id] × coverage

use serde::{Deserialize, Serialize};

use crate::checklist::{JdTemplate, TemplateError};
use crate::ontology::{contains_term, is_related, is_similar, normalize_skill, terms_in, MatchTier};

/// Minimum coverage a must-item needs on top of its `very_must` tags.
pub const MUST_COVERAGE_THRESHOLD: f64 = 0.5;

/// What the scorer knows about a candidate: resolved skill names and free text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateEvidence {
    pub skills: Vec<String>,
    pub text: String,
}

impl CandidateEvidence {
    pub fn new(skills: Vec<String>, text: impl Into<String>) -> Self {
        Self {
            skills,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItemResult {
    pub id: String,
    pub text: String,
    pub must: bool,
    pub passed: bool,
    pub coverage: f64,
    pub matched_tags: Vec<String>,
    pub missing_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistScore {
    pub items: Vec<ChecklistItemResult>,
    /// 0 – 100
    pub overall: f64,
}

/// Evidence normalized once per scoring call.
struct PreparedEvidence {
    skills: Vec<String>,
    text: String,
    text_terms: Vec<&'static str>,
}

impl PreparedEvidence {
    fn new(evidence: &CandidateEvidence) -> Self {
        Self {
            skills: evidence
                .skills
                .iter()
                .map(|s| normalize_skill(s))
                .filter(|s| !s.is_empty())
                .collect(),
            text: normalize_skill(&evidence.text),
            text_terms: terms_in(&evidence.text),
        }
    }

    fn candidates(&self) -> impl Iterator<Item = &str> + '_ {
        self.skills
            .iter()
            .map(String::as_str)
            .chain(self.text_terms.iter().copied())
    }

    fn match_tag(&self, tag: &str) -> Option<MatchTier> {
        let tag = normalize_skill(tag);
        if tag.is_empty() {
            return None;
        }
        if self.skills.iter().any(|s| *s == tag) || contains_term(&self.text, &tag) {
            Some(MatchTier::Exact)
        } else if self.candidates().any(|s| is_similar(s, &tag)) {
            Some(MatchTier::Similar)
        } else if self.candidates().any(|s| is_related(s, &tag)) {
            Some(MatchTier::Related)
        } else {
            None
        }
    }
}

/// Scores evidence against a template. A template that breaks the weight invariants
/// is refused with the same error template loading would produce.
pub fn score(
    evidence: &CandidateEvidence,
    template: &JdTemplate,
) -> Result<ChecklistScore, TemplateError> {
    template.validate()?;

    let prepared = PreparedEvidence::new(evidence);
    let mut items = Vec::with_capacity(template.items.len());
    let mut total = 0.0_f64;

    for item in &template.items {
        let (matched_tags, missing_tags): (Vec<String>, Vec<String>) = item
            .tags
            .iter()
            .cloned()
            .partition(|tag| prepared.match_tag(tag).is_some());

        let coverage = if item.tags.is_empty() {
            0.0
        } else {
            (matched_tags.len() as f64 / item.tags.len() as f64).clamp(0.0, 1.0)
        };

        let passed = if item.must {
            let critical_ok = item.very_must.iter().all(|critical| {
                let critical = normalize_skill(critical);
                matched_tags.iter().any(|tag| normalize_skill(tag) == critical)
            });
            critical_ok && coverage >= MUST_COVERAGE_THRESHOLD
        } else {
            coverage > 0.0
        };

        // validate() guarantees the key exists
        let weight = template.weights.get(&item.id).copied().unwrap_or_default();
        total += weight * coverage;

        items.push(ChecklistItemResult {
            id: item.id.clone(),
            text: item.text.clone(),
            must: item.must,
            passed,
            coverage,
            matched_tags,
            missing_tags,
        });
    }

    Ok(ChecklistScore {
        items,
        overall: (total * 100.0).clamp(0.0, 100.0),
    })
}
