//! JD Checklist — weighted job-description templates and the deterministic scorer
//! that evaluates candidate evidence against them.
//!
//! Templates are validated when they are loaded. The scorer validates again and
//! refuses a bad template instead of renormalizing it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ontology::normalize_skill;

pub mod scorer;
pub mod templates;

/// Allowed deviation of `sum(weights)` from 1.0.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-3;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template weights for '{role}' sum to {sum:.4}, expected 1.0 (±0.001)")]
    WeightSum { role: String, sum: f64 },

    #[error("checklist item '{id}' in template '{role}' has no matching weight key")]
    MissingWeight { role: String, id: String },

    #[error("weight '{key}' in template '{role}' must be a finite, non-negative number (got {value})")]
    InvalidWeight { role: String, key: String, value: f64 },

    #[error("critical tag '{tag}' of item '{id}' in template '{role}' is not one of the item's tags")]
    UnknownCriticalTag { role: String, id: String, tag: String },

    #[error("template role cannot be empty")]
    EmptyRole,

    #[error("stored template '{role}' is not valid JSON: {message}")]
    Malformed { role: String, message: String },
}

/// One weighted requirement in a JD template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JdItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub must: bool,
    /// Critical tags a must-item needs. Ignored on optional items.
    #[serde(default)]
    pub very_must: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A role's checklist: weights per item id plus the items themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JdTemplate {
    pub role: String,
    pub weights: HashMap<String, f64>,
    pub items: Vec<JdItem>,
}

impl JdTemplate {
    /// Checks the weight-sum and item/weight-key invariants, and that every
    /// `very_must` tag is also listed in its item's `tags`.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.role.trim().is_empty() {
            return Err(TemplateError::EmptyRole);
        }

        for (key, value) in &self.weights {
            if !value.is_finite() || *value < 0.0 {
                return Err(TemplateError::InvalidWeight {
                    role: self.role.clone(),
                    key: key.clone(),
                    value: *value,
                });
            }
        }

        let sum: f64 = self.weights.values().sum();
        if (sum - 1.0).abs() >= WEIGHT_SUM_EPSILON {
            return Err(TemplateError::WeightSum {
                role: self.role.clone(),
                sum,
            });
        }

        if let Some(item) = self
            .items
            .iter()
            .find(|item| !self.weights.contains_key(&item.id))
        {
            return Err(TemplateError::MissingWeight {
                role: self.role.clone(),
                id: item.id.clone(),
            });
        }

        for item in &self.items {
            let unknown = item.very_must.iter().find(|critical| {
                let critical = normalize_skill(critical);
                !item.tags.iter().any(|tag| normalize_skill(tag) == critical)
            });
            if let Some(tag) = unknown {
                return Err(TemplateError::UnknownCriticalTag {
                    role: self.role.clone(),
                    id: item.id.clone(),
                    tag: tag.clone(),
                });
            }
        }

        Ok(())
    }

    /// Plain-text rendering of the checklist, used in stage prompts.
    pub fn checklist_text(&self) -> String {
        self.items
            .iter()
            .map(|item| {
                let marker = if item.must { "MUST" } else { "NICE" };
                let weight = self.weights.get(&item.id).copied().unwrap_or_default();
                format!(
                    "- [{marker}] {} (weight {:.2}; tags: {})",
                    item.text,
                    weight,
                    item.tags.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::react_template;
    use super::*;

    #[test]
    fn test_valid_template_passes() {
        assert_eq!(react_template().validate(), Ok(()));
    }

    #[test]
    fn test_weight_sum_within_epsilon_accepted() {
        let mut template = react_template();
        template.weights.insert("skills".to_string(), 0.6005);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_weight_sum_violation_rejected() {
        let mut template = react_template();
        template.weights.insert("experience".to_string(), 0.5);
        match template.validate() {
            Err(TemplateError::WeightSum { sum, .. }) => assert!((sum - 1.1).abs() < 1e-9),
            other => panic!("expected WeightSum error, got {other:?}"),
        }
    }

    #[test]
    fn test_item_without_weight_key_rejected() {
        let mut template = react_template();
        template.items.push(JdItem {
            id: "leadership".to_string(),
            text: "Leads a team".to_string(),
            must: false,
            very_must: vec![],
            tags: vec!["mentoring".to_string()],
        });
        assert_eq!(
            template.validate(),
            Err(TemplateError::MissingWeight {
                role: "Frontend Developer".to_string(),
                id: "leadership".to_string(),
            })
        );
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut template = react_template();
        template.weights.insert("skills".to_string(), 1.2);
        template.weights.insert("experience".to_string(), -0.2);
        assert!(matches!(
            template.validate(),
            Err(TemplateError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_very_must_outside_tags_rejected() {
        let mut template = react_template();
        template.items[0].very_must.push("TypeScript".to_string());
        assert_eq!(
            template.validate(),
            Err(TemplateError::UnknownCriticalTag {
                role: "Frontend Developer".to_string(),
                id: "skills".to_string(),
                tag: "TypeScript".to_string(),
            })
        );
    }

    #[test]
    fn test_very_must_compared_after_normalization() {
        let mut template = react_template();
        template.items[0].very_must = vec!["  REACT ".to_string()];
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_empty_role_rejected() {
        let mut template = react_template();
        template.role = "  ".to_string();
        assert_eq!(template.validate(), Err(TemplateError::EmptyRole));
    }

    #[test]
    fn test_template_deserializes_with_defaults() {
        let json = r#"{
            "role": "Backend Developer",
            "weights": {"apis": 1.0},
            "items": [{"id": "apis", "text": "Designs REST APIs", "tags": ["rest api"]}]
        }"#;
        let template: JdTemplate = serde_json::from_str(json).unwrap();
        assert!(!template.items[0].must);
        assert!(template.items[0].very_must.is_empty());
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_checklist_text_marks_must_items() {
        let text = react_template().checklist_text();
        assert!(text.contains("[MUST] Builds UIs in React and Node"));
        assert!(text.contains("weight 0.60"));
        assert!(text.contains("react, node"));
    }
}
