//! Replies from the language-model collaborators.
//!
//! Every field defaults, so a reply that names only some of them still
//! deserializes. Whether the content is usable is decided by the cascade.

use serde::{Deserialize, Serialize};

/// Course-stage reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseClassification {
    /// Proposed course name, free text.
    pub course_name: Option<String>,
    /// 0.0-1.0, as reported by the model.
    pub confidence: f32,
    pub reasoning: String,
}

impl CourseClassification {
    pub fn named(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            course_name: Some(name.into()),
            confidence,
            reasoning: String::new(),
        }
    }

    /// The proposal, if it is not blank.
    pub fn proposal(&self) -> Option<&str> {
        self.course_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Module-stage reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleClassification {
    /// Proposed module names, most relevant first.
    pub module_names: Vec<String>,
    /// Parallel to `module_names`.
    pub relevance_explanations: Vec<String>,
}

impl ModuleClassification {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module_names: names.into_iter().map(Into::into).collect(),
            relevance_explanations: Vec::new(),
        }
    }
}

/// Resource-stage reply.
///
/// Indices are signed: a model can hand back `-1`, and that must be dropped
/// rather than fail the whole reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceResult {
    pub resource_indices: Vec<i64>,
    pub relevance_scores: Vec<f32>,
    pub reasoning: String,
}

impl RelevanceResult {
    pub fn new(resource_indices: Vec<i64>, relevance_scores: Vec<f32>) -> Self {
        Self {
            resource_indices,
            relevance_scores,
            reasoning: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_classification_partial_reply() {
        let parsed: CourseClassification =
            serde_json::from_str(r#"{"course_name": "Linear Algebra"}"#).unwrap();
        assert_eq!(parsed.proposal(), Some("Linear Algebra"));
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn test_blank_proposal_is_absent() {
        let parsed = CourseClassification::named("   ", 0.9);
        assert_eq!(parsed.proposal(), None);

        let parsed: CourseClassification =
            serde_json::from_str(r#"{"course_name": null, "confidence": 0.1}"#).unwrap();
        assert_eq!(parsed.proposal(), None);
    }

    #[test]
    fn test_relevance_result_accepts_negative_indices() {
        let parsed: RelevanceResult = serde_json::from_str(
            r#"{"resource_indices": [2, -1, 0], "relevance_scores": [0.9, 0.4], "reasoning": "x"}"#,
        )
        .unwrap();
        assert_eq!(parsed.resource_indices, vec![2, -1, 0]);
        assert_eq!(parsed.relevance_scores.len(), 2);
    }
}
