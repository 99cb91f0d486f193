//! Traits for the language-model collaborators.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::brain::llm::LlmError;
use crate::brain::types::{CourseClassification, ModuleClassification, RelevanceResult};
use crate::image::ImageInput;
use crate::lms::ModuleItem;

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum BrainError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Unparseable reply: {0}")]
    Parse(String),

    #[error("LLM not configured")]
    NotConfigured,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Proposes course and module matches and scores module items.
///
/// Replies are untrusted. Callers validate them against the real catalog.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Name of this classifier for logging.
    fn name(&self) -> &str;

    async fn classify_course(
        &self,
        query: &str,
        catalog_names: &[&str],
    ) -> Result<CourseClassification, BrainError>;

    async fn classify_modules(
        &self,
        query: &str,
        module_names: &[&str],
    ) -> Result<ModuleClassification, BrainError>;

    /// Pick up to five items, by index into `items`, with a score each.
    async fn score_resources(
        &self,
        query: &str,
        items: &[ModuleItem],
        course_name: &str,
        module_name: &str,
    ) -> Result<RelevanceResult, BrainError>;
}

/// Turns an image into searchable text.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    fn name(&self) -> &str;

    async fn describe_image(&self, image: &ImageInput) -> Result<String, BrainError>;
}

/// Stand-in used when no model is configured. Every call fails, so the
/// cascade runs on its heuristic tiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredClassifier;

#[async_trait]
impl Classifier for UnconfiguredClassifier {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn classify_course(
        &self,
        _query: &str,
        _catalog_names: &[&str],
    ) -> Result<CourseClassification, BrainError> {
        Err(BrainError::NotConfigured)
    }

    async fn classify_modules(
        &self,
        _query: &str,
        _module_names: &[&str],
    ) -> Result<ModuleClassification, BrainError> {
        Err(BrainError::NotConfigured)
    }

    async fn score_resources(
        &self,
        _query: &str,
        _items: &[ModuleItem],
        _course_name: &str,
        _module_name: &str,
    ) -> Result<RelevanceResult, BrainError> {
        Err(BrainError::NotConfigured)
    }
}
