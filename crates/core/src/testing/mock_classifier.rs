//! Mock classifier and image describer for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::brain::{
    BrainError, Classifier, CourseClassification, ImageDescriber, ModuleClassification,
    RelevanceResult,
};
use crate::image::ImageInput;
use crate::lms::ModuleItem;

/// A recorded name classification for test assertions.
pub type RecordedClassification = (String, Vec<String>);

/// A recorded scoring call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedScoring {
    pub query: String,
    pub course_name: String,
    pub module_name: String,
    pub item_count: usize,
}

/// Mock implementation of the Classifier trait.
///
/// Replies are scripted per stage. Resource replies can be set per module
/// name, falling back to a default reply.
///
/// # Example
///
/// ```rust,ignore
/// use hivemind_core::testing::MockClassifier;
///
/// let classifier = MockClassifier::new();
/// classifier.set_course_reply(CourseClassification::named("Linear Algebra", 0.9)).await;
/// classifier.set_resource_reply_for("Week 1", RelevanceResult::new(vec![0], vec![0.9])).await;
///
/// // Every call fails, as with no model configured
/// classifier.set_failing(true).await;
/// ```
#[derive(Debug)]
pub struct MockClassifier {
    course_reply: Arc<RwLock<CourseClassification>>,
    module_reply: Arc<RwLock<ModuleClassification>>,
    resource_reply: Arc<RwLock<RelevanceResult>>,
    resource_replies: Arc<RwLock<HashMap<String, RelevanceResult>>>,
    /// If set, the next call of any kind fails with this error.
    next_error: Arc<RwLock<Option<BrainError>>>,
    /// When true, every call fails with `BrainError::NotConfigured`.
    failing: Arc<RwLock<bool>>,
    /// Delay applied to every call.
    delay: Arc<RwLock<Option<Duration>>>,
    course_calls: Arc<RwLock<Vec<RecordedClassification>>>,
    module_calls: Arc<RwLock<Vec<RecordedClassification>>>,
    resource_calls: Arc<RwLock<Vec<RecordedScoring>>>,
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClassifier {
    /// Create a mock that proposes nothing and scores nothing.
    pub fn new() -> Self {
        Self {
            course_reply: Arc::new(RwLock::new(CourseClassification::default())),
            module_reply: Arc::new(RwLock::new(ModuleClassification::default())),
            resource_reply: Arc::new(RwLock::new(RelevanceResult::default())),
            resource_replies: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            failing: Arc::new(RwLock::new(false)),
            delay: Arc::new(RwLock::new(None)),
            course_calls: Arc::new(RwLock::new(Vec::new())),
            module_calls: Arc::new(RwLock::new(Vec::new())),
            resource_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_course_reply(&self, reply: CourseClassification) {
        *self.course_reply.write().await = reply;
    }

    pub async fn set_module_reply(&self, reply: ModuleClassification) {
        *self.module_reply.write().await = reply;
    }

    /// Reply used for modules without a specific reply.
    pub async fn set_resource_reply(&self, reply: RelevanceResult) {
        *self.resource_reply.write().await = reply;
    }

    pub async fn set_resource_reply_for(&self, module_name: &str, reply: RelevanceResult) {
        self.resource_replies
            .write()
            .await
            .insert(module_name.to_string(), reply);
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: BrainError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// Delay every call by this much.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn course_calls(&self) -> Vec<RecordedClassification> {
        self.course_calls.read().await.clone()
    }

    pub async fn module_calls(&self) -> Vec<RecordedClassification> {
        self.module_calls.read().await.clone()
    }

    pub async fn resource_calls(&self) -> Vec<RecordedScoring> {
        self.resource_calls.read().await.clone()
    }

    async fn before_call(&self) -> Result<(), BrainError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if *self.failing.read().await {
            return Err(BrainError::NotConfigured);
        }
        Ok(())
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[async_trait]
impl Classifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn classify_course(
        &self,
        query: &str,
        catalog_names: &[&str],
    ) -> Result<CourseClassification, BrainError> {
        self.course_calls
            .write()
            .await
            .push((query.to_string(), owned(catalog_names)));
        self.before_call().await?;
        Ok(self.course_reply.read().await.clone())
    }

    async fn classify_modules(
        &self,
        query: &str,
        module_names: &[&str],
    ) -> Result<ModuleClassification, BrainError> {
        self.module_calls
            .write()
            .await
            .push((query.to_string(), owned(module_names)));
        self.before_call().await?;
        Ok(self.module_reply.read().await.clone())
    }

    async fn score_resources(
        &self,
        query: &str,
        items: &[ModuleItem],
        course_name: &str,
        module_name: &str,
    ) -> Result<RelevanceResult, BrainError> {
        self.resource_calls.write().await.push(RecordedScoring {
            query: query.to_string(),
            course_name: course_name.to_string(),
            module_name: module_name.to_string(),
            item_count: items.len(),
        });
        self.before_call().await?;

        if let Some(reply) = self.resource_replies.read().await.get(module_name) {
            return Ok(reply.clone());
        }
        Ok(self.resource_reply.read().await.clone())
    }
}

/// Mock implementation of the ImageDescriber trait.
#[derive(Debug)]
pub struct MockDescriber {
    description: Arc<RwLock<Result<String, String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    calls: Arc<RwLock<Vec<ImageInput>>>,
}

impl MockDescriber {
    /// A describer that always returns `description`.
    pub fn new(description: &str) -> Self {
        Self::with_reply(Ok(description.to_string()))
    }

    /// A describer whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_reply(Err(message.to_string()))
    }

    fn with_reply(reply: Result<String, String>) -> Self {
        Self {
            description: Arc::new(RwLock::new(reply)),
            delay: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn calls(&self) -> Vec<ImageInput> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl ImageDescriber for MockDescriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn describe_image(&self, image: &ImageInput) -> Result<String, BrainError> {
        self.calls.write().await.push(image.clone());
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.description
            .read()
            .await
            .clone()
            .map_err(BrainError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_per_module_reply_overrides_default() {
        let classifier = MockClassifier::new();
        classifier
            .set_resource_reply(RelevanceResult::new(vec![0], vec![0.1]))
            .await;
        classifier
            .set_resource_reply_for("Week 2", RelevanceResult::new(vec![1], vec![0.9]))
            .await;

        let week1 = classifier.score_resources("q", &[], "C", "Week 1").await.unwrap();
        let week2 = classifier.score_resources("q", &[], "C", "Week 2").await.unwrap();
        assert_eq!(week1.resource_indices, vec![0]);
        assert_eq!(week2.resource_indices, vec![1]);
        assert_eq!(classifier.resource_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let classifier = MockClassifier::new();
        classifier.set_failing(true).await;
        assert!(classifier.classify_course("q", &["A"]).await.is_err());
        assert!(classifier.classify_course("q", &["A"]).await.is_err());
        assert_eq!(classifier.course_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_describer() {
        let describer = MockDescriber::failing("vision offline");
        let image = ImageInput::new(vec![1], "image/png");
        let err = describer.describe_image(&image).await.unwrap_err();
        assert!(err.to_string().contains("vision offline"));
        assert_eq!(describer.calls().await.len(), 1);
    }
}
