//! LLM-powered classifier and image describer.
//!
//! Prompts the model for a JSON object per stage. Replies that do not parse
//! are scanned for names quoted verbatim before giving up.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::brain::llm::{parse_json_reply, CompletionRequest, LlmClient};
use crate::brain::traits::{BrainError, Classifier, ImageDescriber};
use crate::brain::types::{CourseClassification, ModuleClassification, RelevanceResult};
use crate::image::ImageInput;
use crate::lms::ModuleItem;

/// Confidence reported for a course recovered by scanning the reply text.
pub const RECOVERED_COURSE_CONFIDENCE: f32 = 0.7;

/// Most module names taken from a scanned reply.
const MAX_RECOVERED_MODULES: usize = 3;

const SYSTEM_PROMPT: &str = "You are an AI assistant for educational content. \
You help students find course material in their learning management system. \
Reply with a single JSON object and nothing else.";

const IMAGE_PROMPT: &str = "This is an educational image. Please analyze it and extract the main \
learning concept or topic being illustrated. Describe what subject area this relates to and any \
key terminology visible in the image. Give your response as a detailed query that I could use to \
find learning resources about this topic.";

/// Configuration for the LLM classifier.
#[derive(Debug, Clone)]
pub struct LlmClassifierConfig {
    /// Maximum tokens for each reply.
    pub max_tokens: u32,
    /// Temperature for generation.
    pub temperature: f32,
}

impl Default for LlmClassifierConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Classifier backed by any [`LlmClient`].
pub struct LlmClassifier<C: LlmClient + ?Sized> {
    client: Arc<C>,
    config: LlmClassifierConfig,
}

impl<C: LlmClient + ?Sized> LlmClassifier<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            config: LlmClassifierConfig::default(),
        }
    }

    pub fn with_config(client: Arc<C>, config: LlmClassifierConfig) -> Self {
        Self { client, config }
    }

    async fn ask(&self, prompt: String) -> Result<String, BrainError> {
        let request = CompletionRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let response = self.client.complete(request).await?;
        debug!(
            provider = self.client.provider(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LLM reply received"
        );
        Ok(response.text)
    }
}

fn bullet_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("- {}", name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn course_prompt(query: &str, catalog_names: &[&str]) -> String {
    format!(
        r#"A student has the following question:

"{query}"

Based on this question, which of the following courses is the student most likely referring to?
Be very specific in your match and don't default to the first course unless absolutely necessary.
Look for subject matter keywords in the query and match them to the course titles.

Provide your answer as a JSON object with the fields:
- course_name: The name of the most relevant course (MUST exactly match one of the provided course names)
- confidence: A score from 0-1 indicating your confidence
- reasoning: A brief explanation of why you chose this course

Available courses:
{courses}"#,
        query = query,
        courses = bullet_list(catalog_names.iter().copied()),
    )
}

fn module_prompt(query: &str, module_names: &[&str]) -> String {
    format!(
        r#"A student has the following question:

"{query}"

Based on this question, which of the following modules in the course are most relevant?
Return a JSON object with:
- module_names: An array of names of the most relevant modules (maximum 3)
- relevance_explanations: Brief explanation for each module's relevance

Available modules:
{modules}"#,
        query = query,
        modules = bullet_list(module_names.iter().copied()),
    )
}

fn resource_prompt(query: &str, items: &[ModuleItem], course_name: &str, module_name: &str) -> String {
    let resources = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "[{}] {} (Type: {})",
                i,
                item.title.as_deref().unwrap_or("Untitled"),
                item.item_type.as_ref().map(|t| t.as_str()).unwrap_or("Unknown"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"A student has the following question:

"{query}"

This question relates to the course "{course_name}" in the module "{module_name}".

Based on this question, which of the following resources would be most helpful to the student?
Return a JSON object with:
- resource_indices: An array of indices (0-based) of the most relevant resources (maximum 5)
- relevance_scores: An array of relevance scores (0-1) corresponding to each resource
- reasoning: Brief explanation of why these resources are relevant

Available resources:
{resources}"#
    )
}

/// First name, in the given order, that the reply mentions verbatim.
fn scan_for_course(reply: &str, names: &[&str]) -> Option<String> {
    let reply = reply.to_lowercase();
    names
        .iter()
        .find(|name| !name.is_empty() && reply.contains(&name.to_lowercase()))
        .map(|name| name.to_string())
}

/// Every name the reply mentions verbatim, in the given order.
fn scan_for_modules(reply: &str, names: &[&str]) -> Vec<String> {
    let reply = reply.to_lowercase();
    names
        .iter()
        .filter(|name| !name.is_empty() && reply.contains(&name.to_lowercase()))
        .take(MAX_RECOVERED_MODULES)
        .map(|name| name.to_string())
        .collect()
}

#[async_trait]
impl<C: LlmClient + ?Sized> Classifier for LlmClassifier<C> {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify_course(
        &self,
        query: &str,
        catalog_names: &[&str],
    ) -> Result<CourseClassification, BrainError> {
        let reply = self.ask(course_prompt(query, catalog_names)).await?;

        match parse_json_reply::<CourseClassification>(&reply) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!("Course reply did not parse, scanning text: {}", e);
                scan_for_course(&reply, catalog_names)
                    .map(|name| CourseClassification {
                        course_name: Some(name),
                        confidence: RECOVERED_COURSE_CONFIDENCE,
                        reasoning: "Extracted from response".to_string(),
                    })
                    .ok_or_else(|| BrainError::Parse(e.to_string()))
            }
        }
    }

    async fn classify_modules(
        &self,
        query: &str,
        module_names: &[&str],
    ) -> Result<ModuleClassification, BrainError> {
        let reply = self.ask(module_prompt(query, module_names)).await?;

        match parse_json_reply::<ModuleClassification>(&reply) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!("Module reply did not parse, scanning text: {}", e);
                let found = scan_for_modules(&reply, module_names);
                if found.is_empty() {
                    return Err(BrainError::Parse(e.to_string()));
                }
                let explanations = vec!["Extracted from response".to_string(); found.len()];
                Ok(ModuleClassification {
                    module_names: found,
                    relevance_explanations: explanations,
                })
            }
        }
    }

    async fn score_resources(
        &self,
        query: &str,
        items: &[ModuleItem],
        course_name: &str,
        module_name: &str,
    ) -> Result<RelevanceResult, BrainError> {
        let reply = self
            .ask(resource_prompt(query, items, course_name, module_name))
            .await?;

        parse_json_reply::<RelevanceResult>(&reply).map_err(|e| BrainError::Parse(e.to_string()))
    }
}

#[async_trait]
impl<C: LlmClient + ?Sized> ImageDescriber for LlmClassifier<C> {
    fn name(&self) -> &str {
        "llm"
    }

    async fn describe_image(&self, image: &ImageInput) -> Result<String, BrainError> {
        let request = CompletionRequest::new(IMAGE_PROMPT)
            .with_image(image.clone())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let response = self.client.complete(request).await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(BrainError::Parse("empty image description".to_string()));
        }
        Ok(text.to_string())
    }
}
