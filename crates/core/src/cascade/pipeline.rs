//! The search pipeline.

use futures::future::join_all;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::course::{CourseResolution, CourseResolver};
use super::events::{DecisionEnvelope, DecisionEvent, OutcomeKind, Stage};
use super::module::ModuleResolver;
use super::observer::{DecisionObserver, TracingObserver};
use super::resource::{RankedModule, RankingScope, Resource, ResourceRanker};
use super::{bounded, CallError};
use crate::brain::{
    create_llm_client, BrainConfig, Classifier, ImageDescriber, LlmClassifier,
    LlmClassifierConfig, UnconfiguredClassifier,
};
use crate::config::Config;
use crate::image::ImageInput;
use crate::lms::{CanvasClient, LmsClient, LmsError, Module};
use crate::metrics;

/// Details attached to the "No courses found" error.
pub const NO_COURSES_DETAILS: &str = "Please check your Canvas API configuration";

/// Result of one search.
///
/// Serializes as the list the HTTP and CLI layers return: the resources, or
/// a single error entry.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Resources sorted by score, highest first.
    Found(Vec<Resource>),
    NoCourses { details: String },
    NoModules { course: String },
    NoResources { query: String, course: String },
}

impl SearchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            SearchOutcome::Found(_) => OutcomeKind::Found,
            SearchOutcome::NoCourses { .. } => OutcomeKind::NoCourses,
            SearchOutcome::NoModules { .. } => OutcomeKind::NoModules,
            SearchOutcome::NoResources { .. } => OutcomeKind::NoResources,
        }
    }

    /// The resources found, empty for the error outcomes.
    pub fn resources(&self) -> &[Resource] {
        match self {
            SearchOutcome::Found(resources) => resources,
            _ => &[],
        }
    }

    /// As a list of entries.
    pub fn to_entries(&self) -> Vec<ResultEntry> {
        match self {
            SearchOutcome::Found(resources) => resources
                .iter()
                .cloned()
                .map(ResultEntry::Resource)
                .collect(),
            SearchOutcome::NoCourses { details } => vec![ResultEntry::Error(ErrorEntry {
                error: "No courses found".to_string(),
                details: Some(details.clone()),
                query: None,
                course: None,
            })],
            SearchOutcome::NoModules { course } => vec![ResultEntry::Error(ErrorEntry {
                error: "No modules found".to_string(),
                details: None,
                query: None,
                course: Some(course.clone()),
            })],
            SearchOutcome::NoResources { query, course } => vec![ResultEntry::Error(ErrorEntry {
                error: "No relevant resources found".to_string(),
                details: None,
                query: Some(query.clone()),
                course: Some(course.clone()),
            })],
        }
    }
}

impl Serialize for SearchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_entries().serialize(serializer)
    }
}

/// One element of a result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultEntry {
    Resource(Resource),
    Error(ErrorEntry),
}

/// The structured error returned in place of resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
}

/// What happened to one selected module.
enum ModuleRun {
    ItemsFailed(CallError),
    Empty,
    Ranked(RankedModule),
}

/// Emits the decisions of one search.
struct Decisions<'a> {
    request_id: Uuid,
    observer: &'a dyn DecisionObserver,
}

impl Decisions<'_> {
    fn emit(&self, event: DecisionEvent) {
        self.observer
            .observe(&DecisionEnvelope::new(self.request_id, event));
    }

    fn failed(&self, stage: Stage, error: &CallError) {
        metrics::COLLABORATOR_FAILURES
            .with_label_values(&[stage.collaborator()])
            .inc();
        self.emit(DecisionEvent::CollaboratorFailed {
            stage,
            error: error.to_string(),
        });
    }

    fn fallback(&self, stage: Stage) {
        metrics::FALLBACKS_TOTAL
            .with_label_values(&[stage.as_str()])
            .inc();
    }
}

/// Runs the course → module → resource cascade.
///
/// Holds no per-search state, so one finder can serve concurrent requests.
pub struct ResourceFinder {
    lms: Arc<dyn LmsClient>,
    classifier: Arc<dyn Classifier>,
    describer: Option<Arc<dyn ImageDescriber>>,
    observer: Arc<dyn DecisionObserver>,
    config: BrainConfig,
}

impl ResourceFinder {
    pub fn new(
        lms: Arc<dyn LmsClient>,
        classifier: Arc<dyn Classifier>,
        config: BrainConfig,
    ) -> Self {
        Self {
            lms,
            classifier,
            describer: None,
            observer: Arc::new(TracingObserver),
            config,
        }
    }

    pub fn with_describer(mut self, describer: Arc<dyn ImageDescriber>) -> Self {
        self.describer = Some(describer);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Build the production finder: Canvas plus the configured model.
    ///
    /// A model client that cannot be built is logged and replaced by the
    /// unconfigured classifier.
    pub fn from_config(config: &Config) -> Result<Self, LmsError> {
        let lms: Arc<dyn LmsClient> = Arc::new(CanvasClient::new(&config.lms)?);
        let brain = config.brain.clone();

        let Some(llm) = &brain.llm else {
            info!("No LLM configured, using heuristic fallbacks only");
            return Ok(Self::new(lms, Arc::new(UnconfiguredClassifier), brain));
        };

        match create_llm_client(llm) {
            Ok(client) => {
                info!(provider = client.provider(), model = client.model(), "LLM classifier enabled");
                let classifier = Arc::new(LlmClassifier::with_config(
                    client,
                    LlmClassifierConfig {
                        max_tokens: llm.max_tokens,
                        ..Default::default()
                    },
                ));
                Ok(Self::new(lms, classifier.clone(), brain).with_describer(classifier))
            }
            Err(e) => {
                warn!("LLM client unavailable, using heuristic fallbacks only: {}", e);
                Ok(Self::new(lms, Arc::new(UnconfiguredClassifier), brain))
            }
        }
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn has_describer(&self) -> bool {
        self.describer.is_some()
    }

    /// Find resources for a question and an optional image.
    ///
    /// Never fails: collaborator errors become fallbacks, and empty data at
    /// any stage becomes one of the error outcomes.
    pub async fn find_resources(&self, query: &str, image: Option<&ImageInput>) -> SearchOutcome {
        let start = Instant::now();
        let decisions = Decisions {
            request_id: Uuid::new_v4(),
            observer: self.observer.as_ref(),
        };

        let outcome = self.run(query, image, &decisions).await;

        let kind = outcome.kind();
        metrics::SEARCHES_TOTAL
            .with_label_values(&[kind.as_str()])
            .inc();
        metrics::SEARCH_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(start.elapsed().as_secs_f64());
        decisions.emit(DecisionEvent::SearchFinished {
            outcome: kind,
            count: outcome.resources().len(),
        });

        outcome
    }

    async fn run(
        &self,
        query: &str,
        image: Option<&ImageInput>,
        decisions: &Decisions<'_>,
    ) -> SearchOutcome {
        let timeout = self.config.call_timeout();
        let query = self.fuse_image(query, image, decisions).await;

        // Courses
        let catalog = match bounded(timeout, self.lms.fetch_catalog()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Failed to fetch courses: {}", e);
                decisions.failed(Stage::Catalog, &e);
                return no_courses();
            }
        };
        debug!("Available courses: {:?}", catalog.names().collect::<Vec<_>>());

        let classifier = self.classifier.as_ref();
        let Some(course) = CourseResolver::new(classifier, timeout)
            .resolve(&query, &catalog)
            .await
        else {
            warn!("No courses found from LMS");
            return no_courses();
        };
        if let Some(e) = &course.classifier_error {
            decisions.failed(Stage::Course, e);
        }
        if course.tier.is_fallback() {
            decisions.fallback(Stage::Course);
        }
        decisions.emit(DecisionEvent::CourseResolved {
            course: course.name.clone(),
            tier: course.tier,
        });

        // Modules
        let modules = match bounded(timeout, self.lms.fetch_modules(course.id)).await {
            Ok(modules) => modules,
            Err(e) => {
                warn!("Failed to fetch modules for {}: {}", course.name, e);
                decisions.failed(Stage::ModuleList, &e);
                Vec::new()
            }
        };
        if modules.is_empty() {
            info!("No modules found for course: {}", course.name);
            return SearchOutcome::NoModules {
                course: course.name,
            };
        }

        let selection = ModuleResolver::new(classifier, timeout, self.config.module_fallback_count)
            .resolve(&query, &modules)
            .await;
        if let Some(e) = &selection.classifier_error {
            decisions.failed(Stage::Modules, e);
        }
        if selection.fallback_used {
            decisions.fallback(Stage::Modules);
        }
        decisions.emit(DecisionEvent::ModulesResolved {
            modules: selection.modules.iter().map(|m| m.name.clone()).collect(),
            fallback_used: selection.fallback_used,
        });

        // Resources
        let runs = if self.config.parallel_modules {
            join_all(
                selection
                    .modules
                    .iter()
                    .map(|module| self.run_module(&query, &course, module)),
            )
            .await
        } else {
            let mut runs = Vec::with_capacity(selection.modules.len());
            for module in &selection.modules {
                runs.push(self.run_module(&query, &course, module).await);
            }
            runs
        };

        let mut resources = Vec::new();
        for (module, run) in selection.modules.iter().zip(runs) {
            match run {
                ModuleRun::ItemsFailed(e) => {
                    warn!("Failed to fetch items for {}: {}", module.name, e);
                    decisions.failed(Stage::Items, &e);
                }
                ModuleRun::Empty => debug!("No items found in module: {}", module.name),
                ModuleRun::Ranked(ranked) => {
                    if let Some(e) = &ranked.classifier_error {
                        decisions.failed(Stage::Resources, e);
                    }
                    for e in &ranked.file_url_errors {
                        decisions.failed(Stage::FileUrl, e);
                    }
                    if ranked.fallback_used {
                        decisions.fallback(Stage::Resources);
                    }
                    decisions.emit(DecisionEvent::ResourcesRanked {
                        module: module.name.clone(),
                        count: ranked.resources.len(),
                        fallback_used: ranked.fallback_used,
                    });
                    resources.extend(ranked.resources);
                }
            }
        }

        if resources.is_empty() {
            info!("No relevant resources found for query: {}", query);
            return SearchOutcome::NoResources {
                query,
                course: course.name,
            };
        }

        sort_by_score(&mut resources);
        info!("Returning {} relevant resources", resources.len());
        SearchOutcome::Found(resources)
    }

    /// Append the image description to the query.
    async fn fuse_image(
        &self,
        query: &str,
        image: Option<&ImageInput>,
        decisions: &Decisions<'_>,
    ) -> String {
        let Some(image) = image.filter(|image| !image.is_empty()) else {
            return query.to_string();
        };
        let Some(describer) = &self.describer else {
            debug!("Image given but no describer configured");
            return query.to_string();
        };

        match bounded(self.config.call_timeout(), describer.describe_image(image)).await {
            Ok(description) if !description.trim().is_empty() => {
                let description = description.trim().to_string();
                let fused = if query.is_empty() {
                    description.clone()
                } else {
                    format!("{} - {}", query, description)
                };
                decisions.emit(DecisionEvent::ImageFused {
                    description,
                    query: fused.clone(),
                });
                fused
            }
            Ok(_) => {
                debug!("Image description was empty");
                query.to_string()
            }
            Err(e) => {
                warn!("Image analysis failed: {}", e);
                decisions.failed(Stage::Image, &e);
                query.to_string()
            }
        }
    }

    async fn run_module(&self, query: &str, course: &CourseResolution, module: &Module) -> ModuleRun {
        let timeout = self.config.call_timeout();
        let items = match bounded(timeout, self.lms.fetch_module_items(course.id, module.id)).await
        {
            Ok(items) => items,
            Err(e) => return ModuleRun::ItemsFailed(e),
        };
        if items.is_empty() {
            return ModuleRun::Empty;
        }
        debug!("Found {} items in module: {}", items.len(), module.name);

        let ranked = ResourceRanker::new(self.classifier.as_ref(), self.lms.as_ref(), timeout)
            .with_fallback(
                self.config.resource_fallback_count,
                self.config.resource_fallback_score,
            )
            .rank(
                query,
                &items,
                RankingScope {
                    course_id: course.id,
                    course_name: &course.name,
                    module_name: &module.name,
                },
            )
            .await;
        ModuleRun::Ranked(ranked)
    }
}

fn no_courses() -> SearchOutcome {
    SearchOutcome::NoCourses {
        details: NO_COURSES_DETAILS.to_string(),
    }
}

/// Stable sort, highest score first. Uses the IEEE total order, so NaN
/// scores cannot break the sort.
fn sort_by_score(resources: &mut [Resource]) {
    resources.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
}
