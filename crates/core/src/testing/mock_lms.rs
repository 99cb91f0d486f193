//! Mock LMS client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::lms::{Catalog, CourseId, LmsClient, LmsError, Module, ModuleId, ModuleItem};

/// Mock implementation of the LmsClient trait.
///
/// Provides controllable behavior for testing:
/// - Serve a configured catalog, module lists and module items
/// - Track calls for assertions
/// - Simulate failures and delays
///
/// # Example
///
/// ```rust,ignore
/// use hivemind_core::testing::{MockLms, fixtures};
///
/// let lms = MockLms::new();
/// lms.set_catalog(fixtures::sample_catalog()).await;
/// lms.set_modules(11, fixtures::weeks(2)).await;
/// lms.set_items(11, 1, vec![fixtures::page_item(100, "Syllabus")]).await;
///
/// let modules = lms.fetch_modules(11).await?;
/// assert_eq!(lms.module_calls().await, vec![11]);
/// ```
#[derive(Debug)]
pub struct MockLms {
    catalog: Arc<RwLock<Catalog>>,
    modules: Arc<RwLock<HashMap<CourseId, Vec<Module>>>>,
    items: Arc<RwLock<HashMap<(CourseId, ModuleId), Vec<ModuleItem>>>>,
    file_urls: Arc<RwLock<HashMap<u64, String>>>,
    /// Modules whose item fetch always fails.
    failing_modules: Arc<RwLock<HashSet<ModuleId>>>,
    /// If set, the next call of any kind fails with this error.
    next_error: Arc<RwLock<Option<LmsError>>>,
    /// Delay applied to every call.
    delay: Arc<RwLock<Option<Duration>>>,
    catalog_calls: Arc<RwLock<usize>>,
    module_calls: Arc<RwLock<Vec<CourseId>>>,
    item_calls: Arc<RwLock<Vec<(CourseId, ModuleId)>>>,
    file_url_calls: Arc<RwLock<Vec<(CourseId, u64)>>>,
}

impl Default for MockLms {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLms {
    /// Create a new mock LMS with no courses.
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Catalog::new())),
            modules: Arc::new(RwLock::new(HashMap::new())),
            items: Arc::new(RwLock::new(HashMap::new())),
            file_urls: Arc::new(RwLock::new(HashMap::new())),
            failing_modules: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
            catalog_calls: Arc::new(RwLock::new(0)),
            module_calls: Arc::new(RwLock::new(Vec::new())),
            item_calls: Arc::new(RwLock::new(Vec::new())),
            file_url_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_catalog(&self, catalog: Catalog) {
        *self.catalog.write().await = catalog;
    }

    pub async fn set_modules(&self, course_id: CourseId, modules: Vec<Module>) {
        self.modules.write().await.insert(course_id, modules);
    }

    pub async fn set_items(&self, course_id: CourseId, module_id: ModuleId, items: Vec<ModuleItem>) {
        self.items.write().await.insert((course_id, module_id), items);
    }

    pub async fn set_file_url(&self, content_ref: u64, url: &str) {
        self.file_urls
            .write()
            .await
            .insert(content_ref, url.to_string());
    }

    /// Make every item fetch for this module fail.
    pub async fn fail_items(&self, module_id: ModuleId) {
        self.failing_modules.write().await.insert(module_id);
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: LmsError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every call by this much.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn catalog_calls(&self) -> usize {
        *self.catalog_calls.read().await
    }

    pub async fn module_calls(&self) -> Vec<CourseId> {
        self.module_calls.read().await.clone()
    }

    pub async fn item_calls(&self) -> Vec<(CourseId, ModuleId)> {
        self.item_calls.read().await.clone()
    }

    pub async fn file_url_calls(&self) -> Vec<(CourseId, u64)> {
        self.file_url_calls.read().await.clone()
    }

    /// Apply the delay, then take the injected error if set.
    async fn before_call(&self) -> Result<(), LmsError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LmsClient for MockLms {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_catalog(&self) -> Result<Catalog, LmsError> {
        *self.catalog_calls.write().await += 1;
        self.before_call().await?;
        Ok(self.catalog.read().await.clone())
    }

    async fn fetch_modules(&self, course_id: CourseId) -> Result<Vec<Module>, LmsError> {
        self.module_calls.write().await.push(course_id);
        self.before_call().await?;
        Ok(self
            .modules
            .read()
            .await
            .get(&course_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_module_items(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<Vec<ModuleItem>, LmsError> {
        self.item_calls.write().await.push((course_id, module_id));
        self.before_call().await?;
        if self.failing_modules.read().await.contains(&module_id) {
            return Err(LmsError::Api {
                status: 500,
                message: format!("module {} unavailable", module_id),
            });
        }
        Ok(self
            .items
            .read()
            .await
            .get(&(course_id, module_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_file_url(
        &self,
        course_id: CourseId,
        content_ref: u64,
    ) -> Result<Option<String>, LmsError> {
        self.file_url_calls
            .write()
            .await
            .push((course_id, content_ref));
        self.before_call().await?;
        Ok(self.file_urls.read().await.get(&content_ref).cloned())
    }
}
