//! Canvas LMS REST client.
//!
//! Uses bearer-token auth against the `/api/v1` endpoints for courses,
//! modules, module items and files.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use super::types::{Catalog, CourseId, ItemType, Module, ModuleId, ModuleItem};
use super::{LmsClient, LmsError};
use crate::config::LmsConfig;

/// Canvas API client.
pub struct CanvasClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    per_page: u32,
    timeout: Duration,
}

impl CanvasClient {
    /// Create a new Canvas client.
    ///
    /// A missing API key is not an error here; every call then fails with
    /// `LmsError::NotConfigured`, which the cascade treats like any other
    /// unavailable collaborator.
    pub fn new(config: &LmsConfig) -> Result<Self, LmsError> {
        let timeout = Duration::from_secs(u64::from(config.timeout_secs));
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            per_page: config.per_page,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LmsError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LmsError::NotConfigured("Canvas API key is not set".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        debug!("Canvas GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LmsError::Timeout(self.timeout)
                } else {
                    LmsError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LmsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LmsError::Parse(format!("{}: {}", path, e)))
    }
}

// Wire types. Canvas returns many more fields; only the ones used are kept.

#[derive(Debug, Deserialize)]
struct CanvasCourse {
    id: Option<CourseId>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CanvasModule {
    id: ModuleId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CanvasModuleItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    content_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CanvasFile {
    #[serde(default)]
    url: Option<String>,
}

impl From<CanvasModule> for Module {
    fn from(m: CanvasModule) -> Self {
        Module::new(m.id, m.name)
    }
}

impl From<CanvasModuleItem> for ModuleItem {
    fn from(item: CanvasModuleItem) -> Self {
        ModuleItem {
            id: item.id,
            title: item.title,
            item_type: item.item_type.map(ItemType::new),
            url: item.html_url,
            content_ref: item.content_id,
        }
    }
}

/// Keep only courses that carry both an id and a name.
fn catalog_from_courses(courses: Vec<CanvasCourse>) -> Catalog {
    courses
        .into_iter()
        .filter_map(|c| match (c.name, c.id) {
            (Some(name), Some(id)) => Some((name, id)),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl LmsClient for CanvasClient {
    fn name(&self) -> &str {
        "canvas"
    }

    async fn fetch_catalog(&self) -> Result<Catalog, LmsError> {
        let courses: Vec<CanvasCourse> = self
            .get_json(
                "/courses",
                &[
                    ("page", "1".to_string()),
                    ("per_page", self.per_page.to_string()),
                ],
            )
            .await?;
        Ok(catalog_from_courses(courses))
    }

    async fn fetch_modules(&self, course_id: CourseId) -> Result<Vec<Module>, LmsError> {
        let modules: Vec<CanvasModule> = self
            .get_json(&format!("/courses/{}/modules", course_id), &[])
            .await?;
        Ok(modules.into_iter().map(Module::from).collect())
    }

    async fn fetch_module_items(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<Vec<ModuleItem>, LmsError> {
        let items: Vec<CanvasModuleItem> = self
            .get_json(
                &format!("/courses/{}/modules/{}/items", course_id, module_id),
                &[("per_page", self.per_page.to_string())],
            )
            .await?;
        Ok(items.into_iter().map(ModuleItem::from).collect())
    }

    async fn resolve_file_url(
        &self,
        course_id: CourseId,
        content_ref: u64,
    ) -> Result<Option<String>, LmsError> {
        let file: CanvasFile = self
            .get_json(&format!("/courses/{}/files/{}", course_id, content_ref), &[])
            .await?;
        Ok(file.url.filter(|u| !u.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_key() -> LmsConfig {
        LmsConfig {
            base_url: "http://127.0.0.1:9/api/v1/".to_string(),
            api_key: Some("${HIVEMIND_TEST_CANVAS_KEY_UNSET}".to_string()),
            per_page: 100,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = CanvasClient::new(&config_without_key()).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9/api/v1");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = CanvasClient::new(&config_without_key()).unwrap();
        let result = client.fetch_catalog().await;
        assert!(matches!(result, Err(LmsError::NotConfigured(_))));
    }

    #[test]
    fn test_catalog_skips_courses_without_name_or_id() {
        let json = r#"[
            {"id": 10, "name": "Calculus I"},
            {"id": 11},
            {"name": "Orphan"},
            {"id": 12, "name": "Linear Algebra", "course_code": "MAT 343"}
        ]"#;
        let courses: Vec<CanvasCourse> = serde_json::from_str(json).unwrap();
        let catalog = catalog_from_courses(courses);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("Calculus I"), Some(10));
        assert_eq!(catalog.get("Linear Algebra"), Some(12));
    }

    #[test]
    fn test_module_item_mapping() {
        let json = r#"{
            "id": 3001,
            "title": "Lecture Slides",
            "type": "File",
            "html_url": "https://canvas.example/items/3001",
            "content_id": 777,
            "indent": 0
        }"#;
        let wire: CanvasModuleItem = serde_json::from_str(json).unwrap();
        let item = ModuleItem::from(wire);

        assert_eq!(item.title.as_deref(), Some("Lecture Slides"));
        assert!(item.item_type.as_ref().unwrap().is_file());
        assert_eq!(item.url.as_deref(), Some("https://canvas.example/items/3001"));
        assert_eq!(item.resolvable_file(), Some(777));
    }

    #[test]
    fn test_module_item_mapping_sparse() {
        let wire: CanvasModuleItem = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        let item = ModuleItem::from(wire);
        assert!(item.title.is_none());
        assert!(item.item_type.is_none());
        assert!(item.url.is_none());
    }
}
