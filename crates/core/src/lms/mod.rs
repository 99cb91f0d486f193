//! LMS integration.
//!
//! The cascade only sees the [`LmsClient`] trait. [`CanvasClient`] is the
//! production implementation over the Canvas REST API.

mod canvas;
mod types;

pub use canvas::CanvasClient;
pub use types::*;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the LMS.
#[derive(Debug, Error)]
pub enum LmsError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// LMS returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Read access to the LMS data the cascade needs.
#[async_trait]
pub trait LmsClient: Send + Sync {
    /// Name of this backend for logging.
    fn name(&self) -> &str;

    /// All courses visible to the account. An empty catalog means "no courses".
    async fn fetch_catalog(&self) -> Result<Catalog, LmsError>;

    /// Modules of a course, in LMS order. Empty means "no modules".
    async fn fetch_modules(&self, course_id: CourseId) -> Result<Vec<Module>, LmsError>;

    /// Items of a module, in LMS order.
    async fn fetch_module_items(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<Vec<ModuleItem>, LmsError>;

    /// Download URL for a file content reference, if the LMS has one.
    async fn resolve_file_url(
        &self,
        course_id: CourseId,
        content_ref: u64,
    ) -> Result<Option<String>, LmsError>;
}
