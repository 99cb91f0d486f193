//! Resource search handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use hivemind_core::{image::DEFAULT_IMAGE_MIME, ImageInput, SearchOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::IMAGES_RECEIVED_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ResourcesQuery {
    #[serde(default)]
    pub query: Option<String>,
    /// Path of an image on the server's filesystem.
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

const MISSING_INPUT: &str = "Either query or image_path must be provided";

fn bad_request(error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/resources
///
/// Find resources for a query and/or an image already on disk. A missing
/// image file is ignored with a warning.
pub async fn find_resources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResourcesQuery>,
) -> Result<Json<SearchOutcome>, impl IntoResponse> {
    let query = non_empty(params.query);
    let image_path = non_empty(params.image_path).map(PathBuf::from);

    if query.is_none() && image_path.is_none() {
        return Err(bad_request(MISSING_INPUT));
    }
    info!(query = ?query, image_path = ?image_path, "Processing resource query");

    let image = match image_path {
        Some(path) if path.exists() => match ImageInput::from_path(&path).await {
            Ok(image) => {
                IMAGES_RECEIVED_TOTAL.with_label_values(&["path"]).inc();
                Some(image)
            }
            Err(e) => {
                warn!("Failed to read image {:?}: {}", path, e);
                None
            }
        },
        Some(path) => {
            warn!("Image path does not exist: {:?}", path);
            None
        }
        None => None,
    };

    let outcome = state
        .finder()
        .find_resources(query.as_deref().unwrap_or_default(), image.as_ref())
        .await;
    Ok(Json(outcome))
}

/// POST /api/v1/resources
///
/// Multipart form with a `query` text field and an optional `image` file
/// field. The image mime type comes from the part, defaulting to PNG.
pub async fn upload_resources(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SearchOutcome>, impl IntoResponse> {
    let mut query: Option<String> = None;
    let mut image: Option<ImageInput> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(bad_request(format!("Invalid multipart body: {}", e))),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "query" => match field.text().await {
                Ok(text) => query = non_empty(Some(text)),
                Err(e) => return Err(bad_request(format!("Failed to read query: {}", e))),
            },
            "image" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_IMAGE_MIME)
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) if !bytes.is_empty() => {
                        image = Some(ImageInput::new(bytes.to_vec(), mime_type));
                    }
                    Ok(_) => warn!("Ignoring empty image upload"),
                    Err(e) => return Err(bad_request(format!("Failed to read image: {}", e))),
                }
            }
            other => warn!("Ignoring unknown form field: {}", other),
        }
    }

    if query.is_none() && image.is_none() {
        return Err(bad_request("Either query or image must be provided"));
    }
    if image.is_some() {
        IMAGES_RECEIVED_TOTAL.with_label_values(&["upload"]).inc();
    }

    let outcome = state
        .finder()
        .find_resources(query.as_deref().unwrap_or_default(), image.as_ref())
        .await;
    Ok(Json(outcome))
}
