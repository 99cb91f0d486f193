use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, resources};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Search, served under /api/v1 and at the legacy root path
    let search_routes = Router::new()
        .route(
            "/resources",
            get(resources::find_resources).post(resources::upload_resources),
        )
        .with_state(state.clone());

    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .with_state(state)
        .merge(search_routes.clone());

    Router::new()
        .route("/", get(handlers::root))
        .route("/metrics", get(handlers::get_metrics))
        .merge(search_routes)
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
