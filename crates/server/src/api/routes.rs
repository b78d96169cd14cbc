use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{campaigns, handlers, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Campaigns
        .route("/campaigns/{id}", get(campaigns::get_campaign))
        .route("/campaigns/{id}/generate-batch", post(campaigns::generate_batch))
        .route("/campaigns/{id}/progress", get(campaigns::get_progress))
        .route("/campaigns/{id}/cancel-batch", post(campaigns::cancel_batch))
        // Items
        .route("/campaigns/{id}/items/{index}", patch(campaigns::update_item))
        .route("/campaigns/{id}/items/{index}/retry", post(campaigns::retry_item))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
