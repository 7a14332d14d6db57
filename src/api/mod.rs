//! HTTP surface: routes and middleware.

use crate::handlers::{self, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Maximum accepted request body (CSV uploads included).
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/top", get(handlers::top_products))
        .route("/products/:id", get(handlers::get_product))
        .route("/ai/ask", post(handlers::ask_product))
        .route("/uploads", post(handlers::upload_csv))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
