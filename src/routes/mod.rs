pub mod analysis;
pub mod documents;
pub mod health;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Analysis (anonymous or authenticated)
        .route("/analyze", post(analysis::analyze))
        .route("/analyze/upload", post(analysis::analyze_upload))
        .route("/draft", post(analysis::draft))
        // Protected routes
        .route("/documents", get(documents::list_documents))
}
