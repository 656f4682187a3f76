use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub database: String,
    pub cache: String,
    pub ai_service: String,
}

fn status_of(result: &anyhow::Result<()>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "error"
    }
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let services = &state.services;

    let cache_check = async {
        match &services.cache {
            Some(cache) => Some(cache.health_check().await),
            None => None,
        }
    };

    // Check all services in parallel
    let (db_result, cache_result, ai_result) = tokio::join!(
        services.store.health_check(),
        cache_check,
        services.analysis.health_check(),
    );

    let cache_ok = cache_result.as_ref().map_or(true, |r| r.is_ok());

    // Database is critical, the others only degrade the service
    let status = if db_result.is_err() {
        "unhealthy"
    } else if cache_ok && ai_result.is_ok() {
        "healthy"
    } else {
        "degraded"
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                database: status_of(&db_result).to_string(),
                cache: cache_result
                    .as_ref()
                    .map_or("disabled", status_of)
                    .to_string(),
                ai_service: status_of(&ai_result).to_string(),
            },
        }),
    )
}
