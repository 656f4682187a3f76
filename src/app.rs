use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::middleware::{request_id_layer, stamp_error_request_id, X_REQUEST_ID};
use crate::pipeline::{
    AnalysisOrchestrator, DraftComposer, RateLimiter, SecurityValidator, ValidationLimits,
};
use crate::routes;
use crate::services::{AnalysisService, DocumentStore, DraftingService, ResultCache};

/// External collaborators the application is wired with.
#[derive(Clone)]
pub struct Collaborators {
    pub analysis: Arc<dyn AnalysisService>,
    pub drafting: Arc<dyn DraftingService>,
    pub store: Arc<dyn DocumentStore>,
    pub cache: Option<Arc<dyn ResultCache>>,
}

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub verifier: TokenVerifier,
    pub orchestrator: AnalysisOrchestrator,
    pub composer: DraftComposer,
    pub services: Collaborators,
}

impl AppState {
    pub fn new(settings: Settings, services: Collaborators) -> Arc<Self> {
        let limiter = RateLimiter::with_system_clock(
            settings.rate_limit_max_requests,
            Duration::from_secs(settings.rate_limit_window_seconds),
        );
        Self::with_limiter(settings, services, limiter)
    }

    /// Same as [`AppState::new`] with a caller-provided limiter, e.g. one
    /// driven by a manual clock.
    pub fn with_limiter(settings: Settings, services: Collaborators, limiter: RateLimiter) -> Arc<Self> {
        let verifier = TokenVerifier::new(&settings.auth_jwt_secret, &settings.auth_jwt_audience);

        let mut orchestrator = AnalysisOrchestrator::new(
            SecurityValidator::new(ValidationLimits::from(&settings)),
            Arc::new(limiter),
            Arc::clone(&services.analysis),
            Arc::clone(&services.store),
        );
        if let Some(cache) = &services.cache {
            orchestrator = orchestrator.with_cache(Arc::clone(cache));
        }

        let composer = DraftComposer::new(Arc::clone(&services.drafting));

        Arc::new(Self {
            settings,
            verifier,
            orchestrator,
            composer,
            services,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Build trace layer (use DEBUG for spans to reduce overhead at INFO level)
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(axum::middleware::from_fn(stamp_error_request_id))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Longer preflight cache in development to cut OPTIONS requests
    let max_age = if settings.env.is_dev() {
        Duration::from_secs(86400)
    } else {
        Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static(X_REQUEST_ID),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}
