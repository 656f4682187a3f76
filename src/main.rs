use anyhow::Result;
use std::sync::Arc;

use legalease_backend::{
    app::{self, Collaborators},
    config, db, logging,
    services::{AiClient, PgDocumentStore, RedisCache, ResultCache},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting LegalEase backend"
    );

    let pool = db::create_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    // The result cache is optional; analyses work without it
    let cache: Option<Arc<dyn ResultCache>> = match &settings.redis_url {
        Some(url) => match RedisCache::new(url, settings.redis_cache_ttl_seconds).await {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable - result cache disabled");
                None
            }
        },
        None => {
            tracing::info!("REDIS_URL not set - result cache disabled");
            None
        }
    };

    let ai_client = Arc::new(AiClient::new(
        &settings.ai_service_url,
        &settings.ai_service_token,
        settings.ai_service_timeout_seconds,
    )?);

    // Non-blocking AI service health check
    tokio::spawn({
        let ai_client = Arc::clone(&ai_client);
        async move {
            match ai_client.health_check().await {
                Ok(()) => tracing::info!("AI service is healthy"),
                Err(e) => tracing::warn!(error = %e, "AI service health check failed - will retry on first request"),
            }
        }
    });

    let services = Collaborators {
        analysis: ai_client.clone(),
        drafting: ai_client,
        store: Arc::new(PgDocumentStore::new(pool)),
        cache,
    };

    let state = app::AppState::new(settings.clone(), services);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
