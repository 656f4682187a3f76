use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Redis result cache (disabled when unset)
    pub redis_url: Option<String>,
    pub redis_cache_ttl_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Auth
    pub auth_jwt_secret: String,
    pub auth_jwt_audience: String,

    // AI Service
    pub ai_service_url: String,
    pub ai_service_token: String,
    pub ai_service_timeout_seconds: u64,

    // Admission control
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_seconds: u64,

    // Request limits
    pub max_text_chars: usize,
    pub max_files: usize,
    pub max_file_bytes: usize,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            server_addr: "0.0.0.0:8080".to_string(),
            database_url: String::new(),
            database_max_connections: 10,
            redis_url: None,
            redis_cache_ttl_seconds: 3600,
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            auth_jwt_secret: String::new(),
            auth_jwt_audience: "authenticated".to_string(),
            ai_service_url: "http://ai-service:8000".to_string(),
            ai_service_token: String::new(),
            ai_service_timeout_seconds: 120,
            rate_limit_max_requests: 10,
            rate_limit_window_seconds: 15 * 60,
            max_text_chars: 100_000,
            max_files: 10,
            max_file_bytes: 10 * 1024 * 1024,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Parse an optional numeric env var, falling back to `default`.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or(defaults.server_addr);

        // Database
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections =
            env_or("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections);

        // Redis
        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty());
        let redis_cache_ttl_seconds =
            env_or("REDIS_CACHE_TTL_SECONDS", defaults.redis_cache_ttl_seconds);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_allow_origins);

        // Auth
        let auth_jwt_secret = env::var("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET must be set")?;
        let auth_jwt_audience =
            env::var("AUTH_JWT_AUDIENCE").unwrap_or(defaults.auth_jwt_audience);

        // AI Service
        let ai_service_url = env::var("AI_SERVICE_URL").unwrap_or(defaults.ai_service_url);
        let ai_service_token =
            env::var("AI_SERVICE_TOKEN").context("AI_SERVICE_TOKEN must be set")?;
        let ai_service_timeout_seconds =
            env_or("AI_SERVICE_TIMEOUT_SECONDS", defaults.ai_service_timeout_seconds);

        // Admission control
        let rate_limit_max_requests =
            env_or("RATE_LIMIT_MAX_REQUESTS", defaults.rate_limit_max_requests);
        let rate_limit_window_seconds =
            env_or("RATE_LIMIT_WINDOW_SECONDS", defaults.rate_limit_window_seconds);

        // Request limits
        let max_text_chars = env_or("MAX_TEXT_CHARS", defaults.max_text_chars);
        let max_files = env_or("MAX_FILES", defaults.max_files);
        let max_file_bytes = env_or("MAX_FILE_BYTES", defaults.max_file_bytes);
        let max_upload_bytes = env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes);

        Ok(Settings {
            env,
            server_addr,
            database_url,
            database_max_connections,
            redis_url,
            redis_cache_ttl_seconds,
            cors_allow_origins,
            auth_jwt_secret,
            auth_jwt_audience,
            ai_service_url,
            ai_service_token,
            ai_service_timeout_seconds,
            rate_limit_max_requests,
            rate_limit_window_seconds,
            max_text_chars,
            max_files,
            max_file_bytes,
            max_upload_bytes,
        })
    }
}
