use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_idle: u32,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: usize,
    pub refresh_token_ttl_days: i64,
    pub media_upload_url: String,
    pub media_upload_preset: String,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        // Load .env if present
        let _ = dotenvy::dotenv();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid u16")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite::memory:".to_string());
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid u32")?;
        let db_min_idle = std::env::var("DB_MIN_IDLE")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<u32>()
            .context("DB_MIN_IDLE must be a valid u32")?;

        let access_token_secret = require_secret("ACCESS_TOKEN_SECRET", "dev-access-change-me")?;
        let refresh_token_secret = require_secret("REFRESH_TOKEN_SECRET", "dev-refresh-change-me")?;

        let access_token_ttl_secs = std::env::var("ACCESS_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<usize>()
            .context("ACCESS_TOKEN_TTL_SECS must be a valid usize")?;
        let refresh_token_ttl_days = std::env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<i64>()
            .context("REFRESH_TOKEN_TTL_DAYS must be a valid i64")?;

        let media_upload_url = std::env::var("MEDIA_UPLOAD_URL")
            .unwrap_or_else(|_| "https://media.invalid/upload".to_string());
        let media_upload_preset =
            std::env::var("MEDIA_UPLOAD_PRESET").unwrap_or_else(|_| "default".to_string());

        let log_level =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".to_string());

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            db_min_idle,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs,
            refresh_token_ttl_days,
            media_upload_url,
            media_upload_preset,
            log_level,
        })
    }
}

fn require_secret(name: &'static str, debug_fallback: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(val) => Ok(val),
        Err(_) if cfg!(debug_assertions) => Ok(debug_fallback.to_string()),
        Err(err) => {
            Err(anyhow::anyhow!(err)).context(format!("{name} is required in release builds"))
        }
    }
}
