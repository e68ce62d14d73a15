use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, media::MediaUploader};

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub access: JwtKeys,
    pub refresh: JwtKeys,
    pub access_ttl_secs: usize,
    pub refresh_ttl_days: i64,
    pub db: DatabaseConnection,
    pub uploader: Arc<dyn MediaUploader>,
}

impl AppState {
    pub fn new(
        cfg: &AppConfig,
        db: DatabaseConnection,
        uploader: Arc<dyn MediaUploader>,
    ) -> Arc<Self> {
        Arc::new(Self {
            access: JwtKeys::from_secret(cfg.access_token_secret.as_bytes()),
            refresh: JwtKeys::from_secret(cfg.refresh_token_secret.as_bytes()),
            access_ttl_secs: cfg.access_token_ttl_secs,
            refresh_ttl_days: cfg.refresh_token_ttl_days,
            db,
            uploader,
        })
    }
}
