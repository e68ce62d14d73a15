use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::Router;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::{
    config::AppConfig,
    media::{MediaUploader, UploadError, UploadedMedia},
    routes::router,
    state::AppState,
};

/// Uploader that maps a staged file to a deterministic hosted URL.
pub struct StaticUploader {
    pub base_url: String,
}

impl StaticUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MediaUploader for StaticUploader {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, UploadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(UploadedMedia {
            url: format!("{}/{name}", self.base_url),
        })
    }
}

/// Uploader that always fails, for exercising the upload error paths.
pub struct FailingUploader;

#[async_trait]
impl MediaUploader for FailingUploader {
    async fn upload(&self, _path: &Path) -> Result<UploadedMedia, UploadError> {
        Err(UploadError::Rejected("upload returned status 500".into()))
    }
}

/// Uploader that fails only the nth call (1-based), for exercising
/// partial-failure paths such as a cover image upload going down after
/// the avatar upload succeeded.
pub struct FailNthUploader {
    inner: StaticUploader,
    fail_call: usize,
    calls: AtomicUsize,
}

impl FailNthUploader {
    pub fn new(fail_call: usize) -> Self {
        Self {
            inner: StaticUploader::new("https://media.test"),
            fail_call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaUploader for FailNthUploader {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, UploadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_call {
            return Err(UploadError::Rejected("upload returned status 500".into()));
        }
        self.inner.upload(path).await
    }
}

pub async fn test_state(uploader: Arc<dyn MediaUploader>) -> Arc<AppState> {
    let db = test_db().await;
    let mut cfg = AppConfig::from_env().expect("load app config");
    cfg.access_token_secret = "test-access-secret".to_string();
    cfg.refresh_token_secret = "test-refresh-secret".to_string();
    AppState::new(&cfg, db, uploader)
}

pub async fn test_router() -> Router {
    test_router_with_uploader(Arc::new(StaticUploader::new("https://media.test"))).await
}

pub async fn test_router_with_uploader(uploader: Arc<dyn MediaUploader>) -> Router {
    let state = test_state(uploader).await;
    router(state)
}

async fn test_db() -> DatabaseConnection {
    // Single connection keeps the in-memory database alive and shared.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await.expect("connect to sqlite");
    db.get_schema_registry("tube_server::db::entities::*")
        .sync(&db)
        .await
        .expect("sync schema");
    db
}
