use std::sync::Arc;

use axum::Router;
use tower_cookies::CookieManagerLayer;

use crate::state::AppState;

pub mod users;

pub const API_PREFIX: &str = "/api/v1";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest(&format!("{API_PREFIX}/users"), users::router(state))
        .layer(CookieManagerLayer::new())
}
