use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use tower_cookies::Cookies;
use uuid::Uuid;

use super::Claims;
use crate::{
    error::AppError,
    state::{AppState, JwtKeys},
};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn now_unix() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

pub fn make_claims(user_id: &Uuid, ttl_secs: usize) -> Claims {
    let iat = now_unix();
    Claims {
        sub: *user_id,
        iat,
        exp: iat + ttl_secs,
    }
}

pub fn encode_token(keys: &JwtKeys, claims: &Claims) -> Result<String, AppError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc)
        .map_err(|_| AppError::internal("Token encoding failed"))
}

pub fn decode_token(keys: &JwtKeys, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &keys.dec, &validation).map(|data| data.claims)
}

/// Access-token guard: accepts a bearer header or the `accessToken` cookie.
pub async fn jwt_auth(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .or_else(|| cookies.get(ACCESS_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| {
            AppError::unauthorized("Missing access token").into_response()
        })?;

    let claims = decode_token(&state.access, &token).map_err(|_| {
        AppError::unauthorized("Invalid or expired access token").into_response()
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
