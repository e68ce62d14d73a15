use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::Field},
    middleware,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    auth::{
        Claims,
        jwt::{ACCESS_COOKIE, REFRESH_COOKIE, jwt_auth},
    },
    db::entities::user,
    error::AppError,
    response::{ApiResult, JsonApiResponse},
    services::{AuthService, TokenPair, UserService, auth_service::RegisterInput},
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/current-user", get(current_user))
        .route("/change-password", post(change_password))
        .route("/update-account", patch(update_account))
        .route("/update-avatar", patch(update_avatar))
        .route("/update-cover-image", patch(update_cover_image))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}

/// User record with password and refresh-token fields excluded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: String,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub updated_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<user::Model> for UserView {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            avatar_url: model.avatar_url,
            cover_image_url: model.cover_image_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UserView> {
    let form = RegisterForm::read(&mut multipart).await?;

    let service = AuthService::from_state(&state);
    let created = service
        .register(
            state.uploader.as_ref(),
            RegisterInput {
                full_name: &form.full_name,
                username: &form.username,
                email: &form.email,
                password: &form.password,
                avatar_path: form.avatar.as_ref().map(StagedFile::path),
                cover_image_path: form.cover_image.as_ref().map(StagedFile::path),
            },
        )
        .await?;

    JsonApiResponse::created("User registered successfully", created.into())
}

async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let service = AuthService::from_state(&state);
    let (user, tokens) = service
        .login(body.username.as_deref(), body.email.as_deref(), &body.password)
        .await?;

    set_token_cookies(&cookies, &tokens);

    JsonApiResponse::ok(
        "User logged in successfully",
        LoginResponse {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
    )
}

async fn logout(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    claims: Claims,
) -> ApiResult<serde_json::Value> {
    let service = AuthService::from_state(&state);
    service.logout(&claims.sub).await?;

    clear_token_cookies(&cookies);

    JsonApiResponse::ok("User logged out", serde_json::Value::Null)
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<TokenPairResponse> {
    let presented = cookies
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(body)| body.refresh_token))
        .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

    let service = AuthService::from_state(&state);
    let tokens = service.refresh(&presented).await?;

    set_token_cookies(&cookies, &tokens);

    JsonApiResponse::ok("Access token refreshed", tokens.into())
}

async fn current_user(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> ApiResult<UserView> {
    let service = UserService::from_state(&state);
    let user = service.current_user(&claims.sub).await?;
    JsonApiResponse::ok("Current user fetched successfully", user.into())
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<serde_json::Value> {
    let service = UserService::from_state(&state);
    service
        .change_password(&claims.sub, &body.old_password, &body.new_password)
        .await?;
    JsonApiResponse::ok("Password changed successfully", serde_json::Value::Null)
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(body): Json<UpdateAccountRequest>,
) -> ApiResult<UserView> {
    let full_name = body.full_name.unwrap_or_default();
    let email = body.email.unwrap_or_default();

    let service = UserService::from_state(&state);
    let user = service
        .update_account(&claims.sub, &full_name, &email)
        .await?;
    JsonApiResponse::ok("Account details updated successfully", user.into())
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    multipart: Multipart,
) -> ApiResult<UserView> {
    let staged = read_single_file(multipart, "avatar")
        .await?
        .ok_or_else(|| AppError::bad_request("Avatar file is missing"))?;

    let service = UserService::from_state(&state);
    let user = service
        .update_avatar(&claims.sub, state.uploader.as_ref(), staged.path())
        .await?;
    JsonApiResponse::ok("Avatar updated successfully", user.into())
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    multipart: Multipart,
) -> ApiResult<UserView> {
    let staged = read_single_file(multipart, "coverImage")
        .await?
        .ok_or_else(|| AppError::bad_request("Cover image file is missing"))?;

    let service = UserService::from_state(&state);
    let user = service
        .update_cover_image(&claims.sub, state.uploader.as_ref(), staged.path())
        .await?;
    JsonApiResponse::ok("Cover image updated successfully", user.into())
}

fn set_token_cookies(cookies: &Cookies, tokens: &TokenPair) {
    cookies.add(token_cookie(ACCESS_COOKIE, tokens.access_token.clone()));
    cookies.add(token_cookie(REFRESH_COOKIE, tokens.refresh_token.clone()));
}

fn clear_token_cookies(cookies: &Cookies) {
    cookies.remove(token_cookie(ACCESS_COOKIE, String::new()));
    cookies.remove(token_cookie(REFRESH_COOKIE, String::new()));
}

fn token_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie
}

/// A multipart file buffered to a temp path for the upload delegate.
/// The staging file is removed on drop.
struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[derive(Default)]
struct RegisterForm {
    full_name: String,
    username: String,
    email: String,
    password: String,
    avatar: Option<StagedFile>,
    cover_image: Option<StagedFile>,
}

impl RegisterForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::bad_request(err.to_string()))?
        {
            match field.name() {
                Some("fullName") => form.full_name = read_text(field).await?,
                Some("username") => form.username = read_text(field).await?,
                Some("email") => form.email = read_text(field).await?,
                Some("password") => form.password = read_text(field).await?,
                Some("avatar") => form.avatar = stage_file(field).await?,
                Some("coverImage") => form.cover_image = stage_file(field).await?,
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))
}

/// Buffer a file part into the temp dir. An empty part (no file picked
/// in the form) counts as absent.
async fn stage_file(field: Field<'_>) -> Result<Option<StagedFile>, AppError> {
    let bytes = field
        .bytes()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    if bytes.is_empty() {
        return Ok(None);
    }

    let path = std::env::temp_dir().join(format!("tube-upload-{}", Uuid::new_v4()));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|err| AppError::internal(format!("Failed to stage upload: {err}")))?;

    Ok(Some(StagedFile { path }))
}

async fn read_single_file(
    mut multipart: Multipart,
    name: &str,
) -> Result<Option<StagedFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        if field.name() == Some(name) {
            return stage_file(field).await;
        }
    }
    Ok(None)
}
