use std::path::Path;

use uuid::Uuid;

use crate::{
    auth::{
        jwt::{decode_token, encode_token, make_claims},
        password::{hash_password, verify_password},
    },
    db::{entities::user, user_repo},
    error::AppError,
    media::MediaUploader,
    state::{AppState, JwtKeys},
};

const SECS_PER_DAY: usize = 24 * 60 * 60;

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct RegisterInput<'a> {
    pub full_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub avatar_path: Option<&'a Path>,
    pub cover_image_path: Option<&'a Path>,
}

#[derive(Clone)]
pub struct AuthService {
    db: sea_orm::DatabaseConnection,
    access: JwtKeys,
    refresh: JwtKeys,
    access_ttl_secs: usize,
    refresh_ttl_days: i64,
}

impl AuthService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            access: state.access.clone(),
            refresh: state.refresh.clone(),
            access_ttl_secs: state.access_ttl_secs,
            refresh_ttl_days: state.refresh_ttl_days,
        }
    }

    /// Credential issuer: signs an access/refresh pair and persists the
    /// refresh token on the user row as the single active value.
    pub async fn issue_tokens(&self, user_id: &Uuid) -> Result<TokenPair, AppError> {
        let user = user_repo::find_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| AppError::internal("Token issue failed: user record missing"))?;

        let access_token = encode_token(&self.access, &make_claims(&user.id, self.access_ttl_secs))?;
        let refresh_ttl_secs = self.refresh_ttl_days as usize * SECS_PER_DAY;
        let refresh_token = encode_token(&self.refresh, &make_claims(&user.id, refresh_ttl_secs))?;

        user_repo::set_refresh_token(&self.db, &user.id, Some(refresh_token.clone())).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub async fn register(
        &self,
        uploader: &dyn MediaUploader,
        input: RegisterInput<'_>,
    ) -> Result<user::Model, AppError> {
        let full_name = input.full_name.trim();
        let username = input.username.trim();
        let email = input.email.trim();
        // The password is validated trimmed but hashed exactly as given.
        let password = input.password;

        if [full_name, username, email, password.trim()]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(AppError::bad_request("All fields are required"));
        }

        if user_repo::find_by_username_or_email(&self.db, Some(username), Some(email))
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "User with email or username already exists",
            ));
        }

        let avatar_path = input
            .avatar_path
            .ok_or_else(|| AppError::bad_request("Avatar file is required"))?;

        let avatar = uploader.upload(avatar_path).await?;

        // Cover image is optional; a failed upload degrades to an empty value.
        let cover_image_url = match input.cover_image_path {
            Some(path) => match uploader.upload(path).await {
                Ok(media) => media.url,
                Err(err) => {
                    tracing::warn!("cover image upload failed: {err}");
                    String::new()
                }
            },
            None => String::new(),
        };

        let password_hash = hash_password(password)?;
        let created = user_repo::create_user(
            &self.db,
            user_repo::NewUser {
                username,
                email,
                full_name,
                password_hash: &password_hash,
                avatar_url: &avatar.url,
                cover_image_url: &cover_image_url,
            },
        )
        .await?;

        user_repo::find_by_id(&self.db, &created.id)
            .await?
            .ok_or_else(|| AppError::internal("Something went wrong while registering the user"))
    }

    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
    ) -> Result<(user::Model, TokenPair), AppError> {
        // At least one identity field, not necessarily both. A blank
        // field counts as absent.
        let username = username.map(str::trim).filter(|u| !u.is_empty());
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if username.is_none() && email.is_none() {
            return Err(AppError::bad_request("Username or email is required"));
        }

        let user = user_repo::find_by_username_or_email(&self.db, username, email)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::unauthorized("Invalid user credentials"));
        }

        let tokens = self.issue_tokens(&user.id).await?;

        // Re-read so the returned record reflects the stored refresh token state.
        let user = user_repo::find_by_id(&self.db, &user.id)
            .await?
            .ok_or_else(|| AppError::internal("User record missing after login"))?;

        Ok((user, tokens))
    }

    pub async fn logout(&self, user_id: &Uuid) -> Result<(), AppError> {
        user_repo::set_refresh_token(&self.db, user_id, None).await?;
        Ok(())
    }

    /// Rotation: verify the presented token, check it against the stored
    /// value, and issue a fresh pair. A rotated-out or post-logout token
    /// never matches and is rejected.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AppError> {
        let claims = decode_token(&self.refresh, presented)
            .map_err(|err| AppError::unauthorized(err.to_string()))?;

        let user = user_repo::find_by_id(&self.db, &claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

        if user.refresh_token.as_deref() != Some(presented) {
            return Err(AppError::unauthorized("Refresh token is expired or used"));
        }

        self.issue_tokens(&user.id).await
    }
}
