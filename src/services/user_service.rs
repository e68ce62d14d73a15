use std::path::Path;

use uuid::Uuid;

use crate::{
    auth::password::{hash_password, verify_password},
    db::{entities::user, user_repo},
    error::AppError,
    media::MediaUploader,
    state::AppState,
};

#[derive(Clone)]
pub struct UserService {
    db: sea_orm::DatabaseConnection,
}

impl UserService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    pub async fn current_user(&self, user_id: &Uuid) -> Result<user::Model, AppError> {
        user_repo::find_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn change_password(
        &self,
        user_id: &Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if old_password.trim().is_empty() || new_password.trim().is_empty() {
            return Err(AppError::bad_request("All fields are required"));
        }

        let user = self.current_user(user_id).await?;
        if !verify_password(old_password, &user.password_hash)? {
            return Err(AppError::bad_request("Invalid old password"));
        }

        let hash = hash_password(new_password)?;
        user_repo::set_password_hash(&self.db, user_id, &hash).await?;
        Ok(())
    }

    pub async fn update_account(
        &self,
        user_id: &Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<user::Model, AppError> {
        if full_name.trim().is_empty() || email.trim().is_empty() {
            return Err(AppError::bad_request("All fields are required"));
        }

        let email = email.trim();
        if let Some(existing) =
            user_repo::find_by_username_or_email(&self.db, None, Some(email)).await?
            && existing.id != *user_id
        {
            return Err(AppError::conflict("Email is already in use"));
        }

        user_repo::set_account_details(&self.db, user_id, full_name.trim(), email).await?;
        self.current_user(user_id).await
    }

    pub async fn update_avatar(
        &self,
        user_id: &Uuid,
        uploader: &dyn MediaUploader,
        path: &Path,
    ) -> Result<user::Model, AppError> {
        let media = uploader.upload(path).await?;
        user_repo::set_avatar_url(&self.db, user_id, &media.url).await?;
        self.current_user(user_id).await
    }

    pub async fn update_cover_image(
        &self,
        user_id: &Uuid,
        uploader: &dyn MediaUploader,
        path: &Path,
    ) -> Result<user::Model, AppError> {
        let media = uploader.upload(path).await?;
        user_repo::set_cover_image_url(&self.db, user_id, &media.url).await?;
        self.current_user(user_id).await
    }
}
