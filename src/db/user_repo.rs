use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::db::entities::{prelude::User, user};

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub avatar_url: &'a str,
    pub cover_image_url: &'a str,
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: &Uuid,
) -> Result<Option<user::Model>, sea_orm::DbErr> {
    User::find_by_id(*id).one(db).await
}

/// Match on whichever identity fields are provided.
pub async fn find_by_username_or_email(
    db: &DatabaseConnection,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<user::Model>, sea_orm::DbErr> {
    let mut cond = Condition::any();
    if let Some(username) = username {
        cond = cond.add(user::Column::Username.eq(username.to_lowercase()));
    }
    if let Some(email) = email {
        cond = cond.add(user::Column::Email.eq(email));
    }

    User::find().filter(cond).one(db).await
}

pub async fn create_user(
    db: &DatabaseConnection,
    new: NewUser<'_>,
) -> Result<user::Model, sea_orm::DbErr> {
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(new.username.to_lowercase()),
        email: Set(new.email.to_string()),
        full_name: Set(new.full_name.to_string()),
        password_hash: Set(new.password_hash.to_string()),
        avatar_url: Set(new.avatar_url.to_string()),
        cover_image_url: Set(new.cover_image_url.to_string()),
        refresh_token: Set(None),
        ..Default::default()
    };
    model.insert(db).await
}

/// Partial update: only the refresh-token column is written, no other
/// row validation runs.
pub async fn set_refresh_token(
    db: &DatabaseConnection,
    id: &Uuid,
    token: Option<String>,
) -> Result<(), sea_orm::DbErr> {
    user::ActiveModel {
        id: Set(*id),
        refresh_token: Set(token),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

pub async fn set_password_hash(
    db: &DatabaseConnection,
    id: &Uuid,
    password_hash: &str,
) -> Result<(), sea_orm::DbErr> {
    user::ActiveModel {
        id: Set(*id),
        password_hash: Set(password_hash.to_string()),
        updated_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

pub async fn set_account_details(
    db: &DatabaseConnection,
    id: &Uuid,
    full_name: &str,
    email: &str,
) -> Result<(), sea_orm::DbErr> {
    user::ActiveModel {
        id: Set(*id),
        full_name: Set(full_name.to_string()),
        email: Set(email.to_string()),
        updated_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

pub async fn set_avatar_url(
    db: &DatabaseConnection,
    id: &Uuid,
    url: &str,
) -> Result<(), sea_orm::DbErr> {
    user::ActiveModel {
        id: Set(*id),
        avatar_url: Set(url.to_string()),
        updated_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

pub async fn set_cover_image_url(
    db: &DatabaseConnection,
    id: &Uuid,
    url: &str,
) -> Result<(), sea_orm::DbErr> {
    user::ActiveModel {
        id: Set(*id),
        cover_image_url: Set(url.to_string()),
        updated_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        error::AppError,
        test_helpers::{StaticUploader, test_state},
    };

    fn sample_user<'a>(username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            username,
            email,
            full_name: "Sample User",
            password_hash: "$argon2id$fake",
            avatar_url: "https://media.test/a.png",
            cover_image_url: "",
        }
    }

    // A concurrent register can slip past the service-level duplicate
    // check; the unique constraint must then surface as a conflict.
    #[tokio::test]
    async fn duplicate_insert_surfaces_as_conflict() {
        let state = test_state(Arc::new(StaticUploader::new("https://media.test"))).await;

        create_user(&state.db, sample_user("dup", "dup@x.com"))
            .await
            .unwrap();
        let err = create_user(&state.db, sample_user("dup", "other@x.com"))
            .await
            .unwrap_err();

        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }
}
