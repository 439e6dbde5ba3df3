use bcrypt::{hash, verify};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::configuration::AdminBootstrap;
use crate::entity::user::{self, Entity as UserEntity, Role};
use crate::model::global_error::AppError;

pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    pub role: Role,
}

pub async fn create_account<C: ConnectionTrait>(
    db: &C,
    account: NewAccount<'_>,
    bcrypt_cost: u32,
) -> Result<user::Model, AppError> {
    let hashed_password = hash(account.password, bcrypt_cost)?;

    let model = user::ActiveModel {
        username: Set(account.username.trim().to_string()),
        email: Set(account.email.trim().to_string()),
        first_name: Set(account.first_name.trim().to_string()),
        last_name: Set(account.last_name.trim().to_string()),
        password: Set(hashed_password),
        role: Set(account.role),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(model)
}

pub async fn find_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<Option<user::Model>, AppError> {
    Ok(UserEntity::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await?)
}

/// Returns the account when the password matches.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>, AppError> {
    let Some(user) = find_by_username(db, username).await? else {
        return Ok(None);
    };

    if verify(password, &user.password)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Creates the configured staff account unless a user with that name exists.
pub async fn ensure_admin<C: ConnectionTrait>(
    db: &C,
    admin: &AdminBootstrap,
    bcrypt_cost: u32,
) -> Result<(), AppError> {
    if find_by_username(db, &admin.username).await?.is_some() {
        return Ok(());
    }

    create_account(
        db,
        NewAccount {
            username: &admin.username,
            email: &admin.email,
            first_name: "",
            last_name: "",
            password: &admin.password,
            role: Role::Staff,
        },
        bcrypt_cost,
    )
    .await?;

    info!(username = %admin.username, "created bootstrap staff account");
    Ok(())
}
