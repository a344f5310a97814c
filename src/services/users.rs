use crate::{
    db::DbPool,
    entities::{user, UserRole},
    errors::ServiceError,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::not_blank;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(custom = "not_blank")]
    pub username: String,
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ServiceError> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Back-office accounts.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self) -> Result<Vec<user::Model>, ServiceError> {
        user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, ServiceError> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        input.validate()?;
        if self.find_by_username(&input.username).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username {} is already taken",
                input.username.trim()
            )));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username.trim().to_string()),
            name: Set(input.name.trim().to_string()),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(input.role),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(ServiceError::db_error)?;

        info!(user_id = %created.id, role = %created.role, "User created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateUserInput) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        let mut model: user::ActiveModel = existing.into();
        if let Some(name) = input.name.filter(|n| !n.trim().is_empty()) {
            model.name = Set(name.trim().to_string());
        }
        if let Some(role) = input.role {
            model.role = Set(role);
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        if let Some(password) = input.password {
            model.password_hash = Set(hash_password(&password)?);
        }
        model.updated_at = Set(Utc::now());
        model
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = user::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    /// Checks a username/password pair. Unknown, inactive and wrong-password
    /// logins all fail the same way.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let rejected = || ServiceError::Unauthorized("Invalid username or password".to_string());
        let Some(account) = self.find_by_username(username).await? else {
            return Err(rejected());
        };
        if !account.is_active {
            warn!(username, "Login attempt for inactive user");
            return Err(rejected());
        }
        if !verify_password(password, &account.password_hash)? {
            return Err(rejected());
        }
        Ok(account)
    }

    /// Creates the first administrator when no account exists yet.
    pub async fn ensure_bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<user::Model>, ServiceError> {
        let existing = user::Entity::find()
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if existing > 0 {
            return Ok(None);
        }
        let admin = self
            .create(CreateUserInput {
                username: username.to_string(),
                name: "Administrator".to_string(),
                password: password.to_string(),
                role: UserRole::Admin,
            })
            .await?;
        warn!(username = %admin.username, "Seeded bootstrap administrator; change its password");
        Ok(Some(admin))
    }
}
