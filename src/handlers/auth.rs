use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::{permissions_for, AuthUser},
    entities::{user, UserRole},
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};

/// The caller's account plus what its role may do.
#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub user: user::Model,
    pub role: UserRole,
    pub permissions: Vec<String>,
}

pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<CurrentUser> {
    let id = Uuid::parse_str(&auth_user.user_id)
        .map_err(|_| ServiceError::Unauthorized("Invalid token subject".to_string()))?;
    let account = state.services.users.get(id).await?;
    Ok(Json(ApiResponse::success(CurrentUser {
        role: account.role,
        permissions: permissions_for(account.role),
        user: account,
    })))
}
