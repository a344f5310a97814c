use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::{
    auth::AuthUser,
    entities::user,
    errors::ServiceError,
    services::users::{CreateUserInput, UpdateUserInput},
    ApiResponse, ApiResult, AppState,
};

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<user::Model>> {
    let users = state.services.users.list().await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<user::Model> {
    let account = state.services.users.get(id).await?;
    Ok(Json(ApiResponse::success(account)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<Response, ServiceError> {
    let account = state.services.users.create(input).await?;
    Ok(created_response(account))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> ApiResult<user::Model> {
    let account = state.services.users.update(id, input).await?;
    Ok(Json(ApiResponse::success(account)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    if auth_user.user_id == id.to_string() {
        return Err(ServiceError::ValidationError(
            "You cannot delete your own account".to_string(),
        ));
    }
    state.services.users.delete(id).await?;
    Ok(no_content_response())
}
