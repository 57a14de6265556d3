//! User management endpoints. These are operator-facing; end users never
//! call them directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::config::AppState;
use crate::dto::{CreateUserRequest, UserResponse};
use crate::error::AdminError;

/// POST /users
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AdminError> {
    let user = state
        .users
        .create_user(&req.username, &req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users/:user_id
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AdminError> {
    let user = state
        .users
        .get_user(user_id)
        .await?
        .ok_or(AdminError::NotFound("user"))?;

    Ok(Json(user.into()))
}

/// POST /users/:user_id/deactivate
pub async fn deactivate_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AdminError> {
    let user = state.users.deactivate_user(user_id).await?;
    Ok(Json(user.into()))
}
