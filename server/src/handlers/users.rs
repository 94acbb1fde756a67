//! User directory handlers

use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, PaginationParams, UserResponse, UserRole};

#[derive(Debug, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
}

pub async fn list_users(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    ApiQuery(filter): ApiQuery<UserFilter>,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let users = app_state
        .account_service
        .list_users(filter.role, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

pub async fn get_user(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = app_state
        .account_service
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(ApiResponse::ok(user.into())))
}
