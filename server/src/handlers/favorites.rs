//! Favorites handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiResult;
use crate::extract::{ApiQuery, ValidJson};
use crate::favorites::FavoriteRequest;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Ack, ApiResponse};

pub async fn list_favorites(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<Uuid>>>> {
    let ids = app_state.favorite_service.list(user.user_id).await?;
    Ok(Json(ApiResponse::ok(ids)))
}

pub async fn add_favorite(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<FavoriteRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Ack>>)> {
    app_state
        .favorite_service
        .add(user.user_id, request.target_user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(Ack::new("Added to favorites"))),
    ))
}

pub async fn remove_favorite(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(request): ApiQuery<FavoriteRequest>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    app_state
        .favorite_service
        .remove(user.user_id, request.target_user_id)
        .await?;
    Ok(Json(ApiResponse::ok(Ack::new("Removed from favorites"))))
}
