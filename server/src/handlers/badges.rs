//! Verification badge handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::badges::{BadgeQuery, BadgeSummary, CreateBadgeRequest, UpdateBadgeRequest};
use crate::error::ApiResult;
use crate::extract::{ApiMultiQuery, ApiPath, ValidJson};
use crate::middleware::auth::AdminUser;
use crate::models::{ApiResponse, VerificationBadge};

/// Badges for `?user_ids=a&user_ids=b`
pub async fn list_badges(
    State(app_state): State<AppState>,
    ApiMultiQuery(query): ApiMultiQuery<BadgeQuery>,
) -> ApiResult<Json<ApiResponse<Vec<BadgeSummary>>>> {
    let badges = app_state.badge_service.for_users(&query.user_ids).await?;
    Ok(Json(ApiResponse::ok(
        badges.into_iter().map(BadgeSummary::from).collect(),
    )))
}

pub async fn create_badge(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ValidJson(request): ValidJson<CreateBadgeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<VerificationBadge>>)> {
    let badge = app_state.badge_service.create(&request).await?;
    tracing::info!(badge_id = %badge.id, user_id = %badge.user_id, "badge created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(badge))))
}

pub async fn update_badge(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(request): ValidJson<UpdateBadgeRequest>,
) -> ApiResult<Json<ApiResponse<VerificationBadge>>> {
    let badge = app_state
        .badge_service
        .set_status(id, request.status)
        .await?;
    Ok(Json(ApiResponse::ok(badge)))
}
