//! Notification handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::middleware::auth::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, Notification, PaginationParams};
use crate::notifications::{NotificationFilter, SendNotificationRequest, SendToRoleRequest};

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub message: &'static str,
    pub count: u64,
}

pub async fn list_notifications(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(filter): ApiQuery<NotificationFilter>,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Notification>>>> {
    let notifications = app_state
        .notification_service
        .list(user.user_id, filter.status, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(notifications)))
}

pub async fn mark_read(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Notification>>> {
    let notification = app_state
        .notification_service
        .mark_read(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;
    Ok(Json(ApiResponse::ok(notification)))
}

pub async fn mark_all_read(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<CountResponse>>> {
    let count = app_state
        .notification_service
        .mark_all_read(user.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(CountResponse {
        message: "All notifications marked as read",
        count,
    })))
}

pub async fn send_notification(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ValidJson(request): ValidJson<SendNotificationRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Notification>>)> {
    if app_state
        .account_service
        .get_user(request.user_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("User not found"));
    }

    let notification = app_state
        .notification_service
        .notify(request.user_id, &request.title, &request.body, request.severity)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(notification))))
}

/// Broadcast to every active user with a role
pub async fn send_to_role(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ValidJson(request): ValidJson<SendToRoleRequest>,
) -> ApiResult<Json<ApiResponse<CountResponse>>> {
    let user_ids = app_state
        .account_service
        .active_user_ids_by_role(request.role)
        .await?;
    let count = app_state
        .notification_service
        .notify_many(&user_ids, &request.title, &request.body, request.severity)
        .await?;

    tracing::info!(role = %request.role, count, "notification broadcast");
    Ok(Json(ApiResponse::ok(CountResponse {
        message: "Notifications sent",
        count,
    })))
}
