//! Dispute handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::disputes::{CreateDisputeRequest, DisputeFilter, ResolveDisputeRequest};
use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::middleware::auth::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, Dispute, NotificationSeverity, PaginationParams, UserRole};

pub async fn create_dispute(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<CreateDisputeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Dispute>>)> {
    let dispute = app_state
        .dispute_service
        .create(user.user_id, &request)
        .await?;

    match app_state
        .account_service
        .active_user_ids_by_role(UserRole::Admin)
        .await
    {
        Ok(admins) => {
            if let Err(e) = app_state
                .notification_service
                .notify_many(
                    &admins,
                    "New dispute",
                    &format!("Dispute {} was filed and needs review.", dispute.id),
                    NotificationSeverity::Warning,
                )
                .await
            {
                tracing::warn!(dispute_id = %dispute.id, "failed to notify admins: {}", e);
            }
        }
        Err(e) => tracing::warn!(dispute_id = %dispute.id, "failed to load admins: {}", e),
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(dispute))))
}

pub async fn my_disputes(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<Dispute>>>> {
    let disputes = app_state.dispute_service.list_for_user(user.user_id).await?;
    Ok(Json(ApiResponse::ok(disputes)))
}

pub async fn admin_list_disputes(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(filter): ApiQuery<DisputeFilter>,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Dispute>>>> {
    let disputes = app_state
        .dispute_service
        .list(filter.status, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(disputes)))
}

pub async fn admin_get_dispute(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Dispute>>> {
    let dispute = app_state.dispute_service.get(id).await?;
    Ok(Json(ApiResponse::ok(dispute)))
}

pub async fn resolve_dispute(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(request): ValidJson<ResolveDisputeRequest>,
) -> ApiResult<Json<ApiResponse<Dispute>>> {
    let dispute = app_state
        .dispute_service
        .resolve(id, admin.user_id, &request)
        .await?;

    let body = match &dispute.resolution {
        Some(resolution) => format!("Your dispute is now {:?}: {}", dispute.status, resolution),
        None => format!("Your dispute is now {:?}.", dispute.status),
    };
    app_state
        .notification_service
        .notify_quietly(dispute.user_id, "Dispute updated", &body)
        .await;

    Ok(Json(ApiResponse::ok(dispute)))
}
