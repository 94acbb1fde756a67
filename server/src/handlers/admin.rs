//! Admin console handlers: users, agencies and reports

use axum::{
    extract::State,
    Json,
};
use uuid::Uuid;

use crate::accounts::AdminUserUpdate;
use crate::agencies::{AgencyFilter, UpdateAgencyRequest};
use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::handlers::users::UserFilter;
use crate::middleware::auth::AdminUser;
use crate::models::{Ack, Agency, ApiResponse, PaginationParams, PeriodParams, UserResponse};
use crate::reports::{ActivityReport, FinanceSummary};

pub async fn list_users(
    State(app_state): State<AppState>,
    _admin: AdminUser,
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
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = app_state
        .account_service
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(ApiResponse::ok(user.into())))
}

pub async fn update_user(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(request): ValidJson<AdminUserUpdate>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = app_state.account_service.admin_update(id, &request).await?;
    if request.revokes_sessions() {
        app_state.auth_service.revoke_user(id).await;
    }
    tracing::info!(admin_id = %admin.user_id, user_id = %id, "user updated by admin");
    Ok(Json(ApiResponse::ok(user.into())))
}

pub async fn delete_user(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    if id == admin.user_id {
        return Err(ApiError::bad_request("Admins cannot delete their own account"));
    }
    app_state.account_service.delete_user(id).await?;
    app_state.auth_service.revoke_user(id).await;
    tracing::info!(admin_id = %admin.user_id, user_id = %id, "user deleted");
    Ok(Json(ApiResponse::ok(Ack::new("User deleted successfully"))))
}

pub async fn list_agencies(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(filter): ApiQuery<AgencyFilter>,
) -> ApiResult<Json<ApiResponse<Vec<Agency>>>> {
    let agencies = app_state.agency_service.list(filter.status).await?;
    Ok(Json(ApiResponse::ok(agencies)))
}

pub async fn get_agency(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Agency>>> {
    let agency = app_state.agency_service.require(id).await?;
    Ok(Json(ApiResponse::ok(agency)))
}

pub async fn update_agency(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(request): ValidJson<UpdateAgencyRequest>,
) -> ApiResult<Json<ApiResponse<Agency>>> {
    let agency = app_state.agency_service.update(id, &request).await?;

    if request.status.is_some() {
        if let Some(owner) = agency.owner_id {
            app_state
                .notification_service
                .notify_quietly(
                    owner,
                    "Agency status updated",
                    &format!("Your agency is now {:?}.", agency.status),
                )
                .await;
        }
    }

    Ok(Json(ApiResponse::ok(agency)))
}

pub async fn delete_agency(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    app_state.agency_service.delete(id).await?;
    Ok(Json(ApiResponse::ok(Ack::new("Agency deleted successfully"))))
}

/// Platform activity over the last `?days=` days
pub async fn activity_report(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(period): ApiQuery<PeriodParams>,
) -> ApiResult<Json<ApiResponse<ActivityReport>>> {
    let report = app_state.report_service.activity(period.days()).await?;
    Ok(Json(ApiResponse::ok(report)))
}

pub async fn finance_summary(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(period): ApiQuery<PeriodParams>,
) -> ApiResult<Json<ApiResponse<FinanceSummary>>> {
    let summary = app_state.report_service.finance(period.days()).await?;
    Ok(Json(ApiResponse::ok(summary)))
}
