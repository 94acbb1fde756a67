//! Agency handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::agencies::{AgencyError, RosterEntry, SubscribeRequest};
use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::auth::{AuthenticatedUser, OptionalUser};
use crate::models::{Agency, AgencyStatus, ApiResponse, Subscription, Wallet};

/// Load an agency the caller owns (or any agency, for admins)
async fn managed_agency(
    app_state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> ApiResult<(Agency, Uuid)> {
    let agency = app_state.agency_service.require(id).await?;
    let owner_id = agency.owner_id.ok_or(AgencyError::NoOwner)?;
    user.ensure_self_or_admin(owner_id)?;
    Ok((agency, owner_id))
}

/// Public directory of approved agencies
pub async fn list_agencies(
    State(app_state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Agency>>>> {
    let agencies = app_state
        .agency_service
        .list(Some(AgencyStatus::Approved))
        .await?;
    Ok(Json(ApiResponse::ok(agencies)))
}

/// Unapproved agencies are only visible to their owner and admins
pub async fn get_agency(
    State(app_state): State<AppState>,
    OptionalUser(user): OptionalUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Agency>>> {
    let agency = app_state.agency_service.require(id).await?;
    let visible = agency.status == AgencyStatus::Approved
        || user.is_some_and(|u| u.is_admin() || agency.owner_id == Some(u.user_id));
    if !visible {
        return Err(ApiError::not_found("Agency not found"));
    }
    Ok(Json(ApiResponse::ok(agency)))
}

pub async fn agency_roster(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<RosterEntry>>>> {
    let (agency, _) = managed_agency(&app_state, &user, id).await?;
    let roster = app_state.agency_service.roster(agency.id).await?;
    Ok(Json(ApiResponse::ok(roster)))
}

pub async fn get_subscription(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Option<Subscription>>>> {
    let (agency, _) = managed_agency(&app_state, &user, id).await?;
    let subscription = app_state.agency_service.latest_subscription(&agency).await?;
    Ok(Json(ApiResponse::ok(subscription)))
}

/// Buy a plan; only the owner may pay from their wallet
pub async fn subscribe(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(request): ValidJson<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Subscription>>)> {
    let agency = app_state.agency_service.require(id).await?;
    if agency.owner_id != Some(user.user_id) {
        return Err(ApiError::forbidden("Only the agency owner can subscribe"));
    }

    let subscription = app_state
        .agency_service
        .subscribe(&agency, request.plan)
        .await?;
    app_state
        .notification_service
        .notify_quietly(
            user.user_id,
            "Subscription active",
            "Your agency subscription is now active.",
        )
        .await;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(subscription))))
}

pub async fn agency_wallet(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Wallet>>> {
    let (_, owner_id) = managed_agency(&app_state, &user, id).await?;
    let wallet = app_state.wallet_service.get_or_create(owner_id).await?;
    Ok(Json(ApiResponse::ok(wallet)))
}
