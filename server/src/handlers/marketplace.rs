//! Marketplace handlers

use std::collections::BTreeMap;

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
use crate::marketplace::{CommissionUpdate, SurrogateListing, UnlockRequest};
use crate::middleware::auth::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, CommissionSetting, MarketplaceUnlock, PaginationParams};

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub message: &'static str,
    pub unlock: MarketplaceUnlock,
}

pub async fn list_surrogates(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<SurrogateListing>>>> {
    let listings = app_state
        .marketplace_service
        .list_surrogates(user.user_id, user.is_admin(), page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(listings)))
}

pub async fn get_surrogate(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<SurrogateListing>>> {
    let listing = app_state
        .marketplace_service
        .get_surrogate(user.user_id, user.is_admin(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Surrogate not found"))?;
    Ok(Json(ApiResponse::ok(listing)))
}

pub async fn list_unlocks(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<String>>>> {
    let ids = app_state.marketplace_service.list_unlocks(user.user_id).await?;
    Ok(Json(ApiResponse::ok(ids)))
}

pub async fn unlock_profile(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<UnlockRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UnlockResponse>>)> {
    let unlock = app_state
        .marketplace_service
        .unlock(user.user_id, request.listing_id.trim())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UnlockResponse {
            message: "Profile unlocked",
            unlock,
        })),
    ))
}

pub async fn commission_settings(
    State(app_state): State<AppState>,
) -> ApiResult<Json<ApiResponse<BTreeMap<String, f64>>>> {
    let settings = app_state.marketplace_service.commission_settings().await?;
    Ok(Json(ApiResponse::ok(settings)))
}

pub async fn update_commission(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ValidJson(request): ValidJson<CommissionUpdate>,
) -> ApiResult<Json<ApiResponse<CommissionSetting>>> {
    let setting = app_state
        .marketplace_service
        .upsert_commission(&request)
        .await?;
    Ok(Json(ApiResponse::ok(setting)))
}
