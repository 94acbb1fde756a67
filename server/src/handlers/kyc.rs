//! KYC handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::kyc::{KycError, ReviewKycRequest, SubmitKycRequest, SubmitOutcome};
use crate::middleware::auth::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, KycDocument, KycStatus, PaginationParams, UserRole};

/// Summary returned by `GET /api/kyc/status`
#[derive(Debug, Serialize)]
pub struct KycStatusResponse {
    pub status: KycStatus,
    pub role: UserRole,
    pub form_progress: i32,
    pub form_data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct KycSubmitResponse {
    pub message: &'static str,
    pub document: KycDocument,
}

#[derive(Debug, Deserialize)]
pub struct KycFilter {
    pub status: Option<KycStatus>,
}

pub async fn kyc_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<KycStatusResponse>>> {
    let doc = app_state
        .kyc_service
        .get_for_user(user.user_id)
        .await?
        .ok_or(KycError::NotFound)?;

    Ok(Json(ApiResponse::ok(KycStatusResponse {
        status: doc.status,
        role: doc.role,
        form_progress: doc.form_progress,
        form_data: doc.form_data.0,
    })))
}

pub async fn list_documents(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<KycDocument>>>> {
    let docs = app_state
        .kyc_service
        .get_for_user(user.user_id)
        .await?
        .into_iter()
        .collect();
    Ok(Json(ApiResponse::ok(docs)))
}

/// Create or update the caller's KYC document
pub async fn submit_document(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<SubmitKycRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<KycSubmitResponse>>)> {
    let account = app_state
        .account_service
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let (status, message, document) = match app_state.kyc_service.submit(&account, request).await? {
        SubmitOutcome::Created(doc) => (StatusCode::CREATED, "KYC document created", doc),
        SubmitOutcome::Updated(doc) => (StatusCode::OK, "KYC document updated", doc),
    };

    if document.status == KycStatus::Submitted {
        tracing::info!(user_id = %user.user_id, kyc_id = %document.id, "KYC submitted for review");
    }
    Ok((
        status,
        Json(ApiResponse::ok(KycSubmitResponse { message, document })),
    ))
}

/// Admin review queue
pub async fn admin_list_kyc(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(filter): ApiQuery<KycFilter>,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<KycDocument>>>> {
    let docs = app_state
        .kyc_service
        .list(filter.status, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(docs)))
}

pub async fn admin_review_kyc(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(request): ValidJson<ReviewKycRequest>,
) -> ApiResult<Json<ApiResponse<KycDocument>>> {
    let doc = app_state
        .kyc_service
        .review(id, admin.user_id, &request)
        .await?;

    let (title, body) = match doc.status {
        KycStatus::Approved => ("KYC approved", "Your verification documents were approved.".to_string()),
        _ => (
            "KYC rejected",
            match &doc.review_note {
                Some(note) => format!("Your verification documents were rejected: {}", note),
                None => "Your verification documents were rejected.".to_string(),
            },
        ),
    };
    app_state
        .notification_service
        .notify_quietly(doc.user_id, title, &body)
        .await;

    Ok(Json(ApiResponse::ok(doc)))
}
