//! Contract and template handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::contracts::{
    ContractFilter, ContractStatusRequest, CreateContractRequest, CreateTemplateRequest,
};
use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::middleware::auth::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, Contract, ContractTemplate, PaginationParams};

pub async fn list_templates(
    State(app_state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<ApiResponse<Vec<ContractTemplate>>>> {
    let templates = app_state.contract_service.list_templates().await?;
    Ok(Json(ApiResponse::ok(templates)))
}

pub async fn create_template(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ValidJson(request): ValidJson<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ContractTemplate>>)> {
    let template = app_state.contract_service.create_template(&request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(template))))
}

/// Draft a contract from raw content or a template and notify the signer
pub async fn create_contract(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<CreateContractRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Contract>>)> {
    let contract = app_state
        .contract_service
        .create(user.user_id, &request)
        .await?;

    app_state
        .notification_service
        .notify_quietly(
            contract.signer_id,
            "Contract awaiting signature",
            &format!("\"{}\" is waiting for your signature.", contract.title),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(contract))))
}

pub async fn my_contracts(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<Contract>>>> {
    let contracts = app_state
        .contract_service
        .list_for_user(user.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(contracts)))
}

pub async fn sign_contract(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Contract>>> {
    let contract = app_state.contract_service.sign(id, user.user_id).await?;

    if contract.creator_id != user.user_id {
        app_state
            .notification_service
            .notify_quietly(
                contract.creator_id,
                "Contract signed",
                &format!("\"{}\" has been signed.", contract.title),
            )
            .await;
    }

    Ok(Json(ApiResponse::ok(contract)))
}

pub async fn admin_list_contracts(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(filter): ApiQuery<ContractFilter>,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Contract>>>> {
    let contracts = app_state
        .contract_service
        .list(filter.status, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(contracts)))
}

pub async fn admin_get_contract(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Contract>>> {
    let contract = app_state.contract_service.get(id).await?;
    Ok(Json(ApiResponse::ok(contract)))
}

pub async fn admin_set_contract_status(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(request): ValidJson<ContractStatusRequest>,
) -> ApiResult<Json<ApiResponse<Contract>>> {
    let contract = app_state
        .contract_service
        .set_status(id, request.status)
        .await?;
    tracing::info!(contract_id = %id, status = ?request.status, "contract status changed");
    Ok(Json(ApiResponse::ok(contract)))
}
