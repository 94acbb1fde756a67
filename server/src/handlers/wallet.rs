//! Wallet, ledger and escrow handlers

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
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, EscrowTransaction, PaginationParams, WalletTransaction};
use crate::wallet::{
    AmountRequest, BalanceChange, CreateEscrowRequest, TransferOutcome, TransferRequest,
};

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
    pub referral_balance: i64,
    pub currency: String,
}

pub async fn get_balance(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<BalanceResponse>>> {
    let wallet = app_state.wallet_service.get_or_create(user.user_id).await?;
    Ok(Json(ApiResponse::ok(BalanceResponse {
        balance: wallet.balance,
        referral_balance: wallet.referral_balance,
        currency: wallet.currency,
    })))
}

pub async fn list_transactions(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<WalletTransaction>>>> {
    let txs = app_state
        .wallet_service
        .list_transactions(user.user_id, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(txs)))
}

pub async fn get_transaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<WalletTransaction>>> {
    let tx = app_state
        .wallet_service
        .get_transaction(user.user_id, id)
        .await?;
    Ok(Json(ApiResponse::ok(tx)))
}

pub async fn add_funds(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<AmountRequest>,
) -> ApiResult<Json<ApiResponse<BalanceChange>>> {
    let change = app_state
        .wallet_service
        .deposit(user.user_id, request.amount, request.description.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(change)))
}

pub async fn withdraw(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<AmountRequest>,
) -> ApiResult<Json<ApiResponse<BalanceChange>>> {
    let change = app_state
        .wallet_service
        .withdraw(user.user_id, request.amount, request.description.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(change)))
}

pub async fn transfer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<TransferRequest>,
) -> ApiResult<Json<ApiResponse<TransferOutcome>>> {
    let outcome = app_state
        .wallet_service
        .transfer(user.user_id, &request)
        .await?;
    app_state
        .notification_service
        .notify_quietly(
            request.recipient_id,
            "Funds received",
            &format!("You received {} from a transfer.", request.amount),
        )
        .await;
    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn create_escrow(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<CreateEscrowRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<EscrowTransaction>>)> {
    let escrow = app_state
        .wallet_service
        .hold_escrow(user.user_id, &request)
        .await?;
    app_state
        .notification_service
        .notify_quietly(
            escrow.beneficiary_id,
            "Escrow payment held",
            &format!("A payment of {} is being held in escrow for you.", escrow.amount),
        )
        .await;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(escrow))))
}

pub async fn list_escrows(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<EscrowTransaction>>>> {
    let escrows = app_state.wallet_service.list_escrows(user.user_id).await?;
    Ok(Json(ApiResponse::ok(escrows)))
}

/// Visible to the payer, the beneficiary and admins
pub async fn get_escrow(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<EscrowTransaction>>> {
    let escrow = app_state
        .wallet_service
        .get_escrow(id)
        .await?
        .filter(|e| user.is_admin() || e.user_id == user.user_id || e.beneficiary_id == user.user_id)
        .ok_or_else(|| ApiError::not_found("Escrow not found"))?;
    Ok(Json(ApiResponse::ok(escrow)))
}

pub async fn release_escrow(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<EscrowTransaction>>> {
    let escrow = app_state
        .wallet_service
        .release_escrow(id, user.user_id, user.is_admin())
        .await?;
    app_state
        .notification_service
        .notify_quietly(
            escrow.beneficiary_id,
            "Escrow released",
            &format!(
                "An escrow payment of {} was released to your wallet ({} commission).",
                escrow.amount, escrow.commission
            ),
        )
        .await;
    Ok(Json(ApiResponse::ok(escrow)))
}

pub async fn refund_escrow(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<EscrowTransaction>>> {
    let escrow = app_state
        .wallet_service
        .refund_escrow(id, user.user_id, user.is_admin())
        .await?;
    app_state
        .notification_service
        .notify_quietly(
            escrow.user_id,
            "Escrow refunded",
            &format!("An escrow payment of {} was returned to your wallet.", escrow.amount),
        )
        .await;
    Ok(Json(ApiResponse::ok(escrow)))
}
