//! HTTP error type shared by all handlers

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::accounts::AccountError;
use crate::agencies::AgencyError;
use crate::auth::AuthError;
use crate::badges::BadgeError;
use crate::contracts::ContractError;
use crate::disputes::DisputeError;
use crate::favorites::FavoriteError;
use crate::kyc::KycError;
use crate::marketplace::MarketplaceError;
use crate::messages::MessageError;
use crate::models::ApiResponse;
use crate::uploads::UploadError;
use crate::wallet::WalletError;

/// Error returned from request handlers.
///
/// Rendered as the standard `ApiResponse` envelope with `success: false`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<axum_extra::extract::QueryRejection> for ApiError {
    fn from(rejection: axum_extra::extract::QueryRejection) -> Self {
        Self::BadRequest(format!("Failed to deserialize query string: {rejection}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Database(e) => {
                tracing::error!("database error: {}", e);
                "Internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!("internal error: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::Revoked => Self::Unauthorized(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Database(e) => Self::Database(e),
            AccountError::AlreadyExists => Self::Conflict(err.to_string()),
            AccountError::NotFound => Self::NotFound(err.to_string()),
        }
    }
}

impl From<KycError> for ApiError {
    fn from(err: KycError) -> Self {
        match err {
            KycError::Database(e) => Self::Database(e),
            KycError::NotFound => Self::NotFound(err.to_string()),
            KycError::Locked => Self::Conflict(err.to_string()),
            KycError::InvalidStatus(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Database(e) => Self::Database(e),
            WalletError::InsufficientFunds
            | WalletError::InvalidAmount
            | WalletError::SelfTransfer => Self::BadRequest(err.to_string()),
            WalletError::RecipientNotFound
            | WalletError::TransactionNotFound
            | WalletError::EscrowNotFound => Self::NotFound(err.to_string()),
            WalletError::EscrowClosed(_) => Self::Conflict(err.to_string()),
            WalletError::Forbidden => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<MarketplaceError> for ApiError {
    fn from(err: MarketplaceError) -> Self {
        match err {
            MarketplaceError::Database(e) => Self::Database(e),
            MarketplaceError::AlreadyUnlocked => Self::BadRequest(err.to_string()),
            MarketplaceError::ListingNotFound => Self::NotFound(err.to_string()),
            MarketplaceError::Wallet(e) => e.into(),
        }
    }
}

impl From<AgencyError> for ApiError {
    fn from(err: AgencyError) -> Self {
        match err {
            AgencyError::Database(e) => Self::Database(e),
            AgencyError::NotFound => Self::NotFound(err.to_string()),
            AgencyError::NoOwner => Self::BadRequest(err.to_string()),
            AgencyError::AlreadySubscribed => Self::Conflict(err.to_string()),
            AgencyError::Wallet(e) => e.into(),
        }
    }
}

impl From<FavoriteError> for ApiError {
    fn from(err: FavoriteError) -> Self {
        match err {
            FavoriteError::Database(e) => Self::Database(e),
            FavoriteError::AlreadyFavorited | FavoriteError::SelfFavorite => {
                Self::BadRequest(err.to_string())
            }
            FavoriteError::TargetNotFound => Self::NotFound(err.to_string()),
        }
    }
}

impl From<BadgeError> for ApiError {
    fn from(err: BadgeError) -> Self {
        match err {
            BadgeError::Database(e) => Self::Database(e),
            BadgeError::NotFound => Self::NotFound(err.to_string()),
            BadgeError::Duplicate => Self::Conflict(err.to_string()),
        }
    }
}

impl From<MessageError> for ApiError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Database(e) => Self::Database(e),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<DisputeError> for ApiError {
    fn from(err: DisputeError) -> Self {
        match err {
            DisputeError::Database(e) => Self::Database(e),
            DisputeError::NotFound => Self::NotFound(err.to_string()),
            DisputeError::Closed => Self::Conflict(err.to_string()),
            DisputeError::Reopen => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Database(e) => Self::Database(e),
            ContractError::NotFound
            | ContractError::TemplateNotFound
            | ContractError::SignerNotFound => Self::NotFound(err.to_string()),
            ContractError::MissingVariables(_) | ContractError::NoContent => {
                Self::BadRequest(err.to_string())
            }
            ContractError::NotSigner => Self::Forbidden(err.to_string()),
            ContractError::NotPending => Self::Conflict(err.to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => Self::Internal(format!("failed to store upload: {}", e)),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

/// True when a query failed on a unique constraint (SQLSTATE 23505)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = ApiError::bad_request("Invalid role");
        assert_eq!(err.to_string(), "Invalid role");
    }

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(WalletError::InsufficientFunds).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(WalletError::EscrowClosed(crate::models::EscrowStatus::Released))
                .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(MarketplaceError::Wallet(WalletError::InsufficientFunds)).to_string(),
            "Insufficient balance"
        );
        assert_eq!(
            ApiError::from(AccountError::AlreadyExists).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DisputeError::Closed).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ContractError::NotSigner).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::Revoked).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn database_errors_render_as_500() {
        let response = ApiError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
