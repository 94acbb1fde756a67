//! Authentication handlers: register, login, tokens, profile and passwords

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{TimeZone, Utc};

use crate::accounts::{default_username, empty_form, NewAccount};
use crate::app_state::AppState;
use crate::auth::{AuthService, IssuedToken};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    Ack, ApiResponse, AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
    RegisterRequest, ResetPasswordRequest, TokenPurpose, UpdateProfileRequest, User, UserResponse,
    UserRole, VerifyEmailQuery,
};

const INVALID_TOKEN: &str = "Invalid or expired token";

fn auth_response(user: &User, issued: IssuedToken) -> AuthResponse {
    AuthResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: Utc
            .timestamp_opt(issued.claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now),
        user_id: user.id,
        role: user.role,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Register a new account
pub async fn register(
    State(app_state): State<AppState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let (Some(email), Some(password), Some(role)) = (
        non_blank(request.email),
        request.password.filter(|p| !p.is_empty()),
        non_blank(request.role),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let role: UserRole = role
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid role"))?;
    if role == UserRole::Admin {
        return Err(ApiError::forbidden("Admin accounts cannot be self-registered"));
    }

    let email = email.to_lowercase();
    let password_hash = app_state.auth_service.hash_password(&password).await?;
    let user = app_state
        .account_service
        .register(NewAccount {
            username: non_blank(request.username).unwrap_or_else(|| default_username(&email)),
            email,
            password_hash,
            role,
            first_name: non_blank(request.first_name),
            last_name: non_blank(request.last_name),
            agency_name: non_blank(request.agency_name),
            form_data: request.form_data.unwrap_or_else(empty_form),
            currency: app_state.config.default_currency.clone(),
        })
        .await?;

    let verification = app_state.auth_service.issue_verification_token(&user)?;
    tracing::debug!(user_id = %user.id, token = %verification.token, "email verification token issued");

    let issued = app_state.auth_service.issue_access_token(user.id, user.role)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(auth_response(&user, issued))),
    ))
}

/// Exchange credentials for an access token
pub async fn login(
    State(app_state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let (Some(email), Some(password)) = (non_blank(request.email), request.password) else {
        return Err(ApiError::bad_request("Missing email or password"));
    };

    let Some(user) = app_state.account_service.find_by_email(&email).await? else {
        tracing::warn!("login attempt for unknown email");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !app_state
        .auth_service
        .verify_password(&password, &user.password_hash)
        .await?
    {
        tracing::warn!(user_id = %user.id, "failed login");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }
    if !user.is_active {
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    let issued = app_state.auth_service.issue_access_token(user.id, user.role)?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(ApiResponse::ok(auth_response(&user, issued))))
}

pub async fn logout(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Json<ApiResponse<Ack>> {
    app_state.auth_service.revoke(&user.claims).await;
    Json(ApiResponse::ok(Ack::new("Successfully logged out")))
}

/// Issue a fresh access token for the current user
pub async fn refresh(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let account = load_user(&app_state, &user).await?;
    if !account.is_active {
        return Err(ApiError::forbidden("Account is deactivated"));
    }
    let issued = app_state
        .auth_service
        .issue_access_token(account.id, account.role)?;
    Ok(Json(ApiResponse::ok(auth_response(&account, issued))))
}

async fn load_user(app_state: &AppState, user: &AuthenticatedUser) -> ApiResult<User> {
    app_state
        .account_service
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Current user's profile
pub async fn me(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let account = load_user(&app_state, &user).await?;
    Ok(Json(ApiResponse::ok(account.into())))
}

pub async fn update_profile(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let account = app_state
        .account_service
        .update_profile(user.user_id, &request)
        .await?;
    Ok(Json(ApiResponse::ok(account.into())))
}

/// Deactivate the caller's account and revoke the presented token
pub async fn delete_profile(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    app_state.account_service.deactivate(user.user_id).await?;
    app_state.auth_service.revoke(&user.claims).await;
    tracing::info!(user_id = %user.user_id, "account deactivated by owner");
    Ok(Json(ApiResponse::ok(Ack::new("Account deleted successfully"))))
}

pub async fn change_password(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    let account = load_user(&app_state, &user).await?;
    if !app_state
        .auth_service
        .verify_password(&request.current_password, &account.password_hash)
        .await?
    {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let hash = app_state
        .auth_service
        .hash_password(&request.new_password)
        .await?;
    app_state.account_service.set_password(account.id, &hash).await?;
    tracing::info!(user_id = %account.id, "password changed");
    Ok(Json(ApiResponse::ok(Ack::new("Password updated successfully"))))
}

/// Responds identically whether or not the account exists
pub async fn forgot_password(
    State(app_state): State<AppState>,
    ValidJson(request): ValidJson<ForgotPasswordRequest>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    match app_state.account_service.find_by_email(request.email.trim()).await? {
        Some(user) if user.is_active => {
            let issued = app_state.auth_service.issue_reset_token(&user)?;
            tracing::info!(user_id = %user.id, "password reset requested");
            tracing::debug!(user_id = %user.id, token = %issued.token, "password reset token issued");
        }
        _ => tracing::info!("password reset requested for unknown or inactive account"),
    }
    Ok(Json(ApiResponse::ok(Ack::new("Password reset email sent"))))
}

pub async fn reset_password(
    State(app_state): State<AppState>,
    ValidJson(request): ValidJson<ResetPasswordRequest>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    let claims = app_state
        .auth_service
        .decode(&request.token, TokenPurpose::Reset)
        .map_err(|_| ApiError::bad_request(INVALID_TOKEN))?;

    let user = app_state
        .account_service
        .get_user(claims.sub)
        .await?
        .filter(|user| user.is_active && AuthService::reset_token_matches(&claims, user))
        .ok_or_else(|| ApiError::bad_request(INVALID_TOKEN))?;

    let hash = app_state.auth_service.hash_password(&request.password).await?;
    app_state.account_service.set_password(user.id, &hash).await?;
    tracing::info!(user_id = %user.id, "password reset");
    Ok(Json(ApiResponse::ok(Ack::new("Password has been reset successfully"))))
}

pub async fn verify_email_path(
    State(app_state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    verify_email_token(&app_state, &token).await
}

pub async fn verify_email_query(
    State(app_state): State<AppState>,
    ApiQuery(query): ApiQuery<VerifyEmailQuery>,
) -> ApiResult<Json<ApiResponse<Ack>>> {
    let token = query
        .token
        .ok_or_else(|| ApiError::bad_request(INVALID_TOKEN))?;
    verify_email_token(&app_state, &token).await
}

async fn verify_email_token(app_state: &AppState, token: &str) -> ApiResult<Json<ApiResponse<Ack>>> {
    let claims = app_state
        .auth_service
        .decode(token, TokenPurpose::Verify)
        .map_err(|_| ApiError::bad_request(INVALID_TOKEN))?;

    let user = app_state
        .account_service
        .get_user(claims.sub)
        .await?
        .filter(|user| claims.email.as_deref() == Some(user.email.as_str()))
        .ok_or_else(|| ApiError::bad_request(INVALID_TOKEN))?;

    if !app_state.account_service.mark_verified(user.id).await? {
        return Ok(Json(ApiResponse::ok(Ack::new("Email already verified"))));
    }
    tracing::info!(user_id = %user.id, "email verified");
    Ok(Json(ApiResponse::ok(Ack::new("Email verified successfully"))))
}
