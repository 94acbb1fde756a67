//! Authentication extractors
//!
//! Handlers take one of these as an argument to require (or optionally
//! accept) a bearer access token.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use crate::auth::{AuthError, AuthService};
use crate::error::ApiError;
use crate::models::{Claims, UserRole};

/// Caller with a valid access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Allow the owner of a resource or an admin
    pub fn ensure_self_or_admin(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Access denied"))
        }
    }
}

/// Caller with a valid admin access token
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// Caller that may or may not be authenticated
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

async fn authenticate(auth: &AuthService, token: &str) -> Result<AuthenticatedUser, ApiError> {
    match auth.validate_access_token(token).await {
        Ok(claims) => Ok(AuthenticatedUser {
            user_id: claims.sub,
            role: claims.role,
            claims,
        }),
        Err(AuthError::Revoked) => Err(ApiError::unauthorized("Token has been revoked")),
        Err(_) => Err(ApiError::unauthorized("Invalid or expired token")),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("Missing authorization token"))?;

        let auth = Arc::<AuthService>::from_ref(state);
        authenticate(&auth, bearer.token()).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    /// A missing header yields `None`; a present but invalid token is still a 401.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Ok(OptionalUser(None));
        }
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        Ok(OptionalUser(Some(user)))
    }
}
