//! Verification badge service

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::is_unique_violation;
use crate::models::{BadgeStatus, VerificationBadge};

/// Badge service error
#[derive(Debug, thiserror::Error)]
pub enum BadgeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Badge not found")]
    NotFound,
    #[error("User already has a badge of this type")]
    Duplicate,
}

#[derive(Debug, Deserialize)]
pub struct BadgeQuery {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBadgeRequest {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub badge_type: String,
    pub status: Option<BadgeStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBadgeRequest {
    pub status: BadgeStatus,
}

/// Public badge summary
#[derive(Debug, Serialize, Clone)]
pub struct BadgeSummary {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub badge_type: String,
    pub status: BadgeStatus,
}

impl From<VerificationBadge> for BadgeSummary {
    fn from(badge: VerificationBadge) -> Self {
        Self {
            user_id: badge.user_id,
            badge_type: badge.badge_type,
            status: badge.status,
        }
    }
}

/// Badge service
pub struct BadgeService {
    pool: PgPool,
}

impl BadgeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn for_users(&self, user_ids: &[Uuid]) -> Result<Vec<VerificationBadge>, BadgeError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let badges = sqlx::query_as::<_, VerificationBadge>(
            "SELECT * FROM verification_badges WHERE user_id = ANY($1) ORDER BY created_at",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(badges)
    }

    pub async fn create(&self, req: &CreateBadgeRequest) -> Result<VerificationBadge, BadgeError> {
        sqlx::query_as::<_, VerificationBadge>(
            "INSERT INTO verification_badges (user_id, type, status) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(req.user_id)
        .bind(&req.badge_type)
        .bind(req.status.unwrap_or(BadgeStatus::Pending))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BadgeError::Duplicate
            } else {
                BadgeError::Database(e)
            }
        })
    }

    pub async fn set_status(&self, id: Uuid, status: BadgeStatus) -> Result<VerificationBadge, BadgeError> {
        sqlx::query_as::<_, VerificationBadge>(
            "UPDATE verification_badges SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BadgeError::NotFound)
    }
}
