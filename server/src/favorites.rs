//! Favorites service

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Favorites service error
#[derive(Debug, thiserror::Error)]
pub enum FavoriteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Already in favorites")]
    AlreadyFavorited,
    #[error("Cannot favorite yourself")]
    SelfFavorite,
    #[error("User not found")]
    TargetNotFound,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FavoriteRequest {
    pub target_user_id: Uuid,
}

/// Favorites service
pub struct FavoriteService {
    pool: PgPool,
}

impl FavoriteService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Target user IDs, oldest first
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Uuid>, FavoriteError> {
        let ids = sqlx::query_scalar(
            "SELECT target_user_id FROM favorites WHERE ip_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn add(&self, user_id: Uuid, target_user_id: Uuid) -> Result<(), FavoriteError> {
        if user_id == target_user_id {
            return Err(FavoriteError::SelfFavorite);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(target_user_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(FavoriteError::TargetNotFound);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO favorites (ip_id, target_user_id)
            VALUES ($1, $2)
            ON CONFLICT (ip_id, target_user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(target_user_id)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(FavoriteError::AlreadyFavorited);
        }
        Ok(())
    }

    /// Idempotent; returns whether a row was removed
    pub async fn remove(&self, user_id: Uuid, target_user_id: Uuid) -> Result<bool, FavoriteError> {
        let result = sqlx::query("DELETE FROM favorites WHERE ip_id = $1 AND target_user_id = $2")
            .bind(user_id)
            .bind(target_user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
