//! Notification service
//!
//! Other services call [`NotificationService::notify`] to tell a user about
//! something that happened to them (KYC decisions, disputes, contracts,
//! escrow). Admins can also broadcast by user or by role.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Notification, NotificationSeverity, NotificationStatus, UserRole};

#[derive(Debug, Deserialize)]
pub struct NotificationFilter {
    pub status: Option<NotificationStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendNotificationRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
    #[serde(default)]
    pub severity: NotificationSeverity,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendToRoleRequest {
    pub role: UserRole,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
    #[serde(default)]
    pub severity: NotificationSeverity,
}

/// Notification service
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        status: Option<NotificationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND ($2::notification_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        severity: NotificationSeverity,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (user_id, title, body, severity) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(severity)
        .fetch_one(&self.pool)
        .await
    }

    /// Best-effort notification: failures are logged, never returned
    pub async fn notify_quietly(&self, user_id: Uuid, title: &str, body: &str) {
        if let Err(e) = self.notify(user_id, title, body, NotificationSeverity::Info).await {
            tracing::warn!(%user_id, "failed to create notification: {}", e);
        }
    }

    /// Notify many users in one statement; returns the number created
    pub async fn notify_many(
        &self,
        user_ids: &[Uuid],
        title: &str,
        body: &str,
        severity: NotificationSeverity,
    ) -> Result<u64, sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, body, severity)
            SELECT id, $2, $3, $4 FROM UNNEST($1::uuid[]) AS t(id)
            "#,
        )
        .bind(user_ids)
        .bind(title)
        .bind(body)
        .bind(severity)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark one of the user's notifications read; None if it is not theirs
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Option<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET status = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(NotificationStatus::Read)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET status = $2 WHERE user_id = $1 AND status = $3",
        )
        .bind(user_id)
        .bind(NotificationStatus::Read)
        .bind(NotificationStatus::Unread)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
