//! Disputes filed by users and resolved by admins

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{Dispute, DisputeStatus};

#[derive(Debug, thiserror::Error)]
pub enum DisputeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Dispute not found")]
    NotFound,
    #[error("Dispute is already closed")]
    Closed,
    #[error("Disputes cannot be moved back to open")]
    Reopen,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDisputeRequest {
    pub profile_id: Option<Uuid>,
    #[validate(
        length(max = 5000),
        custom(function = "not_blank", message = "reason is required")
    )]
    pub reason: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResolveDisputeRequest {
    pub status: DisputeStatus,
    #[validate(length(max = 5000))]
    pub resolution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DisputeFilter {
    pub status: Option<DisputeStatus>,
}

/// Whether a dispute in `current` may move to `next`
pub fn may_transition(current: DisputeStatus, next: DisputeStatus) -> Result<(), DisputeError> {
    if current.is_closed() {
        return Err(DisputeError::Closed);
    }
    if next == DisputeStatus::Open {
        return Err(DisputeError::Reopen);
    }
    Ok(())
}

pub struct DisputeService {
    pool: PgPool,
}

impl DisputeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, req: &CreateDisputeRequest) -> Result<Dispute, DisputeError> {
        let dispute = sqlx::query_as::<_, Dispute>(
            r#"
            INSERT INTO disputes (user_id, profile_id, reason, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(req.profile_id)
        .bind(req.reason.trim())
        .bind(DisputeStatus::Open)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(dispute_id = %dispute.id, %user_id, "dispute filed");
        Ok(dispute)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Dispute>, DisputeError> {
        let disputes = sqlx::query_as::<_, Dispute>(
            "SELECT * FROM disputes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(disputes)
    }

    pub async fn list(
        &self,
        status: Option<DisputeStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Dispute>, DisputeError> {
        let disputes = sqlx::query_as::<_, Dispute>(
            r#"
            SELECT * FROM disputes
            WHERE ($1::dispute_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(disputes)
    }

    pub async fn get(&self, id: Uuid) -> Result<Dispute, DisputeError> {
        sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DisputeError::NotFound)
    }

    pub async fn resolve(
        &self,
        id: Uuid,
        admin_id: Uuid,
        req: &ResolveDisputeRequest,
    ) -> Result<Dispute, DisputeError> {
        let mut tx = self.pool.begin().await?;

        let current: DisputeStatus =
            sqlx::query_scalar("SELECT status FROM disputes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(DisputeError::NotFound)?;
        may_transition(current, req.status)?;

        let dispute = sqlx::query_as::<_, Dispute>(
            r#"
            UPDATE disputes
            SET status = $2,
                resolution = COALESCE($3, resolution),
                resolved_by = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.status)
        .bind(&req.resolution)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(dispute_id = %id, status = ?dispute.status, %admin_id, "dispute updated");
        Ok(dispute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_disputes_stay_closed() {
        assert!(matches!(
            may_transition(DisputeStatus::Resolved, DisputeStatus::InReview),
            Err(DisputeError::Closed)
        ));
        assert!(matches!(
            may_transition(DisputeStatus::Rejected, DisputeStatus::Resolved),
            Err(DisputeError::Closed)
        ));
    }

    #[test]
    fn open_disputes_move_forward() {
        assert!(may_transition(DisputeStatus::Open, DisputeStatus::InReview).is_ok());
        assert!(may_transition(DisputeStatus::InReview, DisputeStatus::Resolved).is_ok());
        assert!(matches!(
            may_transition(DisputeStatus::InReview, DisputeStatus::Open),
            Err(DisputeError::Reopen)
        ));
    }

    #[test]
    fn reason_is_required() {
        for body in [r#"{"reason": ""}"#, r#"{"reason": " \t\n "}"#] {
            let req: CreateDisputeRequest = serde_json::from_str(body).unwrap();
            assert!(req.validate().is_err(), "{}", body);
        }

        let req: CreateDisputeRequest =
            serde_json::from_str(r#"{"reason": "  agency stopped replying  "}"#).unwrap();
        assert!(req.validate().is_ok());
    }
}
