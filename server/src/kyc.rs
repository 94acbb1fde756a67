//! KYC workflow service
//!
//! Each user owns exactly one KYC document, created at registration. The
//! owner edits it while it is `in_progress`, moves it to `submitted`, and an
//! admin approves or rejects it. Approved documents are frozen.

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::{BadgeStatus, KycDocument, KycStatus, User};

/// Badge type granted when identity KYC is approved
pub const IDENTITY_BADGE: &str = "identity";

/// KYC service error
#[derive(Debug, thiserror::Error)]
pub enum KycError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("KYC not found")]
    NotFound,
    #[error("Approved KYC documents cannot be modified")]
    Locked,
    #[error("Status {0:?} cannot be set here")]
    InvalidStatus(KycStatus),
}

/// Owner-side submission (create or update)
#[derive(Debug, Deserialize, Validate, Default)]
pub struct SubmitKycRequest {
    pub form_data: Option<serde_json::Value>,
    #[validate(range(min = 0, max = 100))]
    pub form_progress: Option<i32>,
    pub status: Option<KycStatus>,
    #[validate(length(max = 2048))]
    pub file_url: Option<String>,
    pub agency_id: Option<Uuid>,
}

/// Admin decision on a submitted document
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewKycRequest {
    pub status: KycStatus,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

/// Whether a submission created a new document or updated the existing one
#[derive(Debug)]
pub enum SubmitOutcome {
    Created(KycDocument),
    Updated(KycDocument),
}

/// Statuses an owner may set on their own document
pub fn owner_may_set(status: KycStatus) -> bool {
    matches!(status, KycStatus::InProgress | KycStatus::Submitted)
}

/// Statuses an admin review may set
pub fn review_may_set(status: KycStatus) -> bool {
    matches!(status, KycStatus::Approved | KycStatus::Rejected)
}

/// Whether the owner may still edit a document in `current`
pub fn owner_may_edit(current: KycStatus) -> Result<(), KycError> {
    if current == KycStatus::Approved {
        return Err(KycError::Locked);
    }
    Ok(())
}

/// KYC service
pub struct KycService {
    pool: PgPool,
}

impl KycService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_for_user(&self, user_id: Uuid) -> Result<Option<KycDocument>, KycError> {
        let doc = sqlx::query_as::<_, KycDocument>("SELECT * FROM kyc_documents WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Create or update the caller's document
    pub async fn submit(&self, user: &User, req: SubmitKycRequest) -> Result<SubmitOutcome, KycError> {
        if let Some(status) = req.status {
            if !owner_may_set(status) {
                return Err(KycError::InvalidStatus(status));
            }
        }

        match self.get_for_user(user.id).await? {
            Some(existing) => {
                owner_may_edit(existing.status)?;

                let doc = sqlx::query_as::<_, KycDocument>(
                    r#"
                    UPDATE kyc_documents
                    SET form_data = COALESCE($2, form_data),
                        form_progress = COALESCE($3, form_progress),
                        status = COALESCE($4, status),
                        file_url = COALESCE($5, file_url),
                        agency_id = COALESCE($6, agency_id),
                        updated_at = NOW()
                    WHERE id = $1 AND status <> 'approved'
                    RETURNING *
                    "#,
                )
                .bind(existing.id)
                .bind(req.form_data.map(Json))
                .bind(req.form_progress)
                .bind(req.status)
                .bind(&req.file_url)
                .bind(req.agency_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(KycError::Locked)?;

                Ok(SubmitOutcome::Updated(doc))
            }
            None => {
                let doc = sqlx::query_as::<_, KycDocument>(
                    r#"
                    INSERT INTO kyc_documents
                        (user_id, role, status, form_data, form_progress, file_url, agency_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING *
                    "#,
                )
                .bind(user.id)
                .bind(user.role)
                .bind(req.status.unwrap_or(KycStatus::InProgress))
                .bind(Json(req.form_data.unwrap_or_else(|| serde_json::json!({}))))
                .bind(req.form_progress.unwrap_or(0))
                .bind(&req.file_url)
                .bind(req.agency_id)
                .fetch_one(&self.pool)
                .await?;

                Ok(SubmitOutcome::Created(doc))
            }
        }
    }

    /// Review queue, newest first
    pub async fn list(
        &self,
        status: Option<KycStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<KycDocument>, KycError> {
        let docs = sqlx::query_as::<_, KycDocument>(
            r#"
            SELECT * FROM kyc_documents
            WHERE ($1::kyc_status IS NULL OR status = $1)
            ORDER BY updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    /// Record an admin decision; approval also grants the identity badge
    pub async fn review(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        req: &ReviewKycRequest,
    ) -> Result<KycDocument, KycError> {
        if !review_may_set(req.status) {
            return Err(KycError::InvalidStatus(req.status));
        }

        let mut tx = self.pool.begin().await?;

        let doc = sqlx::query_as::<_, KycDocument>(
            r#"
            UPDATE kyc_documents
            SET status = $2, review_note = $3, reviewed_by = $4,
                reviewed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.status)
        .bind(&req.note)
        .bind(reviewer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(KycError::NotFound)?;

        let badge_status = if req.status == KycStatus::Approved {
            BadgeStatus::Approved
        } else {
            BadgeStatus::Rejected
        };
        sqlx::query(
            r#"
            INSERT INTO verification_badges (user_id, type, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, type) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(doc.user_id)
        .bind(IDENTITY_BADGE)
        .bind(badge_status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(kyc_id = %doc.id, user_id = %doc.user_id, status = ?doc.status, "KYC reviewed");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owners_cannot_approve_themselves() {
        assert!(owner_may_set(KycStatus::InProgress));
        assert!(owner_may_set(KycStatus::Submitted));
        assert!(!owner_may_set(KycStatus::Approved));
        assert!(!owner_may_set(KycStatus::Rejected));
    }

    #[test]
    fn approved_documents_are_locked_for_owners() {
        assert!(matches!(
            owner_may_edit(KycStatus::Approved),
            Err(KycError::Locked)
        ));
        for status in [KycStatus::InProgress, KycStatus::Submitted, KycStatus::Rejected] {
            assert!(owner_may_edit(status).is_ok(), "{:?}", status);
        }
    }

    #[test]
    fn reviews_only_decide() {
        assert!(review_may_set(KycStatus::Approved));
        assert!(review_may_set(KycStatus::Rejected));
        assert!(!review_may_set(KycStatus::Submitted));
    }

    #[test]
    fn progress_is_bounded() {
        let req = SubmitKycRequest {
            form_progress: Some(140),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = SubmitKycRequest {
            form_progress: Some(60),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn submission_parses_snake_case_status() {
        let req: SubmitKycRequest =
            serde_json::from_str(r#"{"status": "submitted", "form_progress": 100}"#).unwrap();
        assert_eq!(req.status, Some(KycStatus::Submitted));
    }
}
