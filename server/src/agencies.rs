//! Agency service: directory, roster, subscriptions and admin management

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::is_unique_violation;
use crate::models::{
    Agency, AgencyStatus, KycStatus, Subscription, SubscriptionPlan, SubscriptionStatus,
    TransactionType, UserRole,
};
use crate::wallet::{WalletError, WalletService};

/// Subscription length in days
pub const SUBSCRIPTION_DAYS: i64 = 30;

/// Agency service error
#[derive(Debug, thiserror::Error)]
pub enum AgencyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Agency not found")]
    NotFound,
    #[error("Agency has no owner account")]
    NoOwner,
    #[error("Agency already has an active subscription")]
    AlreadySubscribed,
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateAgencyRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub status: Option<AgencyStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    pub plan: SubscriptionPlan,
}

#[derive(Debug, Deserialize)]
pub struct AgencyFilter {
    pub status: Option<AgencyStatus>,
}

/// Member of an agency roster
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RosterEntry {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub kyc_status: KycStatus,
    pub form_progress: i32,
}

/// Agency service
pub struct AgencyService {
    pool: PgPool,
    currency: String,
}

impl AgencyService {
    pub fn new(pool: PgPool, currency: String) -> Self {
        Self { pool, currency }
    }

    pub async fn list(&self, status: Option<AgencyStatus>) -> Result<Vec<Agency>, AgencyError> {
        let agencies = sqlx::query_as::<_, Agency>(
            r#"
            SELECT * FROM agencies
            WHERE ($1::agency_status IS NULL OR status = $1)
            ORDER BY name
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(agencies)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Agency>, AgencyError> {
        let agency = sqlx::query_as::<_, Agency>("SELECT * FROM agencies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(agency)
    }

    pub async fn require(&self, id: Uuid) -> Result<Agency, AgencyError> {
        self.get(id).await?.ok_or(AgencyError::NotFound)
    }

    /// Users whose KYC document names this agency
    pub async fn roster(&self, agency_id: Uuid) -> Result<Vec<RosterEntry>, AgencyError> {
        let entries = sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT u.id AS user_id, u.email, u.first_name, u.last_name, u.role,
                   k.status AS kyc_status, k.form_progress
            FROM kyc_documents k
            JOIN users u ON u.id = k.user_id
            WHERE k.agency_id = $1
            ORDER BY u.created_at DESC
            "#,
        )
        .bind(agency_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn latest_subscription(&self, agency: &Agency) -> Result<Option<Subscription>, AgencyError> {
        let owner_id = agency.owner_id.ok_or(AgencyError::NoOwner)?;
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    /// Buy a plan for the agency owner, paid from their wallet
    pub async fn subscribe(
        &self,
        agency: &Agency,
        plan: SubscriptionPlan,
    ) -> Result<Subscription, AgencyError> {
        let owner_id = agency.owner_id.ok_or(AgencyError::NoOwner)?;
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent subscribes for the same owner
        WalletService::lock_in(&mut tx, owner_id, &self.currency).await?;

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired'
            WHERE user_id = $1 AND status = 'active' AND expires_at <= NOW()
            "#,
        )
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND status = 'active')",
        )
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;
        if active {
            return Err(AgencyError::AlreadySubscribed);
        }

        WalletService::debit_in(
            &mut tx,
            owner_id,
            plan.price(),
            TransactionType::Subscription,
            Some("Agency subscription"),
            &self.currency,
        )
        .await?;

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (user_id, plan, amount, status, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(plan)
        .bind(plan.price())
        .bind(SubscriptionStatus::Active)
        .bind(Utc::now() + Duration::days(SUBSCRIPTION_DAYS))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AgencyError::AlreadySubscribed
            } else {
                AgencyError::Database(e)
            }
        })?;

        tx.commit().await?;
        tracing::info!(agency_id = %agency.id, plan = ?plan, "agency subscribed");
        Ok(subscription)
    }

    pub async fn update(&self, id: Uuid, req: &UpdateAgencyRequest) -> Result<Agency, AgencyError> {
        sqlx::query_as::<_, Agency>(
            r#"
            UPDATE agencies
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                status = COALESCE($4, status)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.email)
        .bind(req.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AgencyError::NotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AgencyError> {
        let result = sqlx::query("DELETE FROM agencies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AgencyError::NotFound);
        }
        Ok(())
    }

    /// Mark lapsed subscriptions expired, returning the affected owners
    pub async fn expire_subscriptions(&self) -> Result<Vec<Uuid>, AgencyError> {
        let owners = sqlx::query_scalar(
            r#"
            UPDATE subscriptions
            SET status = 'expired'
            WHERE status = 'active' AND expires_at <= NOW()
            RETURNING user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_costs_more() {
        assert!(SubscriptionPlan::Premium.price() > SubscriptionPlan::Basic.price());
    }

    #[test]
    fn subscribe_request_parses_plan() {
        let req: SubscribeRequest = serde_json::from_str(r#"{"plan": "premium"}"#).unwrap();
        assert_eq!(req.plan, SubscriptionPlan::Premium);
        assert!(serde_json::from_str::<SubscribeRequest>(r#"{"plan": "gold"}"#).is_err());
    }

    #[test]
    fn update_validates_email() {
        let req = UpdateAgencyRequest {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
