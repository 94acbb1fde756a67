//! Marketplace service: surrogate listings, profile unlocks and commission settings

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::{CommissionSetting, KycStatus, MarketplaceUnlock, TransactionType, UserRole};
use crate::wallet::{WalletError, WalletService};

/// Marketplace service error
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Already unlocked")]
    AlreadyUnlocked,
    #[error("Listing not found")]
    ListingNotFound,
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

#[derive(Debug, Deserialize, Validate)]
pub struct UnlockRequest {
    #[validate(length(min = 1, max = 50))]
    pub listing_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommissionUpdate {
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub percent: f64,
}

/// Surrogate row as read from the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurrogateRow {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub kyc_status: Option<KycStatus>,
    pub form_data: Option<Json<serde_json::Value>>,
    pub unlocked: bool,
}

/// Fields only visible after unlocking
#[derive(Debug, Serialize, Clone)]
pub struct FullProfile {
    pub last_name: Option<String>,
    pub email: String,
    pub form_data: serde_json::Value,
}

/// Listing entry; `profile` is present only for permitted viewers
#[derive(Debug, Serialize, Clone)]
pub struct SurrogateListing {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub location: Option<String>,
    pub kyc_status: Option<KycStatus>,
    pub unlocked: bool,
    pub created_at: DateTime<Utc>,
    pub profile: Option<FullProfile>,
}

/// Redact a row for a viewer who may or may not see the full profile
pub fn present(row: SurrogateRow, full_access: bool) -> SurrogateListing {
    let form_data = row
        .form_data
        .map(|Json(value)| value)
        .unwrap_or_else(|| serde_json::json!({}));
    let location = form_data
        .get("location")
        .and_then(|v| v.as_str())
        .map(String::from);

    SurrogateListing {
        id: row.id,
        first_name: row.first_name,
        location,
        kyc_status: row.kyc_status,
        unlocked: full_access,
        created_at: row.created_at,
        profile: full_access.then(|| FullProfile {
            last_name: row.last_name,
            email: row.email,
            form_data,
        }),
    }
}

/// Parse a listing ID in any accepted UUID spelling.
///
/// Unlocks are keyed by the hyphenated lower-case form of the result, the
/// same text `users.id::text` produces.
pub fn listing_key(listing_id: &str) -> Result<Uuid, MarketplaceError> {
    Uuid::parse_str(listing_id.trim()).map_err(|_| MarketplaceError::ListingNotFound)
}

/// Marketplace service
pub struct MarketplaceService {
    pool: PgPool,
    unlock_fee: i64,
    currency: String,
}

impl MarketplaceService {
    pub fn new(pool: PgPool, unlock_fee: i64, currency: String) -> Self {
        Self {
            pool,
            unlock_fee,
            currency,
        }
    }

    const SURROGATE_SELECT: &'static str = r#"
        SELECT u.id, u.first_name, u.last_name, u.email, u.created_at,
               k.status AS kyc_status, k.form_data,
               EXISTS (
                   SELECT 1 FROM marketplace_unlocks m
                   WHERE m.user_id = $1 AND m.listing_id = u.id::text
               ) AS unlocked
        FROM users u
        LEFT JOIN kyc_documents k ON k.user_id = u.id
    "#;

    /// Approved, active surrogates as seen by `viewer_id`
    pub async fn list_surrogates(
        &self,
        viewer_id: Uuid,
        viewer_is_admin: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SurrogateListing>, MarketplaceError> {
        let sql = format!(
            "{} WHERE u.role = 'surrogate' AND u.is_active AND k.status = 'approved' \
             ORDER BY u.created_at DESC LIMIT $2 OFFSET $3",
            Self::SURROGATE_SELECT
        );
        let rows = sqlx::query_as::<_, SurrogateRow>(&sql)
            .bind(viewer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let full = row.unlocked || viewer_is_admin || row.id == viewer_id;
                present(row, full)
            })
            .collect())
    }

    pub async fn get_surrogate(
        &self,
        viewer_id: Uuid,
        viewer_is_admin: bool,
        surrogate_id: Uuid,
    ) -> Result<Option<SurrogateListing>, MarketplaceError> {
        let sql = format!(
            "{} WHERE u.role = 'surrogate' AND u.id = $2",
            Self::SURROGATE_SELECT
        );
        let row = sqlx::query_as::<_, SurrogateRow>(&sql)
            .bind(viewer_id)
            .bind(surrogate_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let full = row.unlocked || viewer_is_admin || row.id == viewer_id;
            present(row, full)
        }))
    }

    /// Listing IDs the user has unlocked
    pub async fn list_unlocks(&self, user_id: Uuid) -> Result<Vec<String>, MarketplaceError> {
        let ids = sqlx::query_scalar(
            "SELECT listing_id FROM marketplace_unlocks WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Unlock a donor or surrogate profile, charging the unlock fee if one is set
    pub async fn unlock(
        &self,
        user_id: Uuid,
        listing_id: &str,
    ) -> Result<MarketplaceUnlock, MarketplaceError> {
        let target = listing_key(listing_id)?;
        let listed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active AND role IN ($2, $3))",
        )
        .bind(target)
        .bind(UserRole::Surrogate)
        .bind(UserRole::Donor)
        .fetch_one(&self.pool)
        .await?;
        if !listed {
            return Err(MarketplaceError::ListingNotFound);
        }

        let mut tx = self.pool.begin().await?;

        let unlock = sqlx::query_as::<_, MarketplaceUnlock>(
            r#"
            INSERT INTO marketplace_unlocks (user_id, listing_id, amount_paid)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, listing_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(target.to_string())
        .bind(self.unlock_fee)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(MarketplaceError::AlreadyUnlocked)?;

        if self.unlock_fee > 0 {
            WalletService::debit_in(
                &mut tx,
                user_id,
                self.unlock_fee,
                TransactionType::MarketplaceUnlock,
                Some("Marketplace profile unlock"),
                &self.currency,
            )
            .await?;
        }

        tx.commit().await?;
        tracing::info!(%user_id, listing_id = %target, fee = self.unlock_fee, "profile unlocked");
        Ok(unlock)
    }

    /// Category to percent map
    pub async fn commission_settings(&self) -> Result<BTreeMap<String, f64>, MarketplaceError> {
        let settings = sqlx::query_as::<_, CommissionSetting>("SELECT * FROM commission_settings")
            .fetch_all(&self.pool)
            .await?;
        Ok(settings
            .into_iter()
            .map(|s| (s.category, s.percent))
            .collect())
    }

    pub async fn upsert_commission(
        &self,
        update: &CommissionUpdate,
    ) -> Result<CommissionSetting, MarketplaceError> {
        let setting = sqlx::query_as::<_, CommissionSetting>(
            r#"
            INSERT INTO commission_settings (category, percent)
            VALUES ($1, $2)
            ON CONFLICT (category) DO UPDATE
                SET percent = EXCLUDED.percent, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&update.category)
        .bind(update.percent)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(category = %setting.category, percent = setting.percent, "commission updated");
        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> SurrogateRow {
        SurrogateRow {
            id: Uuid::new_v4(),
            first_name: Some("Ada".into()),
            last_name: Some("Obi".into()),
            email: "ada@test.com".into(),
            created_at: Utc::now(),
            kyc_status: Some(KycStatus::Approved),
            form_data: Some(Json(json!({"location": "Lagos", "blood_type": "O+"}))),
            unlocked: false,
        }
    }

    #[test]
    fn locked_profiles_are_redacted() {
        let listing = present(row(), false);
        assert!(!listing.unlocked);
        assert!(listing.profile.is_none());
        assert_eq!(listing.location.as_deref(), Some("Lagos"));

        let json = serde_json::to_value(&listing).unwrap();
        assert!(json.to_string().find("ada@test.com").is_none());
        assert!(json.to_string().find("blood_type").is_none());
    }

    #[test]
    fn unlocked_profiles_are_complete() {
        let listing = present(row(), true);
        let profile = listing.profile.expect("full profile");
        assert_eq!(profile.email, "ada@test.com");
        assert_eq!(profile.form_data["blood_type"], "O+");
    }

    #[test]
    fn listing_ids_normalize_to_one_key() {
        let canonical = "6f1c2a4e-93b1-4c1d-8f0e-2b7d5a9c3e10";
        for spelling in [
            canonical,
            "6F1C2A4E-93B1-4C1D-8F0E-2B7D5A9C3E10",
            "6f1c2a4e93b14c1d8f0e2b7d5a9c3e10",
            "urn:uuid:6f1c2a4e-93b1-4c1d-8f0e-2b7d5a9c3e10",
            " 6f1c2a4e-93b1-4c1d-8f0e-2b7d5a9c3e10 ",
        ] {
            let key = listing_key(spelling).unwrap();
            assert_eq!(key.to_string(), canonical, "{}", spelling);
        }

        assert!(matches!(
            listing_key("listing-42"),
            Err(MarketplaceError::ListingNotFound)
        ));
    }

    #[test]
    fn commission_percent_is_bounded() {
        let update = CommissionUpdate {
            category: "escrow".into(),
            percent: 120.0,
        };
        assert!(update.validate().is_err());
    }
}
