//! Account service: registration, lookup and profile management

use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::{AgencyStatus, KycStatus, UpdateProfileRequest, User, UserRole};

/// Account service error
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("User already exists")]
    AlreadyExists,
    #[error("User not found")]
    NotFound,
}

/// Everything needed to create an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub agency_name: Option<String>,
    pub form_data: serde_json::Value,
    pub currency: String,
}

/// Admin-side account update
#[derive(Debug, Default, serde::Deserialize, validator::Validate)]
pub struct AdminUserUpdate {
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl AdminUserUpdate {
    /// Role changes and deactivation invalidate tokens carrying the old state
    pub fn revokes_sessions(&self) -> bool {
        self.role.is_some() || self.is_active == Some(false)
    }
}

/// Account service
pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user together with its KYC document, wallet and, for
    /// agency accounts, a pending agency record.
    pub async fn register(&self, account: NewAccount) -> Result<User, AccountError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (role, email, username, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(account.role)
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AccountError::AlreadyExists
            } else {
                AccountError::Database(e)
            }
        })?;

        sqlx::query(
            "INSERT INTO kyc_documents (user_id, role, status, form_data) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(account.role)
        .bind(KycStatus::InProgress)
        .bind(Json(account.form_data))
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO wallets (user_id, currency) VALUES ($1, $2)")
            .bind(user.id)
            .bind(&account.currency)
            .execute(&mut *tx)
            .await?;

        if account.role == UserRole::Agency {
            let name = account
                .agency_name
                .clone()
                .unwrap_or_else(|| account.username.clone());
            sqlx::query("INSERT INTO agencies (owner_id, name, email, status) VALUES ($1, $2, $3, $4)")
                .bind(user.id)
                .bind(name)
                .bind(&account.email)
                .bind(AgencyStatus::Pending)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(user_id = %user.id, role = %user.role, "account registered");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// List users, optionally filtered by role
    pub async fn list_users(
        &self,
        role: Option<UserRole>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, AccountError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// IDs of active users with the given role
    pub async fn active_user_ids_by_role(&self, role: UserRole) -> Result<Vec<Uuid>, AccountError> {
        let ids = sqlx::query_scalar("SELECT id FROM users WHERE role = $1 AND is_active")
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: &UpdateProfileRequest,
    ) -> Result<User, AccountError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                username = COALESCE($4, username),
                phone = COALESCE($5, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.username)
        .bind(&update.phone)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AccountError::NotFound)
    }

    pub async fn admin_update(
        &self,
        user_id: Uuid,
        update: &AdminUserUpdate,
    ) -> Result<User, AccountError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active),
                is_verified = COALESCE($6, is_verified),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.role)
        .bind(update.is_active)
        .bind(update.is_verified)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AccountError::NotFound)
    }

    pub async fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AccountError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    /// Mark the email verified. Returns false if it already was.
    pub async fn mark_verified(&self, user_id: Uuid) -> Result<bool, AccountError> {
        let result = sqlx::query(
            "UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_verified",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Self-service account removal keeps the row for ledger integrity
    pub async fn deactivate(&self, user_id: Uuid) -> Result<(), AccountError> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    /// Hard delete, admin only. Dependent rows cascade.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AccountError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }
}

/// Derive a username from the local part of an email address
pub fn default_username(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Empty KYC form used when registration carries none
pub fn empty_form() -> serde_json::Value {
    json!({})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_from_email() {
        assert_eq!(default_username("surrogate@test.com"), "surrogate");
        assert_eq!(default_username("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn role_and_deactivation_updates_revoke_sessions() {
        assert!(AdminUserUpdate {
            role: Some(UserRole::Donor),
            ..Default::default()
        }
        .revokes_sessions());
        assert!(AdminUserUpdate {
            is_active: Some(false),
            ..Default::default()
        }
        .revokes_sessions());
        assert!(!AdminUserUpdate {
            is_active: Some(true),
            first_name: Some("Ada".into()),
            is_verified: Some(true),
            ..Default::default()
        }
        .revokes_sessions());
    }
}
