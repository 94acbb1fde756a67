//! Authentication service
//!
//! Password hashing, JWT issuance and verification, and token revocation.
//! Password-reset and email-verification tokens are signed JWTs with their
//! own purpose claim, so an access token can never be replayed as a reset
//! token (or the other way round). Reset tokens also carry a fingerprint of
//! the password hash they were issued against and stop working once the
//! password changes.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Claims, TokenPurpose, User, UserRole};

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Token has been revoked")]
    Revoked,
    #[error("Token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Authentication service
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    reset_ttl: Duration,
    verify_ttl: Duration,
    bcrypt_cost: u32,
    /// Revoked token IDs mapped to their expiry timestamp
    revoked: RwLock<HashMap<Uuid, i64>>,
    /// Users whose tokens issued at or before the timestamp are revoked
    revoked_users: RwLock<HashMap<Uuid, i64>>,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::hours(config.access_token_hours),
            reset_ttl: Duration::minutes(config.reset_token_minutes),
            verify_ttl: Duration::hours(config.verify_token_hours),
            bcrypt_cost: config.bcrypt_cost,
            revoked: RwLock::new(HashMap::new()),
            revoked_users: RwLock::new(HashMap::new()),
        }
    }

    /// Hash a password on the blocking thread pool
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }

    /// Check a password against a stored bcrypt hash.
    ///
    /// Malformed hashes count as a mismatch.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matches = tokio::task::spawn_blocking(move || {
            bcrypt::verify(password, &hash).unwrap_or(false)
        })
        .await?;
        Ok(matches)
    }

    /// Issue an access token for the given user
    pub fn issue_access_token(&self, user_id: Uuid, role: UserRole) -> Result<IssuedToken, AuthError> {
        self.sign(Claims {
            sub: user_id,
            role,
            purpose: TokenPurpose::Access,
            jti: Uuid::new_v4(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + self.access_ttl).timestamp(),
            email: None,
            pwd: None,
        })
    }

    /// Issue a password reset token bound to the user's current password hash
    pub fn issue_reset_token(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.sign(Claims {
            sub: user.id,
            role: user.role,
            purpose: TokenPurpose::Reset,
            jti: Uuid::new_v4(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + self.reset_ttl).timestamp(),
            email: None,
            pwd: Some(password_fingerprint(&user.password_hash)),
        })
    }

    /// Issue an email verification token
    pub fn issue_verification_token(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.sign(Claims {
            sub: user.id,
            role: user.role,
            purpose: TokenPurpose::Verify,
            jti: Uuid::new_v4(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + self.verify_ttl).timestamp(),
            email: Some(user.email.clone()),
            pwd: None,
        })
    }

    fn sign(&self, claims: Claims) -> Result<IssuedToken, AuthError> {
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedToken { token, claims })
    }

    /// Decode a token and check that it was issued for `purpose`
    pub fn decode(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if data.claims.purpose != purpose {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }

    /// Validate a bearer access token, rejecting revoked ones
    pub async fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode(token, TokenPurpose::Access)?;
        if self.revoked.read().await.contains_key(&claims.jti) {
            return Err(AuthError::Revoked);
        }
        if let Some(cutoff) = self.revoked_users.read().await.get(&claims.sub) {
            if claims.iat <= *cutoff {
                return Err(AuthError::Revoked);
            }
        }
        Ok(claims)
    }

    /// Check a reset token against the user's current password hash
    pub fn reset_token_matches(claims: &Claims, user: &User) -> bool {
        claims.sub == user.id
            && claims.pwd.as_deref() == Some(password_fingerprint(&user.password_hash).as_str())
    }

    /// Revoke a token until it expires
    pub async fn revoke(&self, claims: &Claims) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti, claims.exp);
        tracing::info!(user_id = %claims.sub, jti = %claims.jti, "access token revoked");
    }

    /// Revoke every access token already issued to a user
    pub async fn revoke_user(&self, user_id: Uuid) {
        let now = Utc::now().timestamp();
        let oldest_live = now - self.access_ttl.num_seconds();
        let mut revoked = self.revoked_users.write().await;
        revoked.retain(|_, cutoff| *cutoff > oldest_live);
        revoked.insert(user_id, now);
        tracing::info!(user_id = %user_id, "outstanding access tokens revoked");
    }

    pub async fn revoked_count(&self) -> usize {
        self.revoked.read().await.len()
    }
}

fn password_fingerprint(password_hash: &str) -> String {
    let digest = Sha256::digest(password_hash.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "JWT_SECRET_KEY" => Some("test-jwt-secret-key-change-this-32-chars".into()),
            "BCRYPT_COST" => Some("4".into()),
            _ => None,
        })
        .unwrap()
    }

    fn test_user(password_hash: &str) -> User {
        User {
            id: Uuid::new_v4(),
            role: UserRole::Donor,
            email: "donor@test.com".into(),
            username: "donor".into(),
            password_hash: password_hash.into(),
            first_name: None,
            last_name: None,
            phone: None,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn hashes_and_verifies_passwords() {
        let auth = AuthService::new(&test_config());
        let hash = auth.hash_password("donor123").await.unwrap();
        assert_ne!(hash, "donor123");
        assert!(auth.verify_password("donor123", &hash).await.unwrap());
        assert!(!auth.verify_password("wrong", &hash).await.unwrap());
        assert!(!auth.verify_password("donor123", "not-a-hash").await.unwrap());
    }

    #[tokio::test]
    async fn access_token_round_trip() {
        let auth = AuthService::new(&test_config());
        let user_id = Uuid::new_v4();
        let issued = auth.issue_access_token(user_id, UserRole::Agency).unwrap();

        let claims = auth.validate_access_token(&issued.token).await.unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::Agency);
        assert_eq!(claims.purpose, TokenPurpose::Access);
    }

    #[tokio::test]
    async fn revoked_tokens_are_rejected() {
        let auth = AuthService::new(&test_config());
        let issued = auth.issue_access_token(Uuid::new_v4(), UserRole::Admin).unwrap();
        auth.revoke(&issued.claims).await;

        assert!(matches!(
            auth.validate_access_token(&issued.token).await,
            Err(AuthError::Revoked)
        ));
        assert_eq!(auth.revoked_count().await, 1);
    }

    #[tokio::test]
    async fn revoking_a_user_kills_only_their_earlier_tokens() {
        let auth = AuthService::new(&test_config());
        let user_id = Uuid::new_v4();
        let access = |sub: Uuid, iat: i64| Claims {
            sub,
            role: UserRole::Donor,
            purpose: TokenPurpose::Access,
            jti: Uuid::new_v4(),
            iat,
            exp: Utc::now().timestamp() + 3600,
            email: None,
            pwd: None,
        };
        let now = Utc::now().timestamp();
        let earlier = auth.sign(access(user_id, now - 60)).unwrap();
        let bystander = auth.sign(access(Uuid::new_v4(), now - 60)).unwrap();

        auth.revoke_user(user_id).await;

        assert!(matches!(
            auth.validate_access_token(&earlier.token).await,
            Err(AuthError::Revoked)
        ));
        assert!(auth.validate_access_token(&bystander.token).await.is_ok());

        let later = auth.sign(access(user_id, now + 60)).unwrap();
        assert!(auth.validate_access_token(&later.token).await.is_ok());
    }

    #[test]
    fn purposes_do_not_mix() {
        let auth = AuthService::new(&test_config());
        let user = test_user("$2b$04$abcdefghijklmnopqrstuv");
        let reset = auth.issue_reset_token(&user).unwrap();
        let verify = auth.issue_verification_token(&user).unwrap();

        assert!(auth.decode(&reset.token, TokenPurpose::Access).is_err());
        assert!(auth.decode(&reset.token, TokenPurpose::Verify).is_err());
        assert!(auth.decode(&verify.token, TokenPurpose::Reset).is_err());
        assert!(auth.decode(&reset.token, TokenPurpose::Reset).is_ok());

        let claims = auth.decode(&verify.token, TokenPurpose::Verify).unwrap();
        assert_eq!(claims.email.as_deref(), Some("donor@test.com"));
    }

    #[test]
    fn reset_token_dies_with_password_change() {
        let auth = AuthService::new(&test_config());
        let mut user = test_user("$2b$04$original-hash-value-xx");
        let reset = auth.issue_reset_token(&user).unwrap();
        let claims = auth.decode(&reset.token, TokenPurpose::Reset).unwrap();
        assert!(AuthService::reset_token_matches(&claims, &user));

        user.password_hash = "$2b$04$a-different-hash-value".into();
        assert!(!AuthService::reset_token_matches(&claims, &user));
    }

    #[test]
    fn rejects_garbage_and_foreign_tokens() {
        let auth = AuthService::new(&test_config());
        assert!(auth.decode("invalid_token", TokenPurpose::Reset).is_err());

        let other = AuthService::new(
            &Config::from_lookup(|key| match key {
                "JWT_SECRET_KEY" => Some("another-secret".into()),
                _ => None,
            })
            .unwrap(),
        );
        let foreign = other.issue_access_token(Uuid::new_v4(), UserRole::Donor).unwrap();
        assert!(auth.decode(&foreign.token, TokenPurpose::Access).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let auth = AuthService::new(&test_config());
        let issued = auth
            .sign(Claims {
                sub: Uuid::new_v4(),
                role: UserRole::Donor,
                purpose: TokenPurpose::Access,
                jti: Uuid::new_v4(),
                iat: Utc::now().timestamp() - 7200,
                exp: Utc::now().timestamp() - 3600,
                email: None,
                pwd: None,
            })
            .unwrap();
        assert!(auth.decode(&issued.token, TokenPurpose::Access).is_err());
    }
}
