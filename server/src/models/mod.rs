//! Data models for the SDC backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            is_verified: user.is_verified,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Agency,
    Donor,
    Surrogate,
    IntendingParent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agency => "agency",
            Self::Donor => "donor",
            Self::Surrogate => "surrogate",
            Self::IntendingParent => "intending_parent",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    /// Case-insensitive; accepts `intending-parent` and `ip` for the parent role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "admin" => Ok(Self::Admin),
            "agency" => Ok(Self::Agency),
            "donor" => Ok(Self::Donor),
            "surrogate" => Ok(Self::Surrogate),
            "intending_parent" | "ip" => Ok(Self::IntendingParent),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// Agency model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Agency {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub status: AgencyStatus,
    pub created_at: DateTime<Utc>,
}

/// Agency status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "agency_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AgencyStatus {
    Pending,
    Approved,
    Suspended,
}

/// KYC document, one per user
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct KycDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
    pub status: KycStatus,
    pub form_data: Json<serde_json::Value>,
    pub form_progress: i32,
    pub agency_id: Option<Uuid>,
    pub file_url: Option<String>,
    pub review_note: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// KYC status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "kyc_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    InProgress,
    Submitted,
    Approved,
    Rejected,
}

/// Wallet, one per user
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: i64,
    pub referral_balance: i64,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub reference: String,
    pub description: Option<String>,
    pub counterparty_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Transaction types
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    EscrowHold,
    EscrowRelease,
    EscrowRefund,
    Commission,
    MarketplaceUnlock,
    Subscription,
    ReferralBonus,
}

/// Transaction status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Posted,
    Failed,
}

/// Escrow transaction model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct EscrowTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub beneficiary_id: Uuid,
    pub amount: i64,
    pub commission: i64,
    pub currency: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub escrow_type: String,
    pub status: EscrowStatus,
    pub reference: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Escrow status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "escrow_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
}

/// Marketplace unlock record
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct MarketplaceUnlock {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: String,
    pub amount_paid: i64,
    pub created_at: DateTime<Utc>,
}

/// Favorite model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Favorite {
    pub id: Uuid,
    pub ip_id: Uuid,
    pub target_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Verification badge model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct VerificationBadge {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub badge_type: String,
    pub status: BadgeStatus,
    pub created_at: DateTime<Utc>,
}

/// Badge status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "badge_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BadgeStatus {
    Pending,
    Approved,
    Rejected,
}

/// Commission percentage per category
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CommissionSetting {
    pub id: Uuid,
    pub category: String,
    pub percent: f64,
    pub updated_at: DateTime<Utc>,
}

/// Chat message model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_user_id: Uuid,
    pub content: Option<String>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notification model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub severity: NotificationSeverity,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

/// Notification severity
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "notification_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    #[default]
    Info,
    Warning,
    Error,
}

/// Notification read state
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

/// Dispute model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Dispute {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_id: Option<Uuid>,
    pub reason: String,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dispute status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    InReview,
    Resolved,
    Rejected,
}

impl DisputeStatus {
    /// Resolved and rejected disputes are closed for good
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

/// Contract model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Contract {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub signer_id: Uuid,
    pub template_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub status: ContractStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Contract status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "contract_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Pending,
    Signed,
    Cancelled,
}

/// Contract template model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ContractTemplate {
    pub id: Uuid,
    pub name: String,
    pub body: String,
    pub variables: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Agency subscription model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlan,
    pub amount: i64,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Subscription plans
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "subscription_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Basic,
    Premium,
}

impl SubscriptionPlan {
    /// Monthly price in minor units
    pub fn price(&self) -> i64 {
        match self {
            Self::Basic => 2_000_000,
            Self::Premium => 5_000_000,
        }
    }
}

/// Subscription status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Expired,
    Cancelled,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Confirmation body for operations without a richer result
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Pagination parameters
#[derive(Debug, Deserialize, Default)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Limit clamped to 1..=100, default 50
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Optional look-back window for reports
#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub days: Option<i64>,
}

impl PeriodParams {
    /// Window in days, clamped to 1..=3650, default 30
    pub fn days(&self) -> i64 {
        self.days.unwrap_or(30).clamp(1, 3650)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_accepts_aliases() {
        assert_eq!("ADMIN".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(
            "intending-parent".parse::<UserRole>(),
            Ok(UserRole::IntendingParent)
        );
        assert_eq!("ip".parse::<UserRole>(), Ok(UserRole::IntendingParent));
        assert!("invalid_role".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&UserRole::IntendingParent).unwrap();
        assert_eq!(json, "\"intending_parent\"");
        assert_eq!(UserRole::IntendingParent.to_string(), "intending_parent");
    }

    #[test]
    fn pagination_is_clamped() {
        let params = PaginationParams {
            limit: Some(1_000),
            offset: Some(-5),
        };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 0);
        assert_eq!(PaginationParams::default().limit(), 50);
    }

    #[test]
    fn closed_disputes() {
        assert!(DisputeStatus::Resolved.is_closed());
        assert!(DisputeStatus::Rejected.is_closed());
        assert!(!DisputeStatus::InReview.is_closed());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            role: UserRole::Donor,
            email: "donor@test.com".into(),
            username: "donor".into(),
            password_hash: "$2b$04$secret".into(),
            first_name: None,
            last_name: None,
            phone: None,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
