//! Wallet, ledger and escrow service
//!
//! Every balance change happens inside a database transaction that locks
//! the affected wallet rows (`FOR UPDATE`, in user-id order when several
//! are involved) and writes one signed ledger row per wallet touched.
//! Credits are positive, debits negative, so a wallet balance always equals
//! the sum of its posted ledger rows.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    EscrowStatus, EscrowTransaction, TransactionStatus, TransactionType, Wallet, WalletTransaction,
};

/// Commission category applied when escrow is released
pub const ESCROW_COMMISSION_CATEGORY: &str = "escrow";

/// Wallet service error
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Insufficient balance")]
    InsufficientFunds,
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("Cannot transfer to yourself")]
    SelfTransfer,
    #[error("Recipient not found")]
    RecipientNotFound,
    #[error("Transaction not found")]
    TransactionNotFound,
    #[error("Escrow not found")]
    EscrowNotFound,
    #[error("Escrow is already {0:?}")]
    EscrowClosed(EscrowStatus),
    #[error("Not allowed to act on this escrow")]
    Forbidden,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AmountRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    pub recipient_id: Uuid,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEscrowRequest {
    pub beneficiary_id: Uuid,
    #[validate(range(min = 1))]
    pub amount: i64,
    /// Free-form purpose, e.g. `surrogate_payment`
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub escrow_type: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Result of a transfer
#[derive(Debug, Serialize)]
pub struct TransferOutcome {
    pub message: String,
    pub reference: String,
    pub sender_new_balance: i64,
    pub recipient_new_balance: i64,
}

/// Result of a deposit or withdrawal
#[derive(Debug, Serialize)]
pub struct BalanceChange {
    pub message: String,
    pub reference: String,
    pub new_balance: i64,
}

/// Ledger row to append inside a transaction
struct LedgerEntry<'a> {
    user_id: Uuid,
    amount: i64,
    kind: TransactionType,
    reference: &'a str,
    description: Option<&'a str>,
    counterparty_id: Option<Uuid>,
}

/// Generate a unique ledger reference with a readable prefix
pub fn new_reference(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple()).to_uppercase()
}

/// Commission on `amount` at `percent`, rounded to the nearest minor unit
pub fn commission_amount(amount: i64, percent: f64) -> i64 {
    if amount <= 0 || !percent.is_finite() || percent <= 0.0 {
        return 0;
    }
    let raw = (amount as f64 * percent / 100.0).round() as i64;
    raw.clamp(0, amount)
}

/// Balance after applying a signed amount; wallets never go negative
pub fn next_balance(balance: i64, delta: i64) -> Result<i64, WalletError> {
    let new_balance = balance.checked_add(delta).ok_or(WalletError::InvalidAmount)?;
    if new_balance < 0 {
        return Err(WalletError::InsufficientFunds);
    }
    Ok(new_balance)
}

/// Beneficiary payout and platform commission for releasing `amount`.
/// The two always add up to `amount`.
pub fn release_split(amount: i64, percent: f64) -> (i64, i64) {
    let commission = commission_amount(amount, percent);
    (amount - commission, commission)
}

/// Only held escrows can be released or refunded
pub fn ensure_held(status: EscrowStatus) -> Result<(), WalletError> {
    if status != EscrowStatus::Held {
        return Err(WalletError::EscrowClosed(status));
    }
    Ok(())
}

/// The payer or an admin may release an escrow
pub fn may_release(escrow: &EscrowTransaction, actor_id: Uuid, actor_is_admin: bool) -> bool {
    escrow.user_id == actor_id || actor_is_admin
}

/// The beneficiary or an admin may refund an escrow
pub fn may_refund(escrow: &EscrowTransaction, actor_id: Uuid, actor_is_admin: bool) -> bool {
    escrow.beneficiary_id == actor_id || actor_is_admin
}

/// Wallet service
pub struct WalletService {
    pool: PgPool,
    currency: String,
}

impl WalletService {
    pub fn new(pool: PgPool, currency: String) -> Self {
        Self { pool, currency }
    }

    /// Fetch a wallet, creating an empty one for accounts that predate wallets
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Wallet, WalletError> {
        sqlx::query(
            "INSERT INTO wallets (user_id, currency) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(&self.currency)
        .execute(&self.pool)
        .await?;

        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(wallet)
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let txs = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(txs)
    }

    pub async fn get_transaction(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<WalletTransaction, WalletError> {
        sqlx::query_as::<_, WalletTransaction>(
            "SELECT * FROM wallet_transactions WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(WalletError::TransactionNotFound)
    }

    pub async fn deposit(
        &self,
        user_id: Uuid,
        amount: i64,
        description: Option<&str>,
    ) -> Result<BalanceChange, WalletError> {
        ensure_positive(amount)?;
        let reference = new_reference("DEP");

        let mut tx = self.pool.begin().await?;
        self.ensure_wallets(&mut tx, &[user_id]).await?;
        let new_balance = Self::apply(
            &mut tx,
            LedgerEntry {
                user_id,
                amount,
                kind: TransactionType::Deposit,
                reference: &reference,
                description,
                counterparty_id: None,
            },
            &self.currency,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%user_id, amount, %reference, "funds added");
        Ok(BalanceChange {
            message: "Funds added successfully".to_string(),
            reference,
            new_balance,
        })
    }

    pub async fn withdraw(
        &self,
        user_id: Uuid,
        amount: i64,
        description: Option<&str>,
    ) -> Result<BalanceChange, WalletError> {
        ensure_positive(amount)?;
        let reference = new_reference("WDR");

        let mut tx = self.pool.begin().await?;
        self.ensure_wallets(&mut tx, &[user_id]).await?;
        let new_balance = Self::apply(
            &mut tx,
            LedgerEntry {
                user_id,
                amount: -amount,
                kind: TransactionType::Withdrawal,
                reference: &reference,
                description,
                counterparty_id: None,
            },
            &self.currency,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%user_id, amount, %reference, "funds withdrawn");
        Ok(BalanceChange {
            message: "Funds withdrawn successfully".to_string(),
            reference,
            new_balance,
        })
    }

    pub async fn transfer(
        &self,
        sender_id: Uuid,
        req: &TransferRequest,
    ) -> Result<TransferOutcome, WalletError> {
        ensure_positive(req.amount)?;
        if sender_id == req.recipient_id {
            return Err(WalletError::SelfTransfer);
        }

        let recipient_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active)")
                .bind(req.recipient_id)
                .fetch_one(&self.pool)
                .await?;
        if !recipient_exists {
            return Err(WalletError::RecipientNotFound);
        }

        let reference = new_reference("TRF");
        let description = req.description.as_deref();

        let mut tx = self.pool.begin().await?;
        self.ensure_wallets(&mut tx, &[sender_id, req.recipient_id]).await?;
        lock_wallets(&mut tx, &[sender_id, req.recipient_id]).await?;

        let sender_new_balance = Self::apply(
            &mut tx,
            LedgerEntry {
                user_id: sender_id,
                amount: -req.amount,
                kind: TransactionType::TransferOut,
                reference: &format!("{}_OUT", reference),
                description,
                counterparty_id: Some(req.recipient_id),
            },
            &self.currency,
        )
        .await?;
        let recipient_new_balance = Self::apply(
            &mut tx,
            LedgerEntry {
                user_id: req.recipient_id,
                amount: req.amount,
                kind: TransactionType::TransferIn,
                reference: &format!("{}_IN", reference),
                description,
                counterparty_id: Some(sender_id),
            },
            &self.currency,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%sender_id, recipient_id = %req.recipient_id, amount = req.amount, %reference, "transfer posted");
        Ok(TransferOutcome {
            message: "Transfer successful".to_string(),
            reference,
            sender_new_balance,
            recipient_new_balance,
        })
    }

    /// Create the wallet if needed and hold its row lock until `tx` ends.
    ///
    /// Callers that check-then-charge take this lock first so concurrent
    /// requests for the same user run one after the other.
    pub async fn lock_in(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        currency: &str,
    ) -> Result<Wallet, WalletError> {
        sqlx::query(
            "INSERT INTO wallets (user_id, currency) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(currency)
        .execute(&mut **tx)
        .await?;

        let wallet =
            sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(wallet)
    }

    /// Debit a wallet as part of a caller-owned transaction
    pub async fn debit_in(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: i64,
        kind: TransactionType,
        description: Option<&str>,
        currency: &str,
    ) -> Result<i64, WalletError> {
        ensure_positive(amount)?;
        Self::lock_in(tx, user_id, currency).await?;

        let reference = new_reference(match kind {
            TransactionType::MarketplaceUnlock => "UNL",
            TransactionType::Subscription => "SUB",
            _ => "DEB",
        });
        Self::apply(
            tx,
            LedgerEntry {
                user_id,
                amount: -amount,
                kind,
                reference: &reference,
                description,
                counterparty_id: None,
            },
            currency,
        )
        .await
    }

    /// Move funds from the payer's wallet into escrow
    pub async fn hold_escrow(
        &self,
        payer_id: Uuid,
        req: &CreateEscrowRequest,
    ) -> Result<EscrowTransaction, WalletError> {
        ensure_positive(req.amount)?;
        if payer_id == req.beneficiary_id {
            return Err(WalletError::SelfTransfer);
        }

        let beneficiary_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active)")
                .bind(req.beneficiary_id)
                .fetch_one(&self.pool)
                .await?;
        if !beneficiary_exists {
            return Err(WalletError::RecipientNotFound);
        }

        let reference = new_reference("ESC");
        let mut tx = self.pool.begin().await?;
        self.ensure_wallets(&mut tx, &[payer_id]).await?;

        Self::apply(
            &mut tx,
            LedgerEntry {
                user_id: payer_id,
                amount: -req.amount,
                kind: TransactionType::EscrowHold,
                reference: &format!("{}_HOLD", reference),
                description: req.description.as_deref(),
                counterparty_id: Some(req.beneficiary_id),
            },
            &self.currency,
        )
        .await?;

        let escrow = sqlx::query_as::<_, EscrowTransaction>(
            r#"
            INSERT INTO escrow_transactions
                (user_id, beneficiary_id, amount, currency, type, status, reference, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(payer_id)
        .bind(req.beneficiary_id)
        .bind(req.amount)
        .bind(&self.currency)
        .bind(&req.escrow_type)
        .bind(EscrowStatus::Held)
        .bind(&reference)
        .bind(&req.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(escrow_id = %escrow.id, %payer_id, amount = escrow.amount, "escrow held");
        Ok(escrow)
    }

    pub async fn get_escrow(&self, id: Uuid) -> Result<Option<EscrowTransaction>, WalletError> {
        let escrow = sqlx::query_as::<_, EscrowTransaction>(
            "SELECT * FROM escrow_transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(escrow)
    }

    /// Escrows where the user pays or benefits
    pub async fn list_escrows(&self, user_id: Uuid) -> Result<Vec<EscrowTransaction>, WalletError> {
        let escrows = sqlx::query_as::<_, EscrowTransaction>(
            r#"
            SELECT * FROM escrow_transactions
            WHERE user_id = $1 OR beneficiary_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(escrows)
    }

    /// Pay a held escrow out to its beneficiary, less commission.
    ///
    /// Allowed for the payer or an admin.
    pub async fn release_escrow(
        &self,
        id: Uuid,
        actor_id: Uuid,
        actor_is_admin: bool,
    ) -> Result<EscrowTransaction, WalletError> {
        let mut tx = self.pool.begin().await?;
        let escrow = lock_held_escrow(&mut tx, id).await?;
        if !may_release(&escrow, actor_id, actor_is_admin) {
            return Err(WalletError::Forbidden);
        }

        let percent: Option<f64> =
            sqlx::query_scalar("SELECT percent FROM commission_settings WHERE category = $1")
                .bind(ESCROW_COMMISSION_CATEGORY)
                .fetch_optional(&mut *tx)
                .await?;
        let (payout, commission) = release_split(escrow.amount, percent.unwrap_or(0.0));

        self.ensure_wallets(&mut tx, &[escrow.beneficiary_id]).await?;
        Self::apply(
            &mut tx,
            LedgerEntry {
                user_id: escrow.beneficiary_id,
                amount: escrow.amount,
                kind: TransactionType::EscrowRelease,
                reference: &format!("{}_REL", escrow.reference),
                description: escrow.description.as_deref(),
                counterparty_id: Some(escrow.user_id),
            },
            &self.currency,
        )
        .await?;
        if commission > 0 {
            Self::apply(
                &mut tx,
                LedgerEntry {
                    user_id: escrow.beneficiary_id,
                    amount: -commission,
                    kind: TransactionType::Commission,
                    reference: &format!("{}_COM", escrow.reference),
                    description: Some("Platform commission"),
                    counterparty_id: None,
                },
                &self.currency,
            )
            .await?;
        }

        let escrow = sqlx::query_as::<_, EscrowTransaction>(
            r#"
            UPDATE escrow_transactions
            SET status = $2, commission = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(EscrowStatus::Released)
        .bind(commission)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(escrow_id = %id, payout, commission, "escrow released");
        Ok(escrow)
    }

    /// Return a held escrow to its payer.
    ///
    /// Allowed for the beneficiary (declining the payment) or an admin.
    pub async fn refund_escrow(
        &self,
        id: Uuid,
        actor_id: Uuid,
        actor_is_admin: bool,
    ) -> Result<EscrowTransaction, WalletError> {
        let mut tx = self.pool.begin().await?;
        let escrow = lock_held_escrow(&mut tx, id).await?;
        if !may_refund(&escrow, actor_id, actor_is_admin) {
            return Err(WalletError::Forbidden);
        }

        self.ensure_wallets(&mut tx, &[escrow.user_id]).await?;
        Self::apply(
            &mut tx,
            LedgerEntry {
                user_id: escrow.user_id,
                amount: escrow.amount,
                kind: TransactionType::EscrowRefund,
                reference: &format!("{}_REF", escrow.reference),
                description: escrow.description.as_deref(),
                counterparty_id: Some(escrow.beneficiary_id),
            },
            &self.currency,
        )
        .await?;

        let escrow = sqlx::query_as::<_, EscrowTransaction>(
            "UPDATE escrow_transactions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(EscrowStatus::Refunded)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(escrow_id = %id, "escrow refunded");
        Ok(escrow)
    }

    async fn ensure_wallets(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_ids: &[Uuid],
    ) -> Result<(), WalletError> {
        for user_id in user_ids {
            sqlx::query(
                "INSERT INTO wallets (user_id, currency) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(&self.currency)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Apply a signed amount to a wallet and append the ledger row.
    /// Returns the new balance.
    async fn apply(
        tx: &mut Transaction<'_, Postgres>,
        entry: LedgerEntry<'_>,
        currency: &str,
    ) -> Result<i64, WalletError> {
        let balance: i64 =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
                .bind(entry.user_id)
                .fetch_one(&mut **tx)
                .await?;

        let new_balance = next_balance(balance, entry.amount)?;

        sqlx::query("UPDATE wallets SET balance = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(entry.user_id)
            .bind(new_balance)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions
                (user_id, amount, currency, type, status, reference, description, counterparty_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.amount)
        .bind(currency)
        .bind(entry.kind)
        .bind(TransactionStatus::Posted)
        .bind(entry.reference)
        .bind(entry.description)
        .bind(entry.counterparty_id)
        .execute(&mut **tx)
        .await?;

        Ok(new_balance)
    }
}

fn ensure_positive(amount: i64) -> Result<(), WalletError> {
    if amount <= 0 {
        Err(WalletError::InvalidAmount)
    } else {
        Ok(())
    }
}

/// Lock several wallets in a stable order so concurrent transfers between
/// the same pair cannot deadlock
async fn lock_wallets(
    tx: &mut Transaction<'_, Postgres>,
    user_ids: &[Uuid],
) -> Result<(), WalletError> {
    let mut ids = user_ids.to_vec();
    ids.sort();
    sqlx::query("SELECT user_id FROM wallets WHERE user_id = ANY($1) ORDER BY user_id FOR UPDATE")
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await?;
    Ok(())
}

async fn lock_held_escrow(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<EscrowTransaction, WalletError> {
    let escrow = sqlx::query_as::<_, EscrowTransaction>(
        "SELECT * FROM escrow_transactions WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(WalletError::EscrowNotFound)?;

    ensure_held(escrow.status)?;
    Ok(escrow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_rounds_to_minor_units() {
        assert_eq!(commission_amount(1_500_000, 10.0), 150_000);
        assert_eq!(commission_amount(999, 2.5), 25);
        assert_eq!(commission_amount(1_000, 0.0), 0);
    }

    #[test]
    fn commission_never_exceeds_amount() {
        assert_eq!(commission_amount(1_000, 250.0), 1_000);
        assert_eq!(commission_amount(1_000, f64::NAN), 0);
        assert_eq!(commission_amount(-5, 10.0), 0);
    }

    #[test]
    fn balances_never_go_negative() {
        assert_eq!(next_balance(500, -500).unwrap(), 0);
        assert_eq!(next_balance(500, 250).unwrap(), 750);
        assert!(matches!(
            next_balance(500, -501),
            Err(WalletError::InsufficientFunds)
        ));
        assert!(matches!(
            next_balance(0, -1),
            Err(WalletError::InsufficientFunds)
        ));
        assert!(matches!(
            next_balance(i64::MAX, 1),
            Err(WalletError::InvalidAmount)
        ));
    }

    #[test]
    fn release_pays_amount_less_commission() {
        assert_eq!(release_split(1_500_000, 10.0), (1_350_000, 150_000));
        assert_eq!(release_split(1_000, 0.0), (1_000, 0));
        for (amount, percent) in [(999, 2.5), (1, 50.0), (7_777, 33.3), (1_000, 250.0)] {
            let (payout, commission) = release_split(amount, percent);
            assert_eq!(payout + commission, amount);
            assert!(payout >= 0);
        }
    }

    fn escrow(status: EscrowStatus) -> EscrowTransaction {
        EscrowTransaction {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            beneficiary_id: Uuid::new_v4(),
            amount: 50_000,
            commission: 0,
            currency: "NGN".into(),
            escrow_type: "surrogate_payment".into(),
            status,
            reference: new_reference("ESC"),
            description: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn only_held_escrows_move() {
        assert!(ensure_held(EscrowStatus::Held).is_ok());
        for status in [EscrowStatus::Released, EscrowStatus::Refunded] {
            assert!(matches!(
                ensure_held(status),
                Err(WalletError::EscrowClosed(s)) if s == status
            ));
        }
    }

    #[test]
    fn escrow_sides_have_distinct_powers() {
        let held = escrow(EscrowStatus::Held);
        let stranger = Uuid::new_v4();

        assert!(may_release(&held, held.user_id, false));
        assert!(!may_release(&held, held.beneficiary_id, false));
        assert!(may_release(&held, stranger, true));

        assert!(may_refund(&held, held.beneficiary_id, false));
        assert!(!may_refund(&held, held.user_id, false));
        assert!(!may_refund(&held, stranger, false));
        assert!(may_refund(&held, stranger, true));
    }

    #[test]
    fn references_are_unique_and_prefixed() {
        let a = new_reference("ESC");
        let b = new_reference("ESC");
        assert!(a.starts_with("ESC_"));
        assert_ne!(a, b);
        assert_eq!(a, a.to_uppercase());
    }

    #[test]
    fn amounts_must_be_positive() {
        let req = AmountRequest {
            amount: 0,
            description: None,
        };
        assert!(req.validate().is_err());
        assert!(ensure_positive(-1).is_err());
        assert!(ensure_positive(1).is_ok());
    }

    #[test]
    fn escrow_request_uses_type_key() {
        let req: CreateEscrowRequest = serde_json::from_str(
            r#"{"beneficiary_id": "6f1c2a8e-6d4b-4c37-9f0e-1b2a3c4d5e6f", "amount": 50000, "type": "surrogate_payment"}"#,
        )
        .unwrap();
        assert_eq!(req.escrow_type, "surrogate_payment");
        assert!(req.validate().is_ok());
    }
}
