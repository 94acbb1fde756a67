//! Money and workflow invariants checked against a real database.
//!
//! These run only when `DATABASE_URL` points at a disposable Postgres
//! database; without it each test returns early.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use sdc_server::accounts::{AccountService, NewAccount};
use sdc_server::agencies::{AgencyError, AgencyService};
use sdc_server::kyc::{KycError, KycService, ReviewKycRequest, SubmitKycRequest};
use sdc_server::marketplace::{MarketplaceError, MarketplaceService};
use sdc_server::models::{Agency, EscrowStatus, KycStatus, SubscriptionPlan, User, UserRole};
use sdc_server::wallet::{
    commission_amount, CreateEscrowRequest, WalletError, WalletService,
    ESCROW_COMMISSION_CATEGORY,
};

const CURRENCY: &str = "NGN";

async fn pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Some(pool)
}

async fn register(pool: &PgPool, role: UserRole) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    AccountService::new(pool.clone())
        .register(NewAccount {
            email: format!("{}@ledger.test", tag),
            username: format!("user_{}", tag),
            password_hash: "not-a-real-hash".into(),
            role,
            first_name: Some("Test".into()),
            last_name: None,
            agency_name: None,
            form_data: serde_json::json!({}),
            currency: CURRENCY.into(),
        })
        .await
        .unwrap()
}

async fn balance(wallets: &WalletService, user_id: Uuid) -> i64 {
    wallets.get_or_create(user_id).await.unwrap().balance
}

async fn ledger_total(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0)::BIGINT FROM wallet_transactions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn withdrawals_cannot_overdraw() {
    let Some(pool) = pool().await else { return };
    let wallets = WalletService::new(pool.clone(), CURRENCY.into());
    let user = register(&pool, UserRole::IntendingParent).await;

    wallets.deposit(user.id, 1_000, None).await.unwrap();
    let result = wallets.withdraw(user.id, 1_500, None).await;
    assert!(matches!(result, Err(WalletError::InsufficientFunds)));

    assert_eq!(balance(&wallets, user.id).await, 1_000);
    assert_eq!(ledger_total(&pool, user.id).await, 1_000);

    let change = wallets.withdraw(user.id, 1_000, None).await.unwrap();
    assert_eq!(change.new_balance, 0);
}

#[tokio::test]
async fn escrow_release_pays_net_and_closes() {
    let Some(pool) = pool().await else { return };
    let wallets = WalletService::new(pool.clone(), CURRENCY.into());
    let payer = register(&pool, UserRole::IntendingParent).await;
    let beneficiary = register(&pool, UserRole::Surrogate).await;
    wallets.deposit(payer.id, 100_000, None).await.unwrap();

    let request = CreateEscrowRequest {
        beneficiary_id: beneficiary.id,
        amount: 60_000,
        escrow_type: "surrogate_payment".into(),
        description: None,
    };
    let escrow = wallets.hold_escrow(payer.id, &request).await.unwrap();
    assert_eq!(balance(&wallets, payer.id).await, 40_000);

    // The beneficiary cannot pay themselves out
    let result = wallets.release_escrow(escrow.id, beneficiary.id, false).await;
    assert!(matches!(result, Err(WalletError::Forbidden)));

    let percent: f64 =
        sqlx::query_scalar("SELECT percent FROM commission_settings WHERE category = $1")
            .bind(ESCROW_COMMISSION_CATEGORY)
            .fetch_optional(&pool)
            .await
            .unwrap()
            .unwrap_or(0.0);
    let expected_commission = commission_amount(60_000, percent);

    let released = wallets.release_escrow(escrow.id, payer.id, false).await.unwrap();
    assert_eq!(released.status, EscrowStatus::Released);
    assert_eq!(released.commission, expected_commission);
    assert_eq!(
        balance(&wallets, beneficiary.id).await,
        60_000 - expected_commission
    );
    assert_eq!(
        ledger_total(&pool, beneficiary.id).await,
        60_000 - expected_commission
    );

    for result in [
        wallets.release_escrow(escrow.id, payer.id, false).await,
        wallets.refund_escrow(escrow.id, beneficiary.id, false).await,
        wallets.refund_escrow(escrow.id, Uuid::new_v4(), true).await,
    ] {
        assert!(matches!(
            result,
            Err(WalletError::EscrowClosed(EscrowStatus::Released))
        ));
    }
    assert_eq!(balance(&wallets, payer.id).await, 40_000);
}

#[tokio::test]
async fn approved_kyc_is_locked_for_its_owner() {
    let Some(pool) = pool().await else { return };
    let kyc = KycService::new(pool.clone());
    let owner = register(&pool, UserRole::Surrogate).await;
    let admin = register(&pool, UserRole::Admin).await;

    let doc = kyc.get_for_user(owner.id).await.unwrap().unwrap();
    kyc.review(
        doc.id,
        admin.id,
        &ReviewKycRequest {
            status: KycStatus::Approved,
            note: None,
        },
    )
    .await
    .unwrap();

    let result = kyc
        .submit(
            &owner,
            SubmitKycRequest {
                form_progress: Some(10),
                status: Some(KycStatus::InProgress),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(KycError::Locked)));

    let doc = kyc.get_for_user(owner.id).await.unwrap().unwrap();
    assert_eq!(doc.status, KycStatus::Approved);
}

#[tokio::test]
async fn second_unlock_is_rejected_and_not_charged() {
    let Some(pool) = pool().await else { return };
    let fee = 1_000;
    let wallets = WalletService::new(pool.clone(), CURRENCY.into());
    let marketplace = MarketplaceService::new(pool.clone(), fee, CURRENCY.into());
    let parent = register(&pool, UserRole::IntendingParent).await;
    let surrogate = register(&pool, UserRole::Surrogate).await;
    wallets.deposit(parent.id, 5_000, None).await.unwrap();

    let id = surrogate.id.to_string();
    marketplace.unlock(parent.id, &id).await.unwrap();

    for spelling in [
        id.clone(),
        id.to_uppercase(),
        surrogate.id.simple().to_string(),
        surrogate.id.urn().to_string(),
    ] {
        let result = marketplace.unlock(parent.id, &spelling).await;
        assert!(
            matches!(result, Err(MarketplaceError::AlreadyUnlocked)),
            "{}",
            spelling
        );
    }

    assert_eq!(balance(&wallets, parent.id).await, 5_000 - fee);
    assert_eq!(marketplace.list_unlocks(parent.id).await.unwrap(), vec![id]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_subscribes_charge_once() {
    let Some(pool) = pool().await else { return };
    let wallets = WalletService::new(pool.clone(), CURRENCY.into());
    let agencies = AgencyService::new(pool.clone(), CURRENCY.into());
    let owner = register(&pool, UserRole::Agency).await;
    let price = SubscriptionPlan::Basic.price();
    wallets.deposit(owner.id, price * 3, None).await.unwrap();

    let agency = sqlx::query_as::<_, Agency>("SELECT * FROM agencies WHERE owner_id = $1")
        .bind(owner.id)
        .fetch_one(&pool)
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        agencies.subscribe(&agency, SubscriptionPlan::Basic),
        agencies.subscribe(&agency, SubscriptionPlan::Basic),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AgencyError::AlreadySubscribed))));

    assert_eq!(balance(&wallets, owner.id).await, price * 2);
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscriptions WHERE user_id = $1 AND status = 'active'",
    )
    .bind(owner.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(active, 1);
}
