//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::accounts::AccountService;
use crate::agencies::AgencyService;
use crate::auth::AuthService;
use crate::badges::BadgeService;
use crate::config::Config;
use crate::contracts::ContractService;
use crate::disputes::DisputeService;
use crate::favorites::FavoriteService;
use crate::kyc::KycService;
use crate::marketplace::MarketplaceService;
use crate::messages::MessageService;
use crate::notifications::NotificationService;
use crate::reports::ReportService;
use crate::uploads::UploadService;
use crate::wallet::WalletService;
use crate::websocket::WsState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth_service: Arc<AuthService>,
    pub account_service: Arc<AccountService>,
    pub kyc_service: Arc<KycService>,
    pub marketplace_service: Arc<MarketplaceService>,
    pub agency_service: Arc<AgencyService>,
    pub favorite_service: Arc<FavoriteService>,
    pub badge_service: Arc<BadgeService>,
    pub wallet_service: Arc<WalletService>,
    pub notification_service: Arc<NotificationService>,
    pub message_service: Arc<MessageService>,
    pub dispute_service: Arc<DisputeService>,
    pub contract_service: Arc<ContractService>,
    pub report_service: Arc<ReportService>,
    pub upload_service: Arc<UploadService>,
    pub ws_state: WsState,
}

impl AppState {
    /// Build every service over one connection pool
    pub fn new(config: Config, pool: PgPool) -> Self {
        let currency = config.default_currency.clone();
        Self {
            auth_service: Arc::new(AuthService::new(&config)),
            account_service: Arc::new(AccountService::new(pool.clone())),
            kyc_service: Arc::new(KycService::new(pool.clone())),
            marketplace_service: Arc::new(MarketplaceService::new(
                pool.clone(),
                config.unlock_fee,
                currency.clone(),
            )),
            agency_service: Arc::new(AgencyService::new(pool.clone(), currency.clone())),
            favorite_service: Arc::new(FavoriteService::new(pool.clone())),
            badge_service: Arc::new(BadgeService::new(pool.clone())),
            wallet_service: Arc::new(WalletService::new(pool.clone(), currency)),
            notification_service: Arc::new(NotificationService::new(pool.clone())),
            message_service: Arc::new(MessageService::new(pool.clone())),
            dispute_service: Arc::new(DisputeService::new(pool.clone())),
            contract_service: Arc::new(ContractService::new(pool.clone())),
            report_service: Arc::new(ReportService::new(pool)),
            upload_service: Arc::new(UploadService::new(config.upload_dir.clone())),
            ws_state: WsState::new(),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}
