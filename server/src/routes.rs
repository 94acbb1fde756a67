//! Route definitions for the SDC API

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::app_state::AppState;
use crate::handlers::{
    admin, agencies, auth, badges, contracts, disputes, favorites, kyc, marketplace, messages,
    notifications, users, wallet,
};
use crate::websocket;

// Auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/auth/profile",
            get(auth::me)
                .put(auth::update_profile)
                .delete(auth::delete_profile),
        )
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/update-password", post(auth::change_password))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route(
            "/api/auth/reset-password",
            post(auth::reset_password).put(auth::reset_password),
        )
        .route("/api/auth/verify-email", get(auth::verify_email_query))
        .route("/api/auth/verify-email/:token", get(auth::verify_email_path))
}

// User directory routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", get(users::get_user))
}

// KYC routes
pub fn kyc_routes() -> Router<AppState> {
    Router::new()
        .route("/api/kyc/status", get(kyc::kyc_status))
        .route(
            "/api/kyc/documents",
            get(kyc::list_documents).post(kyc::submit_document),
        )
        .route("/api/admin/kyc", get(kyc::admin_list_kyc))
        .route("/api/admin/kyc/:id/status", put(kyc::admin_review_kyc))
}

// Marketplace routes
pub fn marketplace_routes() -> Router<AppState> {
    Router::new()
        .route("/api/marketplace/surrogates", get(marketplace::list_surrogates))
        .route("/api/marketplace/surrogates/:id", get(marketplace::get_surrogate))
        .route("/api/marketplace/unlocks", get(marketplace::list_unlocks))
        .route("/api/marketplace/unlock", post(marketplace::unlock_profile))
        .route(
            "/api/marketplace/commission-settings",
            get(marketplace::commission_settings).post(marketplace::update_commission),
        )
}

// Agency routes
pub fn agency_routes() -> Router<AppState> {
    Router::new()
        .route("/api/agencies", get(agencies::list_agencies))
        .route("/api/agencies/:id", get(agencies::get_agency))
        .route("/api/agencies/:id/roster", get(agencies::agency_roster))
        .route(
            "/api/agencies/:id/subscription",
            get(agencies::get_subscription).post(agencies::subscribe),
        )
        .route("/api/agencies/:id/wallet", get(agencies::agency_wallet))
}

// Favorites and badge routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/favorites",
            get(favorites::list_favorites)
                .post(favorites::add_favorite)
                .delete(favorites::remove_favorite),
        )
        .route("/api/verification-badges", get(badges::list_badges))
        .route("/api/admin/badges", post(badges::create_badge))
        .route("/api/admin/badges/:id", put(badges::update_badge))
}

// Wallet and escrow routes
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wallet/balance", get(wallet::get_balance))
        .route("/api/wallet/transactions", get(wallet::list_transactions))
        .route("/api/wallet/transactions/:id", get(wallet::get_transaction))
        .route("/api/wallet/add-funds", post(wallet::add_funds))
        .route("/api/wallet/withdraw", post(wallet::withdraw))
        .route("/api/wallet/transfer", post(wallet::transfer))
        .route(
            "/api/wallet/escrow",
            get(wallet::list_escrows).post(wallet::create_escrow),
        )
        .route("/api/wallet/escrow/:id", get(wallet::get_escrow))
        .route("/api/wallet/escrow/:id/release", post(wallet::release_escrow))
        .route("/api/wallet/escrow/:id/refund", post(wallet::refund_escrow))
}

// Notification routes
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/read-all", put(notifications::mark_all_read))
        .route("/api/notifications/:id/read", put(notifications::mark_read))
        .route("/api/notifications/send", post(notifications::send_notification))
        .route(
            "/api/notifications/send-to-role",
            post(notifications::send_to_role),
        )
}

// Messaging and upload routes
pub fn message_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/messages", post(messages::send_message))
        .route("/api/messages/:conversation_id", get(messages::list_messages))
        .route(
            "/api/upload",
            post(messages::upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

// Dispute and contract routes
pub fn case_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/disputes",
            get(disputes::my_disputes).post(disputes::create_dispute),
        )
        .route("/api/admin/disputes", get(disputes::admin_list_disputes))
        .route("/api/admin/disputes/:id", get(disputes::admin_get_dispute))
        .route(
            "/api/admin/disputes/:id/resolve",
            post(disputes::resolve_dispute),
        )
        .route(
            "/api/contracts",
            get(contracts::my_contracts).post(contracts::create_contract),
        )
        .route("/api/contracts/:id/sign", put(contracts::sign_contract))
        .route(
            "/api/admin/contract-templates",
            get(contracts::list_templates).post(contracts::create_template),
        )
        .route("/api/admin/contracts", get(contracts::admin_list_contracts))
        .route("/api/admin/contracts/:id", get(contracts::admin_get_contract))
        .route(
            "/api/admin/contracts/:id/status",
            put(contracts::admin_set_contract_status),
        )
}

// Admin console routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route(
            "/api/admin/users/:id",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/api/admin/agencies", get(admin::list_agencies))
        .route(
            "/api/admin/agencies/:id",
            get(admin::get_agency)
                .put(admin::update_agency)
                .delete(admin::delete_agency),
        )
        .route("/api/admin/reports", get(admin::activity_report))
        .route("/api/admin/finance", get(admin::finance_summary))
}

/// Assemble the full application router
pub fn app(state: AppState) -> Router {
    let upload_dir = state.config.upload_dir.clone();
    let max_upload_bytes = state.config.max_upload_bytes;
    let cors = configure_cors(&state.config.cors_allowed_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ws", get(websocket::ws_handler))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(kyc_routes())
        .merge(marketplace_routes())
        .merge(agency_routes())
        .merge(profile_routes())
        .merge(wallet_routes())
        .merge(notification_routes())
        .merge(message_routes(max_upload_bytes))
        .merge(case_routes())
        .merge(admin_routes())
        .nest_service("/api/uploads", ServeDir::new(upload_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "SDC Backend is running!",
        "status": "healthy",
    }))
}

async fn health_check() -> &'static str {
    "OK"
}

fn configure_cors(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_reports_healthy() {
        let Json(body) = root().await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["message"], "SDC Backend is running!");
    }

    #[test]
    fn invalid_origins_are_skipped() {
        // Must not panic on a malformed origin
        let _ = configure_cors(&["http://localhost:3000".into(), "bad\norigin".into()]);
    }
}
