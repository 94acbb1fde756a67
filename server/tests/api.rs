//! Router-level tests for requests that resolve before touching the database.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use sdc_server::app_state::AppState;
use sdc_server::config::Config;
use sdc_server::models::UserRole;
use sdc_server::routes;

fn test_state() -> AppState {
    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET_KEY" => Some("integration-test-secret".to_string()),
        "UPLOAD_DIR" => Some(std::env::temp_dir().join("sdc-test-uploads").display().to_string()),
        _ => None,
    })
    .unwrap();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgresql://localhost/sdc_test")
        .unwrap();
    AppState::new(config, pool)
}

fn bearer(state: &AppState, role: UserRole) -> String {
    let issued = state
        .auth_service
        .issue_access_token(Uuid::new_v4(), role)
        .unwrap();
    format!("Bearer {}", issued.token)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_and_root() {
    let app = routes::app(test_state());

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");

    let (status, body) = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = routes::app(test_state());

    let (status, body) = send(
        app.clone(),
        Request::get("/api/auth/me").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing authorization token");

    let (status, body) = send(
        app,
        Request::get("/api/wallet/balance")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let state = test_state();
    let issued = state
        .auth_service
        .issue_access_token(Uuid::new_v4(), UserRole::Donor)
        .unwrap();
    state.auth_service.revoke(&issued.claims).await;

    let (status, body) = send(
        routes::app(state),
        Request::get("/api/notifications")
            .header(header::AUTHORIZATION, format!("Bearer {}", issued.token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has been revoked");
}

#[tokio::test]
async fn register_validates_input() {
    let app = routes::app(test_state());

    let (status, body) = send(app.clone(), post_json("/api/auth/register", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) = send(
        app.clone(),
        post_json(
            "/api/auth/register",
            json!({"email": "a@example.com", "password": "secret1", "role": "wizard"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid role");

    let (status, _) = send(
        app.clone(),
        post_json(
            "/api/auth/register",
            json!({"email": "not-an-email", "password": "secret1", "role": "donor"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app,
        post_json(
            "/api/auth/register",
            json!({"email": "root@example.com", "password": "secret1", "role": "admin"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn malformed_json_uses_the_error_envelope() {
    let app = routes::app(test_state());
    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let state = test_state();
    let token = bearer(&state, UserRole::Surrogate);
    let app = routes::app(state);

    for uri in ["/api/admin/users", "/api/admin/reports", "/api/admin/disputes"] {
        let (status, body) = send(
            app.clone(),
            Request::get(uri)
                .header(header::AUTHORIZATION, token.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["error"], "Admin access required");
    }
}

#[tokio::test]
async fn wallet_amounts_must_be_positive() {
    let state = test_state();
    let token = bearer(&state, UserRole::IntendingParent);
    let request = Request::post("/api/wallet/add-funds")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, token)
        .body(Body::from(json!({"amount": 0}).to_string()))
        .unwrap();

    let (status, body) = send(routes::app(state), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn messages_need_a_conversation_and_a_body() {
    let state = test_state();
    let token = bearer(&state, UserRole::Donor);
    let app = routes::app(state);

    let request = |body: Value| {
        Request::post("/api/messages")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, token.clone())
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, body) = send(app.clone(), request(json!({"content": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conversation_id is required");

    let (status, body) = send(app, request(json!({"conversation_id": "c-1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message must have content or attachment");
}

#[tokio::test]
async fn unknown_routes_and_missing_uploads_are_404() {
    let app = routes::app(test_state());

    let response = app
        .clone()
        .oneshot(Request::get("/api/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::get("/api/uploads/conv-1/missing.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_path_and_query_values_use_the_error_envelope() {
    let state = test_state();
    let admin = bearer(&state, UserRole::Admin);
    let app = routes::app(state);

    let requests = [
        Request::get("/api/users/not-a-uuid"),
        Request::get("/api/admin/kyc?status=bogus"),
        Request::delete("/api/favorites?target_user_id=x"),
        Request::get("/api/wallet/transactions?limit=ten"),
    ];
    for builder in requests {
        let request = builder
            .header(header::AUTHORIZATION, admin.clone())
            .body(Body::empty())
            .unwrap();
        let uri = request.uri().to_string();

        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false, "{}", uri);
        assert!(body["data"].is_null(), "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn revoking_a_user_rejects_their_outstanding_tokens() {
    let state = test_state();
    let user_id = Uuid::new_v4();
    let issued = state
        .auth_service
        .issue_access_token(user_id, UserRole::Agency)
        .unwrap();
    state.auth_service.revoke_user(user_id).await;

    let (status, body) = send(
        routes::app(state),
        Request::get("/api/notifications")
            .header(header::AUTHORIZATION, format!("Bearer {}", issued.token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has been revoked");
}
