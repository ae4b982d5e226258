// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface: routes, middleware and the OpenAPI document.

use axum::{
    http::{HeaderName, Request},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedUser,
    error::ErrorResponse,
    models::{
        AuthResponse, CheckLimitRequest, CreateWalletRequest, CreateWalletResponse,
        DailyUsageResponse, DocumentType, EntryType, FreezeWalletRequest, KycDocumentResponse,
        KycStatus, KycTier, LedgerEntry, LimitCheckResponse, LimitDirection, LoginRequest,
        ProfileResponse, RegisterRequest, TransactionDetailResponse, TransactionPage,
        TransactionStatus, TransactionType, TransferRequest, TransferResponse,
        UpdateProfileRequest, UploadKycDocumentRequest, UserLimitsResponse, UserResponse,
        ValidateTokenResponse, WalletBalanceResponse, WalletType,
    },
    state::AppState,
};

pub mod auth;
pub mod extract;
pub mod health;
pub mod kyc;
pub mod payments;
pub mod users;
pub mod wallets;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/validate", get(auth::validate))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/users/me/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/api/users/me/limits", get(users::limits))
        .route("/api/users/me/daily-usage", get(users::daily_usage))
        .route("/api/users/me/check-limit", post(users::check_limit))
        .route("/api/kyc/upload-document", post(kyc::upload_document))
        .route("/api/kyc/documents", get(kyc::list_documents))
        .route("/api/kyc/{document_id}", get(kyc::get_document))
        .route("/api/payments", get(payments::list_transactions))
        .route("/api/payments/transfer", post(payments::transfer))
        .route(
            "/api/payments/idempotency/{key}",
            get(payments::get_by_idempotency_key),
        )
        .route("/api/payments/{transaction_id}", get(payments::get_transaction))
        .route("/api/wallets", post(wallets::create_wallet))
        .route("/api/wallets/user/{user_id}", get(wallets::get_wallet_by_user))
        .route(
            "/api/wallets/{wallet_id}/balance",
            get(wallets::get_wallet_balance),
        )
        .route("/api/wallets/{wallet_id}/freeze", put(wallets::freeze_wallet))
        .with_state(state);

    let request_tracing = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(&REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER));

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(request_tracing)
        .layer(CorsLayer::permissive())
}

struct BearerAuthAddon;

impl Modify for BearerAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        auth::register,
        auth::login,
        auth::logout,
        auth::validate,
        auth::me,
        users::get_profile,
        users::update_profile,
        users::limits,
        users::daily_usage,
        users::check_limit,
        kyc::upload_document,
        kyc::list_documents,
        kyc::get_document,
        payments::transfer,
        payments::list_transactions,
        payments::get_transaction,
        payments::get_by_idempotency_key,
        wallets::create_wallet,
        wallets::get_wallet_by_user,
        wallets::get_wallet_balance,
        wallets::freeze_wallet
    ),
    components(
        schemas(
            ErrorResponse,
            AuthenticatedUser,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            ValidateTokenResponse,
            ProfileResponse,
            UpdateProfileRequest,
            UserLimitsResponse,
            DailyUsageResponse,
            CheckLimitRequest,
            LimitCheckResponse,
            LimitDirection,
            UploadKycDocumentRequest,
            KycDocumentResponse,
            DocumentType,
            KycStatus,
            KycTier,
            TransferRequest,
            TransferResponse,
            TransactionDetailResponse,
            TransactionPage,
            LedgerEntry,
            EntryType,
            TransactionStatus,
            TransactionType,
            CreateWalletRequest,
            CreateWalletResponse,
            WalletBalanceResponse,
            FreezeWalletRequest,
            WalletType
        )
    ),
    modifiers(&BearerAuthAddon),
    tags(
        (name = "Health", description = "Liveness and health probes"),
        (name = "Auth", description = "Registration, login and sessions"),
        (name = "Users", description = "Profile and transaction limits"),
        (name = "KYC", description = "Identity document submission"),
        (name = "Payments", description = "Idempotent transfers and transaction history"),
        (name = "Wallets", description = "Wallet provisioning, balances and freezing")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::error::codes;

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str) -> (String, String) {
        let response = send(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "Passw0rd!",
                "firstName": "Thu",
                "lastName": "Le"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_documents_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/payments/transfer"));
        assert!(doc.paths.paths.contains_key("/api/kyc/{document_id}"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[tokio::test]
    async fn health_is_public_and_tagged_with_request_id() {
        let app = router(AppState::default());
        let response = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["idempotencyKeys"], 0);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let app = router(AppState::default());
        let response = send(&app, Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["code"], "MISSING_AUTH_HEADER");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn malformed_body_is_validation_error() {
        let app = router(AppState::default());
        let response = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "x@example.com" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], codes::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn transfer_created_then_replayed() {
        let app = router(AppState::default());
        let (token, alice) = register(&app, "alice@example.com").await;
        let (_, bob) = register(&app, "bob@example.com").await;

        let transfer = json!({ "fromUserId": alice, "toUserId": bob, "amountCents": 1000 });
        let request = |body: Value| {
            Request::builder()
                .method(Method::POST)
                .uri("/api/payments/transfer")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Idempotency-Key", "k1")
                .body(Body::from(body.to_string()))
                .unwrap()
        };

        let first = app.clone().oneshot(request(transfer.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let first = json_body(first).await;
        assert_eq!(first["status"], "COMPLETED");
        assert_eq!(first["idempotencyKey"], "k1");

        // The header wins over a different key in the body.
        let mut with_body_key = transfer.clone();
        with_body_key["idempotencyKey"] = json!("other");
        let second = app.clone().oneshot(request(with_body_key)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json_body(second).await["transactionId"], first["transactionId"]);

        let lookup = send(&app, Method::GET, "/api/payments/idempotency/k1", Some(&token), None).await;
        assert_eq!(lookup.status(), StatusCode::OK);

        let missing = send(&app, Method::GET, "/api/payments/idempotency/nope", Some(&token), None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(missing).await["code"], codes::NOT_FOUND);

        let detail_uri = format!("/api/payments/{}", first["transactionId"].as_str().unwrap());
        let detail = json_body(send(&app, Method::GET, &detail_uri, Some(&token), None).await).await;
        assert_eq!(detail["ledgerEntries"].as_array().unwrap().len(), 2);

        let page = send(&app, Method::GET, &format!("/api/payments?userId={alice}&size=5"), Some(&token), None).await;
        assert_eq!(json_body(page).await["total"], 1);
    }

    #[tokio::test]
    async fn oversized_transfer_is_insufficient_funds() {
        let app = router(AppState::default());
        let (token, alice) = register(&app, "alice@example.com").await;

        let response = send(
            &app,
            Method::POST,
            "/api/payments/transfer",
            Some(&token),
            Some(json!({ "fromUserId": alice, "toUserId": "u2", "amountCents": 100_000_001 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], codes::INSUFFICIENT_FUNDS);
    }

    #[tokio::test]
    async fn amount_beyond_integer_range_is_insufficient_funds() {
        let app = router(AppState::default());
        let (token, alice) = register(&app, "alice@example.com").await;

        let body = format!(
            r#"{{"fromUserId":"{alice}","toUserId":"u2","amountCents":100000000000000000000}}"#
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/payments/transfer")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], codes::INSUFFICIENT_FUNDS);
    }

    #[tokio::test]
    async fn freeze_round_trip_keeps_balance() {
        let app = router(AppState::default());
        let (token, alice) = register(&app, "alice@example.com").await;

        let wallet = json_body(
            send(&app, Method::GET, &format!("/api/wallets/user/{alice}"), Some(&token), None).await,
        )
        .await;
        let wallet_id = wallet["walletId"].as_str().unwrap().to_string();

        let freeze = send(
            &app,
            Method::PUT,
            &format!("/api/wallets/{wallet_id}/freeze"),
            Some(&token),
            Some(json!({ "freeze": true, "reason": "review" })),
        )
        .await;
        assert_eq!(freeze.status(), StatusCode::NO_CONTENT);

        let balance = json_body(
            send(&app, Method::GET, &format!("/api/wallets/{wallet_id}/balance"), Some(&token), None).await,
        )
        .await;
        assert_eq!(balance["isFrozen"], true);
        assert_eq!(balance["balanceCents"], wallet["balanceCents"]);
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let app = router(AppState::default());
        let (token, _) = register(&app, "alice@example.com").await;

        let validate = send(&app, Method::GET, "/api/auth/validate", Some(&token), None).await;
        assert_eq!(json_body(validate).await["valid"], true);

        let logout = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(logout.status(), StatusCode::NO_CONTENT);

        let me = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(me).await["code"], "SESSION_REVOKED");
    }

    #[tokio::test]
    async fn kyc_upload_and_fetch() {
        let app = router(AppState::default());
        let (token, _) = register(&app, "alice@example.com").await;
        let (other, _) = register(&app, "bob@example.com").await;

        let uploaded = send(
            &app,
            Method::POST,
            "/api/kyc/upload-document",
            Some(&token),
            Some(json!({
                "documentType": "PASSPORT",
                "documentNumber": "B1234567",
                "documentCountry": "VNM",
                "fileUrl": "https://files.example.com/passport.png"
            })),
        )
        .await;
        assert_eq!(uploaded.status(), StatusCode::CREATED);
        let document = json_body(uploaded).await;
        let uri = format!("/api/kyc/{}", document["id"].as_str().unwrap());

        let own = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(own.status(), StatusCode::OK);

        let foreign = send(&app, Method::GET, &uri, Some(&other), None).await;
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

        let list = json_body(send(&app, Method::GET, "/api/kyc/documents", Some(&token), None).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let profile = json_body(send(&app, Method::GET, "/api/users/me/profile", Some(&token), None).await).await;
        assert_eq!(profile["kycStatus"], "PENDING");
    }
}
