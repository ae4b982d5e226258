// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end flows: the HTTP clients against the router served on an
//! ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use xupay_server::{
    api::router,
    error::codes,
    models::{
        CheckLimitRequest, LimitDirection, ListTransactionsQuery, LoginRequest, RegisterRequest,
        TransactionStatus, TransferRequest, UpdateProfileRequest,
    },
    services::{
        PaymentService, PaymentServiceClient, TokenStorage, UserService, UserServiceClient,
    },
    state::AppState,
};

struct TestServer {
    base_url: String,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();

    tokio::spawn(async move {
        axum::serve(listener, router(AppState::default()))
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await
            .unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        shutdown,
    }
}

fn clients(server: &TestServer) -> (UserServiceClient, PaymentServiceClient) {
    let tokens = TokenStorage::new();
    let timeout = Duration::from_secs(10);
    (
        UserServiceClient::new(&server.base_url, timeout, tokens.clone()).unwrap(),
        PaymentServiceClient::new(&server.base_url, timeout, tokens).unwrap(),
    )
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "Passw0rd!".to_string(),
        first_name: "Hoa".to_string(),
        last_name: "Vu".to_string(),
        phone: Some("+84901234567".to_string()),
    }
}

#[tokio::test]
async fn register_login_transfer_and_replay() {
    let server = spawn_server().await;
    let (users, payments) = clients(&server);

    let bob = users.register(register_request("bob@example.com")).await.unwrap();
    let alice = users.register(register_request("alice@example.com")).await.unwrap();
    users.logout().await;
    assert!(users.token().is_none());

    let session = users
        .login(LoginRequest {
            email: "alice@example.com".into(),
            password: "Passw0rd!".into(),
        })
        .await
        .unwrap();
    assert_eq!(session.user.id, alice.user.id);
    assert!(users.validate_token().await.valid);

    let request = TransferRequest {
        idempotency_key: Some("k1".into()),
        from_user_id: alice.user.id.clone(),
        to_user_id: bob.user.id.clone(),
        amount_cents: 1_000,
        description: Some("lunch".into()),
        ..Default::default()
    };

    let first = payments.transfer(request.clone()).await.unwrap();
    assert_eq!(first.status, TransactionStatus::Completed);
    assert_eq!(first.amount_cents, 1_000);

    let second = payments.transfer(request).await.unwrap();
    assert_eq!(second.transaction_id, first.transaction_id);

    let found = payments.get_by_idempotency_key("k1").await.unwrap();
    assert_eq!(found.map(|r| r.transaction_id), Some(first.transaction_id.clone()));
    assert!(payments.get_by_idempotency_key("unknown").await.unwrap().is_none());

    // Balances moved exactly once.
    let alice_wallet = payments.get_wallet_by_user_id(&alice.user.id).await.unwrap();
    let bob_wallet = payments.get_wallet_by_user_id(&bob.user.id).await.unwrap();
    assert_eq!(bob_wallet.balance_cents - alice_wallet.balance_cents, 2_000);

    let page = payments
        .list_transactions(ListTransactionsQuery {
            user_id: Some(alice.user.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let usage = users.my_daily_usage().await.unwrap();
    assert_eq!(usage.total_sent_cents, 1_000);
    assert_eq!(usage.total_sent_count, 1);
}

#[tokio::test]
async fn oversized_transfer_surfaces_insufficient_funds() {
    let server = spawn_server().await;
    let (users, payments) = clients(&server);
    let alice = users.register(register_request("alice@example.com")).await.unwrap();

    let err = payments
        .transfer(TransferRequest {
            from_user_id: alice.user.id,
            to_user_id: "someone".into(),
            amount_cents: 100_000_001,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 422);
    assert_eq!(err.code, codes::INSUFFICIENT_FUNDS);
}

#[tokio::test]
async fn concurrent_transfers_with_one_key_record_once() {
    let server = spawn_server().await;
    let (users, payments) = clients(&server);
    let alice = users.register(register_request("alice@example.com")).await.unwrap();
    let payments = Arc::new(payments);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let payments = Arc::clone(&payments);
            let from = alice.user.id.clone();
            tokio::spawn(async move {
                payments
                    .transfer(TransferRequest {
                        idempotency_key: Some("same-key".into()),
                        from_user_id: from,
                        to_user_id: "merchant".into(),
                        amount_cents: 2_500,
                        ..Default::default()
                    })
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().transaction_id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let page = payments
        .list_transactions(ListTransactionsQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn profile_limits_and_auth_errors() {
    let server = spawn_server().await;
    let (users, _) = clients(&server);

    let err = users.current_user().await.unwrap_err();
    assert_eq!(err.status_code, 401);
    assert!(!users.validate_token().await.valid);

    users.register(register_request("carol@example.com")).await.unwrap();

    let profile = users
        .update_my_profile(UpdateProfileRequest {
            nationality: Some("VNM".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(profile.nationality.as_deref(), Some("VNM"));

    let err = users
        .update_my_profile(UpdateProfileRequest {
            nationality: Some("Vietnam".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, codes::VALIDATION_ERROR);

    let limits = users.my_limits().await.unwrap();
    let check = users
        .check_limit(CheckLimitRequest {
            amount_cents: limits.single_transaction_max_cents + 1,
            direction: LimitDirection::Send,
        })
        .await
        .unwrap();
    assert!(!check.allowed);

    let duplicate = users
        .register(register_request("carol@example.com"))
        .await
        .unwrap_err();
    assert_eq!(duplicate.status_code, 409);
    assert_eq!(duplicate.code, codes::DUPLICATE_EMAIL);
}

