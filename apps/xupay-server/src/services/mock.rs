// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory service implementations.
//!
//! Both mocks operate on the same [`AppState`] the HTTP handlers use, so a
//! mock client and the server can observe each other's writes. The user
//! mock authenticates through the stored token exactly like the bearer
//! extractor does; the payment mock does not require a token.

use async_trait::async_trait;

use super::{PaymentService, TokenStorage, UserService};
use crate::auth::{AuthError, Claims};
use crate::error::ApiError;
use crate::models::{
    AuthResponse, CheckLimitRequest, CreateWalletRequest, CreateWalletResponse, DailyUsageResponse,
    FreezeWalletRequest, KycDocumentResponse, LimitCheckResponse, ListTransactionsQuery,
    LoginRequest, ProfileResponse, RegisterRequest, TransactionDetailResponse, TransactionPage,
    TransferRequest, TransferResponse, UpdateProfileRequest, UploadKycDocumentRequest,
    UserLimitsResponse, UserResponse, ValidateTokenResponse, WalletBalanceResponse,
};
use crate::state::AppState;

pub struct MockUserService {
    state: AppState,
    tokens: TokenStorage,
}

impl MockUserService {
    pub fn new(state: AppState, tokens: TokenStorage) -> Self {
        Self { state, tokens }
    }

    /// Claims of the stored token, checked against the session table.
    async fn caller(&self) -> Result<Claims, ApiError> {
        let token = self.tokens.get().ok_or(AuthError::MissingAuthHeader)?;
        let claims = self.state.tokens.verify(&token)?;
        self.state.store.read().await.check_session(&claims)?;
        Ok(claims)
    }
}

#[async_trait]
impl UserService for MockUserService {
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        let auth = self
            .state
            .store
            .write()
            .await
            .register(&self.state.tokens, request)?;
        self.tokens.set(auth.access_token.clone());
        Ok(auth)
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        let auth = self
            .state
            .store
            .write()
            .await
            .login(&self.state.tokens, request)?;
        self.tokens.set(auth.access_token.clone());
        Ok(auth)
    }

    async fn logout(&self) {
        if let Some(token) = self.tokens.get() {
            match self.state.tokens.verify(&token) {
                Ok(claims) => self.state.store.write().await.logout(&claims.sid),
                Err(e) => tracing::debug!(error = %e, "Discarding unverifiable token on logout"),
            }
        }
        self.tokens.clear();
    }

    async fn validate_token(&self) -> ValidateTokenResponse {
        match self.tokens.get() {
            Some(token) => self
                .state
                .store
                .read()
                .await
                .validate_token(&self.state.tokens, &token),
            None => ValidateTokenResponse::default(),
        }
    }

    async fn current_user(&self) -> Result<UserResponse, ApiError> {
        let claims = self.caller().await?;
        self.state.store.read().await.current_user(&claims.sub)
    }

    async fn my_profile(&self) -> Result<ProfileResponse, ApiError> {
        let claims = self.caller().await?;
        self.state.store.read().await.profile(&claims.sub)
    }

    async fn update_my_profile(&self, request: UpdateProfileRequest) -> Result<ProfileResponse, ApiError> {
        let claims = self.caller().await?;
        self.state
            .store
            .write()
            .await
            .update_profile(&claims.sub, request)
    }

    async fn my_limits(&self) -> Result<UserLimitsResponse, ApiError> {
        let claims = self.caller().await?;
        self.state.store.read().await.limits(&claims.sub)
    }

    async fn my_daily_usage(&self) -> Result<DailyUsageResponse, ApiError> {
        let claims = self.caller().await?;
        self.state.store.read().await.daily_usage(&claims.sub)
    }

    async fn check_limit(&self, request: CheckLimitRequest) -> Result<LimitCheckResponse, ApiError> {
        let claims = self.caller().await?;
        self.state.store.read().await.check_limit(&claims.sub, request)
    }

    async fn upload_kyc_document(
        &self,
        request: UploadKycDocumentRequest,
    ) -> Result<KycDocumentResponse, ApiError> {
        let claims = self.caller().await?;
        self.state
            .store
            .write()
            .await
            .upload_kyc_document(&claims.sub, request)
    }

    async fn my_documents(&self) -> Result<Vec<KycDocumentResponse>, ApiError> {
        let claims = self.caller().await?;
        Ok(self.state.store.read().await.kyc_documents(&claims.sub))
    }

    async fn document_by_id(&self, document_id: &str) -> Result<KycDocumentResponse, ApiError> {
        let claims = self.caller().await?;
        self.state
            .store
            .read()
            .await
            .kyc_document(&claims.sub, document_id)
    }

    fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }
}

pub struct MockPaymentService {
    state: AppState,
    tokens: TokenStorage,
}

impl MockPaymentService {
    pub fn new(state: AppState, tokens: TokenStorage) -> Self {
        Self { state, tokens }
    }
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferResponse, ApiError> {
        let outcome = self.state.store.write().await.transfer(request)?;
        Ok(outcome.response)
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<TransactionDetailResponse, ApiError> {
        self.state.store.read().await.transaction(transaction_id)
    }

    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<TransferResponse>, ApiError> {
        Ok(self.state.store.read().await.by_idempotency_key(key))
    }

    async fn list_transactions(&self, query: ListTransactionsQuery) -> Result<TransactionPage, ApiError> {
        Ok(self.state.store.read().await.list_transactions(&query))
    }

    async fn create_wallet(&self, request: CreateWalletRequest) -> Result<CreateWalletResponse, ApiError> {
        self.state.store.write().await.create_wallet(request)
    }

    async fn get_wallet_by_user_id(&self, user_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        self.state.store.write().await.wallet_by_user(user_id)
    }

    async fn get_wallet_balance(&self, wallet_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        self.state.store.read().await.wallet_balance(wallet_id)
    }

    async fn freeze_wallet(&self, wallet_id: &str, request: FreezeWalletRequest) -> Result<(), ApiError> {
        self.state
            .store
            .write()
            .await
            .freeze_wallet(wallet_id, request)
            .map(|_| ())
    }

    fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::codes;
    use crate::models::TransactionStatus;

    fn services() -> (MockUserService, MockPaymentService) {
        let state = AppState::default();
        let tokens = TokenStorage::new();
        (
            MockUserService::new(state.clone(), tokens.clone()),
            MockPaymentService::new(state, tokens),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "Passw0rd!".to_string(),
            first_name: "Lan".to_string(),
            last_name: "Pham".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_stores_token_for_both_clients() {
        let (users, payments) = services();
        let auth = users.register(register_request("lan@example.com")).await.unwrap();

        assert_eq!(users.token().as_deref(), Some(auth.access_token.as_str()));
        assert_eq!(PaymentService::tokens(&payments).get(), users.token());

        let me = users.current_user().await.unwrap();
        assert_eq!(me.id, auth.user.id);
    }

    #[tokio::test]
    async fn calls_without_token_are_unauthorized() {
        let (users, _) = services();
        let err = users.current_user().await.unwrap_err();
        assert_eq!(err.status_code, 401);
        assert!(!users.validate_token().await.valid);
    }

    #[tokio::test]
    async fn logout_revokes_session_and_clears_token() {
        let (users, _) = services();
        let auth = users.register(register_request("lan@example.com")).await.unwrap();
        users.logout().await;
        assert!(users.token().is_none());

        // The old token no longer authenticates.
        users.set_token(&auth.access_token);
        let err = users.my_profile().await.unwrap_err();
        assert_eq!(err.code, "SESSION_REVOKED");
        assert!(!users.validate_token().await.valid);
    }

    #[tokio::test]
    async fn logout_without_token_is_a_no_op() {
        let (users, _) = services();
        users.logout().await;
        users.set_token("garbage");
        users.logout().await;
        assert!(users.token().is_none());
    }

    #[tokio::test]
    async fn bad_login_leaves_token_untouched() {
        let (users, _) = services();
        users.register(register_request("lan@example.com")).await.unwrap();
        let before = users.token();

        let err = users
            .login(LoginRequest {
                email: "lan@example.com".into(),
                password: "wrong-Passw0rd".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_CREDENTIALS);
        assert_eq!(users.token(), before);
    }

    #[tokio::test]
    async fn transfer_replays_by_key() {
        let (_, payments) = services();
        let request = TransferRequest {
            idempotency_key: Some("k1".into()),
            from_user_id: "u1".into(),
            to_user_id: "u2".into(),
            amount_cents: 1_000,
            ..Default::default()
        };

        let first = payments.transfer(request.clone()).await.unwrap();
        let second = payments.transfer(request).await.unwrap();
        assert_eq!(first.status, TransactionStatus::Completed);
        assert_eq!(first.transaction_id, second.transaction_id);

        let found = payments.get_by_idempotency_key("k1").await.unwrap();
        assert_eq!(found.map(|r| r.transaction_id), Some(first.transaction_id));
        assert!(payments.get_by_idempotency_key("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_transfers_with_one_key_record_once() {
        let (_, payments) = services();
        let payments = Arc::new(payments);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let payments = Arc::clone(&payments);
                tokio::spawn(async move {
                    payments
                        .transfer(TransferRequest {
                            idempotency_key: Some("race".into()),
                            from_user_id: "u1".into(),
                            to_user_id: "u2".into(),
                            amount_cents: 1_000,
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
    async fn freeze_blocks_transfers() {
        let (_, payments) = services();
        let wallet = payments.get_wallet_by_user_id("u1").await.unwrap();
        payments
            .freeze_wallet(
                &wallet.wallet_id,
                FreezeWalletRequest {
                    freeze: true,
                    reason: None,
                },
            )
            .await
            .unwrap();

        let err = payments
            .transfer(TransferRequest {
                from_user_id: "u1".into(),
                to_user_id: "u2".into(),
                amount_cents: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::WALLET_FROZEN);
        assert!(payments.get_wallet_balance(&wallet.wallet_id).await.unwrap().is_frozen);
    }
}
