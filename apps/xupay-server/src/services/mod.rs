// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Clients
//!
//! Capability traits for the user and payment services, with two
//! implementations each:
//!
//! - [`mock`]: in-memory, backed by the shared [`InMemoryStore`](crate::store::InMemoryStore)
//! - [`http`]: `reqwest` clients for a remote backend
//!
//! Consumers depend on `Arc<dyn UserService>` / `Arc<dyn PaymentService>`
//! obtained from a [`registry::ClientRegistry`] (or the process-wide
//! default), so either variant can be swapped in without touching them.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{
    AuthResponse, CheckLimitRequest, CreateWalletRequest, CreateWalletResponse, DailyUsageResponse,
    FreezeWalletRequest, KycDocumentResponse, LimitCheckResponse, ListTransactionsQuery,
    LoginRequest, ProfileResponse, RegisterRequest, TransactionDetailResponse, TransactionPage,
    TransferRequest, TransferResponse, UpdateProfileRequest, UploadKycDocumentRequest,
    UserLimitsResponse, UserResponse, ValidateTokenResponse, WalletBalanceResponse,
};

pub mod http;
pub mod mock;
pub mod registry;
pub mod token;

pub use http::{PaymentServiceClient, UserServiceClient};
pub use mock::{MockPaymentService, MockUserService};
pub use registry::{
    payment_service_client, set_default_payment_service_client, set_default_user_service_client,
    user_service_client, ClientRegistry,
};
pub use token::TokenStorage;

/// User service operations.
///
/// Calls other than `register`/`login` act on behalf of the holder of the
/// stored access token.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create an account and store the returned access token.
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError>;

    /// Authenticate and store the returned access token.
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError>;

    /// Close the session. Never fails; the local token is cleared regardless.
    async fn logout(&self);

    /// Missing, expired or revoked tokens report `valid: false`.
    async fn validate_token(&self) -> ValidateTokenResponse;

    async fn current_user(&self) -> Result<UserResponse, ApiError>;

    async fn my_profile(&self) -> Result<ProfileResponse, ApiError>;

    async fn update_my_profile(&self, request: UpdateProfileRequest) -> Result<ProfileResponse, ApiError>;

    async fn my_limits(&self) -> Result<UserLimitsResponse, ApiError>;

    async fn my_daily_usage(&self) -> Result<DailyUsageResponse, ApiError>;

    async fn check_limit(&self, request: CheckLimitRequest) -> Result<LimitCheckResponse, ApiError>;

    async fn upload_kyc_document(
        &self,
        request: UploadKycDocumentRequest,
    ) -> Result<KycDocumentResponse, ApiError>;

    async fn my_documents(&self) -> Result<Vec<KycDocumentResponse>, ApiError>;

    async fn document_by_id(&self, document_id: &str) -> Result<KycDocumentResponse, ApiError>;

    fn tokens(&self) -> &TokenStorage;

    fn set_token(&self, token: &str) {
        self.tokens().set(token);
    }

    fn clear_token(&self) {
        self.tokens().clear();
    }

    fn token(&self) -> Option<String> {
        self.tokens().get()
    }
}

/// Payment service operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Execute a transfer. Repeating a call with the same idempotency key
    /// returns the original record.
    async fn transfer(&self, request: TransferRequest) -> Result<TransferResponse, ApiError>;

    async fn get_transaction(&self, transaction_id: &str) -> Result<TransactionDetailResponse, ApiError>;

    /// `Ok(None)` for an unknown key.
    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<TransferResponse>, ApiError>;

    async fn list_transactions(&self, query: ListTransactionsQuery) -> Result<TransactionPage, ApiError>;

    async fn create_wallet(&self, request: CreateWalletRequest) -> Result<CreateWalletResponse, ApiError>;

    async fn get_wallet_by_user_id(&self, user_id: &str) -> Result<WalletBalanceResponse, ApiError>;

    async fn get_wallet_balance(&self, wallet_id: &str) -> Result<WalletBalanceResponse, ApiError>;

    async fn freeze_wallet(&self, wallet_id: &str, request: FreezeWalletRequest) -> Result<(), ApiError>;

    fn tokens(&self) -> &TokenStorage;

    fn set_token(&self, token: &str) {
        self.tokens().set(token);
    }

    fn clear_token(&self) {
        self.tokens().clear();
    }
}
