// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP service clients.
//!
//! Thin `reqwest` wrappers over the REST routes served by [`crate::api`].
//! Non-success responses are normalized into [`ApiError`] from the
//! `{code, message}` body; transport failures become `NETWORK_ERROR` or
//! `TIMEOUT` with status `0`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::{PaymentService, TokenStorage, UserService};
use crate::error::{ApiError, ErrorResponse};
use crate::models::{
    AuthResponse, CheckLimitRequest, CreateWalletRequest, CreateWalletResponse, DailyUsageResponse,
    FreezeWalletRequest, KycDocumentResponse, LimitCheckResponse, ListTransactionsQuery,
    LoginRequest, ProfileResponse, RegisterRequest, TransactionDetailResponse, TransactionPage,
    TransferRequest, TransferResponse, UpdateProfileRequest, UploadKycDocumentRequest,
    UserLimitsResponse, UserResponse, ValidateTokenResponse, WalletBalanceResponse,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-Key";

/// Shared request plumbing: base URL, timeout and bearer token.
#[derive(Debug, Clone)]
struct RestClient {
    http: Client,
    base_url: Url,
    tokens: TokenStorage,
}

impl RestClient {
    fn new(base_url: &str, timeout: Duration, tokens: TokenStorage) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::validation(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::validation(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// Base URL extended with `segments`, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::internal("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let builder = self.http.request(method, self.endpoint(segments)?);
        Ok(match self.tokens.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(transport_error)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::internal(format!("invalid response body: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout(format!("request timed out: {err}"))
    } else {
        ApiError::network(format!("request failed: {err}"))
    }
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.json::<ErrorResponse>().await.ok();
    let err = ApiError::from_response(status, body);
    tracing::debug!(status = %status, code = %err.code, "Request returned an error");
    err
}

// =============================================================================
// User service
// =============================================================================

pub struct UserServiceClient {
    rest: RestClient,
}

impl UserServiceClient {
    pub fn new(base_url: &str, timeout: Duration, tokens: TokenStorage) -> Result<Self, ApiError> {
        Ok(Self {
            rest: RestClient::new(base_url, timeout, tokens)?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.rest
            .send_json(self.rest.request(Method::GET, segments)?)
            .await
    }

    async fn authenticate(&self, segments: &[&str], body: &impl serde::Serialize) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = self
            .rest
            .send_json(self.rest.request(Method::POST, segments)?.json(body))
            .await?;
        self.rest.tokens.set(auth.access_token.clone());
        Ok(auth)
    }
}

#[async_trait]
impl UserService for UserServiceClient {
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.authenticate(&["api", "auth", "register"], &request).await
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        self.authenticate(&["api", "auth", "login"], &request).await
    }

    async fn logout(&self) {
        if self.rest.tokens.get().is_some() {
            let result = match self.rest.request(Method::POST, &["api", "auth", "logout"]) {
                Ok(builder) => self.rest.send(builder).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::debug!(error = %e, "Logout request failed; clearing token anyway");
            }
        }
        self.rest.tokens.clear();
    }

    async fn validate_token(&self) -> ValidateTokenResponse {
        if self.rest.tokens.get().is_none() {
            return ValidateTokenResponse::default();
        }
        self.get(&["api", "auth", "validate"])
            .await
            .unwrap_or_default()
    }

    async fn current_user(&self) -> Result<UserResponse, ApiError> {
        self.get(&["api", "auth", "me"]).await
    }

    async fn my_profile(&self) -> Result<ProfileResponse, ApiError> {
        self.get(&["api", "users", "me", "profile"]).await
    }

    async fn update_my_profile(&self, request: UpdateProfileRequest) -> Result<ProfileResponse, ApiError> {
        let builder = self
            .rest
            .request(Method::PUT, &["api", "users", "me", "profile"])?
            .json(&request);
        self.rest.send_json(builder).await
    }

    async fn my_limits(&self) -> Result<UserLimitsResponse, ApiError> {
        self.get(&["api", "users", "me", "limits"]).await
    }

    async fn my_daily_usage(&self) -> Result<DailyUsageResponse, ApiError> {
        self.get(&["api", "users", "me", "daily-usage"]).await
    }

    async fn check_limit(&self, request: CheckLimitRequest) -> Result<LimitCheckResponse, ApiError> {
        let builder = self
            .rest
            .request(Method::POST, &["api", "users", "me", "check-limit"])?
            .json(&request);
        self.rest.send_json(builder).await
    }

    async fn upload_kyc_document(
        &self,
        request: UploadKycDocumentRequest,
    ) -> Result<KycDocumentResponse, ApiError> {
        let builder = self
            .rest
            .request(Method::POST, &["api", "kyc", "upload-document"])?
            .json(&request);
        self.rest.send_json(builder).await
    }

    async fn my_documents(&self) -> Result<Vec<KycDocumentResponse>, ApiError> {
        self.get(&["api", "kyc", "documents"]).await
    }

    async fn document_by_id(&self, document_id: &str) -> Result<KycDocumentResponse, ApiError> {
        self.get(&["api", "kyc", document_id]).await
    }

    fn tokens(&self) -> &TokenStorage {
        &self.rest.tokens
    }
}

// =============================================================================
// Payment service
// =============================================================================

pub struct PaymentServiceClient {
    rest: RestClient,
}

impl PaymentServiceClient {
    pub fn new(base_url: &str, timeout: Duration, tokens: TokenStorage) -> Result<Self, ApiError> {
        Ok(Self {
            rest: RestClient::new(base_url, timeout, tokens)?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.rest
            .send_json(self.rest.request(Method::GET, segments)?)
            .await
    }
}

#[async_trait]
impl PaymentService for PaymentServiceClient {
    async fn transfer(&self, request: TransferRequest) -> Result<TransferResponse, ApiError> {
        let mut builder = self.rest.request(Method::POST, &["api", "payments", "transfer"])?;
        if let Some(key) = request.idempotency_key.as_deref() {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        self.rest.send_json(builder.json(&request)).await
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<TransactionDetailResponse, ApiError> {
        self.get(&["api", "payments", transaction_id]).await
    }

    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<TransferResponse>, ApiError> {
        match self.get(&["api", "payments", "idempotency", key]).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.status() == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_transactions(&self, query: ListTransactionsQuery) -> Result<TransactionPage, ApiError> {
        let builder = self
            .rest
            .request(Method::GET, &["api", "payments"])?
            .query(&query);
        self.rest.send_json(builder).await
    }

    async fn create_wallet(&self, request: CreateWalletRequest) -> Result<CreateWalletResponse, ApiError> {
        let builder = self
            .rest
            .request(Method::POST, &["api", "wallets"])?
            .json(&request);
        self.rest.send_json(builder).await
    }

    async fn get_wallet_by_user_id(&self, user_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        self.get(&["api", "wallets", "user", user_id]).await
    }

    async fn get_wallet_balance(&self, wallet_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        self.get(&["api", "wallets", wallet_id, "balance"]).await
    }

    async fn freeze_wallet(&self, wallet_id: &str, request: FreezeWalletRequest) -> Result<(), ApiError> {
        let builder = self
            .rest
            .request(Method::PUT, &["api", "wallets", wallet_id, "freeze"])?
            .json(&request);
        self.rest.send(builder).await.map(|_| ())
    }

    fn tokens(&self) -> &TokenStorage {
        &self.rest.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    fn rest(base: &str) -> RestClient {
        RestClient::new(base, Duration::from_secs(5), TokenStorage::new()).unwrap()
    }

    #[test]
    fn endpoint_appends_to_base_path() {
        let client = rest("http://localhost:8082");
        assert_eq!(
            client.endpoint(&["api", "payments"]).unwrap().as_str(),
            "http://localhost:8082/api/payments"
        );

        let prefixed = rest("https://gateway.example.com/xupay/");
        assert_eq!(
            prefixed.endpoint(&["api", "wallets", "w1", "balance"]).unwrap().as_str(),
            "https://gateway.example.com/xupay/api/wallets/w1/balance"
        );
    }

    #[test]
    fn endpoint_encodes_path_segments() {
        let client = rest("http://localhost:8082");
        let url = client
            .endpoint(&["api", "payments", "idempotency", "a/b c"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8082/api/payments/idempotency/a%2Fb%20c"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = RestClient::new("not a url", Duration::from_secs(1), TokenStorage::new()).unwrap_err();
        assert_eq!(err.code, codes::VALIDATION_ERROR);

        let err = RestClient::new("mailto:ops@example.com", Duration::from_secs(1), TokenStorage::new())
            .unwrap_err();
        assert_eq!(err.code, codes::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PaymentServiceClient::new(
            &format!("http://{addr}"),
            Duration::from_secs(5),
            TokenStorage::new(),
        )
        .unwrap();
        let err = client.get_wallet_balance("w1").await.unwrap_err();
        assert_eq!(err.status_code, 0);
        assert_eq!(err.code, codes::NETWORK_ERROR);
    }

    #[tokio::test]
    async fn validate_without_token_skips_the_request() {
        let client = UserServiceClient::new("http://127.0.0.1:9", Duration::from_secs(1), TokenStorage::new())
            .unwrap();
        assert!(!client.validate_token().await.valid);
    }
}
