// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Query Cache
//!
//! Keyed, stale-time cache in front of the service clients.
//!
//! - [`QueryClient::fetch`] serves fresh cached data, otherwise runs the
//!   loader and caches a successful result. Errors are never cached.
//! - Transport and 5xx failures are retried with doubling backoff; 4xx
//!   responses fail immediately.
//! - [`QueryClient::invalidate`] drops every key under a prefix, so
//!   `["wallets"]` clears `["wallets", "user", "u1"]` and
//!   `["wallets", "w1", "balance"]` alike.
//! - [`QueryClient::fetch_until_cancelled`] abandons the load when a
//!   [`CancellationToken`] fires and caches nothing.
//!
//! [`PaymentQueries`] wires the payment client through the cache and
//! invalidates the affected keys after mutations.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cache::TtlCache;
use crate::error::ApiError;
use crate::models::{
    FreezeWalletRequest, ListTransactionsQuery, TransactionDetailResponse, TransactionPage,
    TransferRequest, TransferResponse, WalletBalanceResponse,
};
use crate::services::PaymentService;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);
pub const DEFAULT_QUERY_CAPACITY: usize = 512;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Hierarchical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Every segment is terminated, so `["wallet"]` is not a prefix of
    /// `["wallets"]`. `%` is escaped before `/` so distinct segments never
    /// collide.
    fn cache_key(&self) -> String {
        self.0.iter().fold(String::new(), |mut key, segment| {
            key.push_str(&segment.replace('%', "%25").replace('/', "%2F"));
            key.push('/');
            key
        })
    }
}

/// Observable state of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Loading,
    Error(ApiError),
    Success(T),
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        QueryState::Loading
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ApiError>> for QueryState<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => QueryState::Success(data),
            Err(err) => QueryState::Error(err),
        }
    }
}

type CachedValue = Arc<dyn Any + Send + Sync>;

fn is_retryable(err: &ApiError) -> bool {
    err.status_code == 0 || err.status_code >= 500
}

pub struct QueryClient {
    cache: TtlCache<CachedValue>,
    max_retries: u32,
    retry_delay: Duration,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

impl QueryClient {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            cache: TtlCache::new(DEFAULT_QUERY_CAPACITY, stale_time),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the retry policy. `max_retries = 0` disables retries.
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn stale_time(&self) -> Duration {
        self.cache.ttl()
    }

    /// Cached data for `key` if present, fresh and of type `T`.
    pub fn peek<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.cache
            .get(&key.cache_key())
            .and_then(|value| value.downcast_ref::<T>().cloned())
    }

    /// Store `data` under `key`, replacing any cached value.
    pub fn set<T>(&self, key: &QueryKey, data: T)
    where
        T: Send + Sync + 'static,
    {
        self.cache.put(key.cache_key(), Arc::new(data) as CachedValue);
    }

    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, loader: F) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(data) = self.peek::<T>(key) {
            tracing::debug!(key = ?key.segments(), "Query cache hit");
            return Ok(data);
        }

        let mut attempt = 0;
        loop {
            match loader().await {
                Ok(data) => {
                    self.set(key, data.clone());
                    return Ok(data);
                }
                Err(err) if attempt < self.max_retries && is_retryable(&err) => {
                    let delay = self.retry_delay * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    tracing::debug!(
                        key = ?key.segments(),
                        attempt,
                        error = %err,
                        "Query failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// [`fetch`](Self::fetch) folded into a [`QueryState`].
    pub async fn query<T, F, Fut>(&self, key: &QueryKey, loader: F) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.fetch(key, loader).await.into()
    }

    /// Like [`fetch`](Self::fetch), but returns `None` as soon as `cancel`
    /// fires. The in-flight load is dropped and nothing is cached.
    pub async fn fetch_until_cancelled<T, F, Fut>(
        &self,
        key: &QueryKey,
        cancel: &CancellationToken,
        loader: F,
    ) -> Option<Result<T, ApiError>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(key = ?key.segments(), "Query cancelled");
                None
            }
            result = self.fetch(key, loader) => Some(result),
        }
    }

    /// Drop every cached key that starts with `prefix`.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let removed = self.cache.invalidate_prefix(&prefix.cache_key());
        tracing::debug!(prefix = ?prefix.segments(), removed, "Invalidated queries");
        removed
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

// =============================================================================
// Payment queries
// =============================================================================

pub mod keys {
    use super::QueryKey;
    use crate::models::ListTransactionsQuery;

    pub fn wallets() -> QueryKey {
        QueryKey::new(["wallets"])
    }

    pub fn wallet_by_user(user_id: &str) -> QueryKey {
        wallets().push("user").push(user_id)
    }

    pub fn wallet_balance(wallet_id: &str) -> QueryKey {
        wallets().push(wallet_id).push("balance")
    }

    pub fn transactions() -> QueryKey {
        QueryKey::new(["transactions"])
    }

    pub fn transaction(transaction_id: &str) -> QueryKey {
        transactions().push("detail").push(transaction_id)
    }

    pub fn transaction_list(query: &ListTransactionsQuery) -> QueryKey {
        transactions()
            .push("list")
            .push(query.user_id.as_deref().unwrap_or("*"))
            .push(query.page.unwrap_or_default().to_string())
            .push(query.size.map(|s| s.to_string()).unwrap_or_default())
    }
}

/// Payment client reads through a [`QueryClient`].
pub struct PaymentQueries {
    client: Arc<dyn PaymentService>,
    queries: QueryClient,
}

impl PaymentQueries {
    pub fn new(client: Arc<dyn PaymentService>, queries: QueryClient) -> Self {
        Self { client, queries }
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub async fn wallet_by_user(&self, user_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        self.queries
            .fetch(&keys::wallet_by_user(user_id), || {
                self.client.get_wallet_by_user_id(user_id)
            })
            .await
    }

    pub async fn wallet_balance(&self, wallet_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        self.queries
            .fetch(&keys::wallet_balance(wallet_id), || {
                self.client.get_wallet_balance(wallet_id)
            })
            .await
    }

    pub async fn transactions(&self, query: &ListTransactionsQuery) -> Result<TransactionPage, ApiError> {
        self.queries
            .fetch(&keys::transaction_list(query), || {
                self.client.list_transactions(query.clone())
            })
            .await
    }

    pub async fn transaction(&self, transaction_id: &str) -> Result<TransactionDetailResponse, ApiError> {
        self.queries
            .fetch(&keys::transaction(transaction_id), || {
                self.client.get_transaction(transaction_id)
            })
            .await
    }

    /// Execute a transfer. Not retried: a failed attempt is surfaced so the
    /// caller can resubmit with the same idempotency key.
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferResponse, ApiError> {
        let response = self.client.transfer(request).await?;
        self.queries.invalidate(&keys::wallets());
        self.queries.invalidate(&keys::transactions());
        Ok(response)
    }

    pub async fn freeze_wallet(&self, wallet_id: &str, request: FreezeWalletRequest) -> Result<(), ApiError> {
        self.client.freeze_wallet(wallet_id, request).await?;
        self.queries.invalidate(&keys::wallets());
        Ok(())
    }
}
