// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment endpoints: idempotent transfers and transaction queries.
//!
//! `POST /api/payments/transfer` answers `201 Created` for a transfer that
//! was executed by this call and `200 OK` when an earlier result is replayed
//! for the same idempotency key. The `X-Idempotency-Key` header, when set,
//! takes precedence over `idempotencyKey` in the body.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};

use super::extract::{idempotency_key_header, ApiJson};
use crate::{
    auth::Auth,
    error::{ApiError, ErrorResponse},
    models::{
        ListTransactionsQuery, TransactionDetailResponse, TransactionPage, TransferRequest,
        TransferResponse,
    },
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/payments/transfer",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(
        ("X-Idempotency-Key" = Option<String>, Header, description = "Deduplication key; overrides the body field")
    ),
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer executed", body = TransferResponse),
        (status = 200, description = "Replay of an earlier transfer with the same key", body = TransferResponse),
        (status = 400, description = "Invalid transfer", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Blocked by fraud rules", body = ErrorResponse),
        (status = 422, description = "Insufficient funds, or a wallet is frozen or inactive", body = ErrorResponse)
    )
)]
pub async fn transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(mut request): ApiJson<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), ApiError> {
    if let Some(key) = idempotency_key_header(&headers) {
        request.idempotency_key = Some(key);
    }
    if request.user_agent.is_none() {
        request.user_agent = headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
    }
    tracing::debug!(
        caller = %user.user_id,
        from_user_id = %request.from_user_id,
        to_user_id = %request.to_user_id,
        amount_cents = request.amount_cents,
        "Transfer requested"
    );

    let outcome = state.store.write().await.transfer(request)?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome.response)))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(ListTransactionsQuery),
    responses(
        (status = 200, description = "Transactions, newest first", body = TransactionPage),
        (status = 400, description = "Malformed query", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_transactions(
    Auth(_user): Auth,
    State(state): State<AppState>,
    query: Result<Query<ListTransactionsQuery>, QueryRejection>,
) -> Result<Json<TransactionPage>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let page = state.store.read().await.list_transactions(&query);
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/payments/{transaction_id}",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("transaction_id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction with ledger entries", body = TransactionDetailResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown transaction", body = ErrorResponse)
    )
)]
pub async fn get_transaction(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionDetailResponse>, ApiError> {
    let detail = state.store.read().await.transaction(&transaction_id)?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/api/payments/idempotency/{key}",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("key" = String, Path, description = "Idempotency key")),
    responses(
        (status = 200, description = "Record bound to the key", body = TransferResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No transfer completed under this key", body = ErrorResponse)
    )
)]
pub async fn get_by_idempotency_key(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TransferResponse>, ApiError> {
    let record = state.store.read().await.by_idempotency_key(&key);
    record
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No transfer for idempotency key {key}")))
}
