// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet management API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::extract::ApiJson;
use crate::{
    auth::Auth,
    error::{ApiError, ErrorResponse},
    models::{CreateWalletRequest, CreateWalletResponse, FreezeWalletRequest, WalletBalanceResponse},
    state::AppState,
};

/// Create a wallet. Each user owns at most one.
#[utoipa::path(
    post,
    path = "/api/wallets",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = CreateWalletResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "User already has a wallet", body = ErrorResponse)
    )
)]
pub async fn create_wallet(
    Auth(_user): Auth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateWalletRequest>,
) -> Result<(StatusCode, Json<CreateWalletResponse>), ApiError> {
    let wallet = state.store.write().await.create_wallet(request)?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

/// Wallet for a user. A personal wallet is provisioned on first access.
#[utoipa::path(
    get,
    path = "/api/wallets/user/{user_id}",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Wallet balance", body = WalletBalanceResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn get_wallet_by_user(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<WalletBalanceResponse>, ApiError> {
    let wallet = state.store.write().await.wallet_by_user(&user_id)?;
    Ok(Json(wallet))
}

#[utoipa::path(
    get,
    path = "/api/wallets/{wallet_id}/balance",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Wallet ID")),
    responses(
        (status = 200, description = "Wallet balance", body = WalletBalanceResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown wallet", body = ErrorResponse)
    )
)]
pub async fn get_wallet_balance(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<WalletBalanceResponse>, ApiError> {
    let wallet = state.store.read().await.wallet_balance(&wallet_id)?;
    Ok(Json(wallet))
}

/// Freeze (`freeze: true`) or unfreeze a wallet. The balance is untouched.
#[utoipa::path(
    put,
    path = "/api/wallets/{wallet_id}/freeze",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Wallet ID")),
    request_body = FreezeWalletRequest,
    responses(
        (status = 204, description = "Freeze state updated"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown wallet", body = ErrorResponse)
    )
)]
pub async fn freeze_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    ApiJson(request): ApiJson<FreezeWalletRequest>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(wallet_id = %wallet_id, by = %user.user_id, freeze = request.freeze, "Freeze requested");
    state.store.write().await.freeze_wallet(&wallet_id, request)?;
    Ok(StatusCode::NO_CONTENT)
}
