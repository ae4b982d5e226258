// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints: registration, login, logout and token checks.

use axum::{extract::State, http::StatusCode, Json};
use chrono::DateTime;

use super::extract::ApiJson;
use crate::{
    auth::Auth,
    error::{ApiError, ErrorResponse},
    models::{AuthResponse, LoginRequest, RegisterRequest, UserResponse, ValidateTokenResponse},
    state::AppState,
};

/// Register a new account and open a session.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid registration data", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let auth = state.store.write().await.register(&state.tokens, request)?;
    Ok((StatusCode::CREATED, Json(auth)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 403, description = "Account suspended", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let auth = state.store.write().await.login(&state.tokens, request)?;
    Ok(Json(auth))
}

/// Revoke the caller's session. The token stops authenticating immediately.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn logout(Auth(user): Auth, State(state): State<AppState>) -> StatusCode {
    state.store.write().await.logout(&user.session_id);
    StatusCode::NO_CONTENT
}

/// Confirm the bearer token is valid. Invalid tokens are rejected with 401
/// by the extractor.
#[utoipa::path(
    get,
    path = "/api/auth/validate",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token is valid", body = ValidateTokenResponse),
        (status = 401, description = "Token is missing, expired or revoked", body = ErrorResponse)
    )
)]
pub async fn validate(Auth(user): Auth) -> Json<ValidateTokenResponse> {
    Json(ValidateTokenResponse {
        valid: true,
        expires_at: DateTime::from_timestamp(user.expires_at, 0),
        user_id: Some(user.user_id),
    })
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn me(Auth(user): Auth, State(state): State<AppState>) -> Result<Json<UserResponse>, ApiError> {
    let current = state.store.read().await.current_user(&user.user_id)?;
    Ok(Json(current))
}
