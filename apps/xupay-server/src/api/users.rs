// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile and transaction-limit endpoints for the authenticated user.

use axum::{extract::State, Json};

use super::extract::ApiJson;
use crate::{
    auth::Auth,
    error::{ApiError, ErrorResponse},
    models::{
        CheckLimitRequest, DailyUsageResponse, LimitCheckResponse, ProfileResponse,
        UpdateProfileRequest, UserLimitsResponse,
    },
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/users/me/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn get_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.store.read().await.profile(&user.user_id)?;
    Ok(Json(profile))
}

/// Update profile fields. Omitted fields are left unchanged; one invalid
/// field rejects the whole update.
#[utoipa::path(
    put,
    path = "/api/users/me/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid field", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn update_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .store
        .write()
        .await
        .update_profile(&user.user_id, request)?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/users/me/limits",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Limits for the caller's KYC tier", body = UserLimitsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn limits(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserLimitsResponse>, ApiError> {
    let limits = state.store.read().await.limits(&user.user_id)?;
    Ok(Json(limits))
}

#[utoipa::path(
    get,
    path = "/api/users/me/daily-usage",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Today's totals (UTC)", body = DailyUsageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn daily_usage(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<DailyUsageResponse>, ApiError> {
    let usage = state.store.read().await.daily_usage(&user.user_id)?;
    Ok(Json(usage))
}

#[utoipa::path(
    post,
    path = "/api/users/me/check-limit",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CheckLimitRequest,
    responses(
        (status = 200, description = "Whether the amount fits the caller's limits", body = LimitCheckResponse),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn check_limit(
    Auth(user): Auth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckLimitRequest>,
) -> Result<Json<LimitCheckResponse>, ApiError> {
    let result = state.store.read().await.check_limit(&user.user_id, request)?;
    Ok(Json(result))
}
