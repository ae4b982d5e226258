// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request extractors with error bodies in the API's `{code, message}` shape.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::HeaderMap,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::services::http::IDEMPOTENCY_KEY_HEADER;

/// `Json<T>` whose rejections are `400 VALIDATION_ERROR`.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!(error = %rejection, "Rejected request body");
    ApiError::validation(rejection.body_text())
}

/// Non-blank `X-Idempotency-Key` header value, if present.
pub fn idempotency_key_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}
