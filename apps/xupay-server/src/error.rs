// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Normalized error type shared by the store, the HTTP handlers and both
//! client variants.
//!
//! Every failure carries a machine-readable `code`, a human `message` and the
//! HTTP `statusCode` it maps to, so callers branch on `code` without caring
//! whether the error came from the in-memory store or over the wire.
//! Transport failures that never reached a server use status `0`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Machine-readable error codes.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const ACCOUNT_SUSPENDED: &str = "ACCOUNT_SUSPENDED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const FRAUD_BLOCKED: &str = "FRAUD_BLOCKED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const DUPLICATE_EMAIL: &str = "DUPLICATE_EMAIL";
    pub const WALLET_EXISTS: &str = "WALLET_EXISTS";
    pub const INSUFFICIENT_FUNDS: &str = "INSUFFICIENT_FUNDS";
    pub const WALLET_FROZEN: &str = "WALLET_FROZEN";
    pub const WALLET_INACTIVE: &str = "WALLET_INACTIVE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{code} ({status_code}): {message}")]
pub struct ApiError {
    /// HTTP status, or `0` when the request never got a response.
    pub status_code: u16,
    pub code: String,
    pub message: String,
}

/// Wire shape of an error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::VALIDATION_ERROR, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::INVALID_CREDENTIALS,
            "Invalid email or password",
        )
    }

    pub fn account_suspended() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::ACCOUNT_SUSPENDED,
            "Account is suspended",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn conflict(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn insufficient_funds() -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::INSUFFICIENT_FUNDS,
            "Insufficient funds",
        )
    }

    pub fn wallet_frozen(wallet_id: &str) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::WALLET_FROZEN,
            format!("Wallet {wallet_id} is frozen"),
        )
    }

    pub fn wallet_inactive(wallet_id: &str) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::WALLET_INACTIVE,
            format!("Wallet {wallet_id} is not active"),
        )
    }

    pub fn fraud_blocked(rules: &[String]) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FRAUD_BLOCKED,
            format!("Transaction blocked by fraud rules: {}", rules.join(", ")),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR, message)
    }

    /// Transport-level failure: the request never produced an HTTP response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            code: codes::NETWORK_ERROR.to_string(),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            code: codes::TIMEOUT.to_string(),
            message: message.into(),
        }
    }

    /// Build an error from a non-success response body.
    ///
    /// Missing fields fall back to `UNKNOWN_ERROR` and the status reason.
    pub fn from_response(status: StatusCode, body: Option<ErrorResponse>) -> Self {
        let (code, message) = match body {
            Some(body) => (body.code, body.message),
            None => (None, None),
        };
        Self {
            status_code: status.as_u16(),
            code: code.unwrap_or_else(|| codes::UNKNOWN_ERROR.to_string()),
            message: message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            }),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_GATEWAY)
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            code: Some(self.code),
            message: Some(self.message),
            timestamp: Some(Utc::now().to_rfc3339()),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_code() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status(), StatusCode::NOT_FOUND);
        assert_eq!(nf.code, codes::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::validation("bad");
        assert_eq!(bad.status_code, 400);
        assert_eq!(bad.code, codes::VALIDATION_ERROR);

        let funds = ApiError::insufficient_funds();
        assert_eq!(funds.status_code, 422);
        assert_eq!(funds.message, "Insufficient funds");
    }

    #[test]
    fn network_errors_have_zero_status() {
        let err = ApiError::network("connection refused");
        assert_eq!(err.status_code, 0);
        assert!(err.is(codes::NETWORK_ERROR));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn from_response_falls_back_to_unknown_error() {
        let err = ApiError::from_response(StatusCode::SERVICE_UNAVAILABLE, None);
        assert_eq!(err.status_code, 503);
        assert_eq!(err.code, codes::UNKNOWN_ERROR);
        assert_eq!(err.message, "Service Unavailable");

        let err = ApiError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(ErrorResponse {
                code: Some("INSUFFICIENT_FUNDS".into()),
                message: Some("Insufficient funds".into()),
                timestamp: None,
            }),
        );
        assert_eq!(err, ApiError::insufficient_funds());
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::insufficient_funds().into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["code"], "INSUFFICIENT_FUNDS");
        assert_eq!(body["message"], "Insufficient funds");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn serializes_with_status_code_field() {
        let json = serde_json::to_value(ApiError::validation("x")).unwrap();
        assert_eq!(json["statusCode"], 400);
    }
}
