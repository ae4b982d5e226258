// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Email at issue time
    pub email: String,
    /// Session ID, revoked on logout
    pub sid: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated user information extracted from a verified token.
///
/// This is the primary type handlers use to represent the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    pub email: String,

    /// Session the token belongs to
    pub session_id: String,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: i64,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            session_id: claims.sid,
            expires_at: claims.exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claims_extracts_user_and_session() {
        let user = AuthenticatedUser::from(Claims {
            sub: "user_123".to_string(),
            email: "a@example.com".to_string(),
            sid: "sess_abc".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        });
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.session_id, "sess_abc");
        assert_eq!(user.expires_at, 1_700_003_600);
    }
}
