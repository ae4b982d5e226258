// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 access token issuing and verification.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, Claims};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly signed token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens with a shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id` bound to `session_id`.
    pub fn issue(&self, user_id: &str, email: &str, session_id: &str) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AuthError::InternalError(format!("token ttl out of range: {e}")))?;
        let expires_at = now + ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("failed to sign token: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::MalformedToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn issue_then_verify_round_trips_claims() {
        let issuer = issuer();
        let issued = issuer.issue("user_1", "a@example.com", "sess_1").unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, "user_1");
        assert_eq!(claims.sid, "sess_1");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let issued = issuer().issue("user_1", "a@example.com", "sess_1").unwrap();
        let other = TokenIssuer::new("other-secret", Duration::from_secs(3600));
        assert!(matches!(
            other.verify(&issued.token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let issuer = issuer();
        let past = Utc::now().timestamp() - 3600;
        let claims = Claims {
            sub: "user_1".into(),
            email: "a@example.com".into(),
            sid: "sess_1".into(),
            iat: past - 60,
            exp: past,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &issuer.encoding).unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(matches!(
            issuer().verify("not-a-jwt"),
            Err(AuthError::MalformedToken)
        ));
    }
}
