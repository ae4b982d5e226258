// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session-backed HS256 bearer tokens for the XuPay API.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in via `/api/auth/*`
//! 2. Server opens a session and issues a JWT carrying the session ID (`sid`)
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. Server:
//!    - Verifies signature and expiry
//!    - Checks the session is still open (logout revokes it)
//!    - Extracts `sub` → canonical `user_id`
//!
//! ## Security
//!
//! - All non-health, non-login endpoints require authentication
//! - Passwords are stored as salted HMAC-SHA256 digests, never in clear
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod token;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::Auth;
pub use password::PasswordDigest;
pub use token::TokenIssuer;
