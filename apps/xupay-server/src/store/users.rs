// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User accounts, sessions, limits and KYC documents.

use chrono::Utc;
use url::Url;
use uuid::Uuid;

use super::{InMemoryStore, Session, UserRecord};
use crate::auth::{AuthError, Claims, PasswordDigest, TokenIssuer};
use crate::error::{codes, ApiError};
use crate::models::{
    AuthResponse, CheckLimitRequest, DailyUsageResponse, KycDocumentResponse, KycStatus, KycTier,
    LimitCheckResponse, LimitDirection, LoginRequest, ProfileResponse, RegisterRequest,
    TransactionStatus, UpdateProfileRequest, UploadKycDocumentRequest, UserLimitsResponse,
    UserResponse, ValidateTokenResponse,
};

const MAX_EMAIL_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_NAME_LEN: usize = 100;

// =============================================================================
// Validation
// =============================================================================

fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::validation("Email must not exceed 255 characters"));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::validation("Invalid email format"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(ApiError::validation(
            "Password must be between 8 and 128 characters",
        ));
    }
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ApiError::validation(
            "Password must contain at least one uppercase letter, one lowercase letter, and one digit",
        ));
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "{field} must not exceed 100 characters"
        )));
    }
    Ok(())
}

/// E.164: `+`, a non-zero digit, then up to 14 more digits.
fn validate_phone(phone: &str) -> Result<(), ApiError> {
    let valid = phone
        .strip_prefix('+')
        .map(|digits| {
            (2..=15).contains(&digits.len())
                && digits.chars().all(|c| c.is_ascii_digit())
                && !digits.starts_with('0')
        })
        .unwrap_or(false);
    if !valid {
        return Err(ApiError::validation(
            "Phone number must be in E.164 format (e.g., +84901234567)",
        ));
    }
    Ok(())
}

fn validate_nationality(code: &str) -> Result<(), ApiError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::validation(
            "Nationality must be an ISO 3166-1 alpha-3 code",
        ));
    }
    Ok(())
}

fn validate_file_url(file_url: &str) -> Result<(), ApiError> {
    let url = Url::parse(file_url)
        .map_err(|e| ApiError::validation(format!("fileUrl is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::validation("fileUrl must use http or https"));
    }
    Ok(())
}

// =============================================================================
// Tier limits
// =============================================================================

/// Limits granted at each KYC tier.
pub fn tier_limits(tier: KycTier) -> UserLimitsResponse {
    let (send, receive, single, monthly, per_day, per_hour, international, merchant) = match tier {
        KycTier::Tier0 => (200_000, 500_000, 100_000, 2_000_000, 5, 3, false, false),
        KycTier::Tier1 => (500_000, 1_000_000, 250_000, 10_000_000, 20, 5, false, true),
        KycTier::Tier2 => (1_000_000, 2_000_000, 500_000, 20_000_000, 50, 10, true, true),
        KycTier::Tier3 => (10_000_000, 20_000_000, 5_000_000, 200_000_000, 200, 50, true, true),
    };
    UserLimitsResponse {
        kyc_tier: tier,
        daily_send_limit_cents: send,
        daily_receive_limit_cents: receive,
        single_transaction_max_cents: single,
        monthly_volume_limit_cents: monthly,
        max_transactions_per_day: per_day,
        max_transactions_per_hour: per_hour,
        can_send_international: international,
        can_receive_merchant_payments: merchant,
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl UserRecord {
    fn to_user(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            kyc_status: self.kyc_status,
            kyc_tier: self.kyc_tier,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }

    fn to_profile(&self) -> ProfileResponse {
        ProfileResponse {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            date_of_birth: self.date_of_birth,
            nationality: self.nationality.clone(),
            kyc_status: self.kyc_status,
            kyc_tier: self.kyc_tier,
            is_active: self.is_active,
            is_suspended: self.is_suspended,
            fraud_score: self.fraud_score,
            created_at: self.created_at,
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

impl InMemoryStore {
    fn user(&self, user_id: &str) -> Result<&UserRecord, ApiError> {
        self.users
            .get(user_id)
            .ok_or_else(|| ApiError::not_found(format!("User not found: {user_id}")))
    }

    /// Validate and store a new account without opening a session.
    pub fn create_user(&mut self, request: RegisterRequest) -> Result<UserResponse, ApiError> {
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        validate_name("First name", &request.first_name)?;
        validate_name("Last name", &request.last_name)?;
        if let Some(phone) = &request.phone {
            validate_phone(phone)?;
        }

        let email_key = request.email.trim().to_lowercase();
        if self.users_by_email.contains_key(&email_key) {
            tracing::warn!(email = %email_key, "Registration rejected: duplicate email");
            return Err(ApiError::conflict(
                codes::DUPLICATE_EMAIL,
                format!("Email already registered: {}", request.email.trim()),
            ));
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: request.email.trim().to_string(),
            password: PasswordDigest::new(&request.password),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            phone: request.phone,
            date_of_birth: None,
            nationality: None,
            kyc_status: KycStatus::Pending,
            kyc_tier: KycTier::Tier0,
            is_active: true,
            is_suspended: false,
            fraud_score: 0,
            created_at: Utc::now(),
        };
        let user = record.to_user();

        tracing::info!(user_id = %record.id, "User registered");
        self.users_by_email.insert(email_key, record.id.clone());
        self.users.insert(record.id.clone(), record);
        Ok(user)
    }

    /// Register and open a session in one step.
    pub fn register(&mut self, tokens: &TokenIssuer, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        let user = self.create_user(request)?;
        self.open_session(tokens, user)
    }

    pub fn login(&mut self, tokens: &TokenIssuer, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        let email_key = request.email.trim().to_lowercase();
        let record = self
            .users_by_email
            .get(&email_key)
            .and_then(|id| self.users.get(id))
            .filter(|user| user.password.verify(&request.password))
            .ok_or_else(|| {
                tracing::warn!(email = %email_key, "Login failed: invalid credentials");
                ApiError::invalid_credentials()
            })?;

        if record.is_suspended {
            tracing::warn!(user_id = %record.id, "Login rejected: account suspended");
            return Err(ApiError::account_suspended());
        }

        let user = record.to_user();
        self.open_session(tokens, user)
    }

    fn open_session(&mut self, tokens: &TokenIssuer, user: UserResponse) -> Result<AuthResponse, ApiError> {
        let session_id = Uuid::new_v4().to_string();
        let issued = tokens.issue(&user.id, &user.email, &session_id)?;

        self.sessions.insert(
            session_id.clone(),
            Session {
                user_id: user.id.clone(),
                expires_at: issued.expires_at,
                revoked: false,
            },
        );
        tracing::info!(user_id = %user.id, session_id = %session_id, "Session opened");

        Ok(AuthResponse {
            access_token: issued.token,
            expires_at: issued.expires_at,
            user_id: Some(user.id.clone()),
            user,
        })
    }

    /// Close a session. Unknown sessions are ignored.
    pub fn logout(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.revoked = true;
            tracing::info!(user_id = %session.user_id, session_id = %session_id, "Session closed");
        }
    }

    /// Confirm verified claims still refer to an open session of an
    /// account in good standing.
    pub fn check_session(&self, claims: &Claims) -> Result<(), AuthError> {
        let session = self
            .sessions
            .get(&claims.sid)
            .filter(|session| session.user_id == claims.sub)
            .ok_or(AuthError::SessionRevoked)?;
        if session.revoked {
            return Err(AuthError::SessionRevoked);
        }
        if session.expires_at < Utc::now() - chrono::Duration::seconds(60) {
            return Err(AuthError::TokenExpired);
        }

        let user = self.users.get(&claims.sub).ok_or(AuthError::SessionRevoked)?;
        if user.is_suspended {
            return Err(AuthError::AccountSuspended);
        }
        Ok(())
    }

    /// Never fails: anything short of a verified open session is `valid: false`.
    pub fn validate_token(&self, tokens: &TokenIssuer, token: &str) -> ValidateTokenResponse {
        match tokens
            .verify(token)
            .and_then(|claims| self.check_session(&claims).map(|()| claims))
        {
            Ok(claims) => ValidateTokenResponse {
                valid: true,
                user_id: Some(claims.sub),
                expires_at: chrono::DateTime::from_timestamp(claims.exp, 0),
            },
            Err(_) => ValidateTokenResponse::default(),
        }
    }

    pub fn suspend_user(&mut self, user_id: &str, suspended: bool) -> Result<ProfileResponse, ApiError> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| ApiError::not_found(format!("User not found: {user_id}")))?;
        user.is_suspended = suspended;
        tracing::info!(user_id = %user_id, suspended, "User suspension changed");
        Ok(user.to_profile())
    }

    pub fn current_user(&self, user_id: &str) -> Result<UserResponse, ApiError> {
        self.user(user_id).map(UserRecord::to_user)
    }

    pub fn profile(&self, user_id: &str) -> Result<ProfileResponse, ApiError> {
        self.user(user_id).map(UserRecord::to_profile)
    }

    /// Apply the provided fields. All fields are validated before any is
    /// written.
    pub fn update_profile(
        &mut self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<ProfileResponse, ApiError> {
        if let Some(first_name) = &request.first_name {
            validate_name("First name", first_name)?;
        }
        if let Some(last_name) = &request.last_name {
            validate_name("Last name", last_name)?;
        }
        if let Some(phone) = &request.phone {
            validate_phone(phone)?;
        }
        if let Some(nationality) = &request.nationality {
            validate_nationality(nationality)?;
        }
        if let Some(date_of_birth) = request.date_of_birth {
            if date_of_birth >= Utc::now().date_naive() {
                return Err(ApiError::validation("Date of birth must be in the past"));
            }
        }

        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| ApiError::not_found(format!("User not found: {user_id}")))?;

        if let Some(first_name) = request.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            user.last_name = last_name.trim().to_string();
        }
        if request.phone.is_some() {
            user.phone = request.phone;
        }
        if request.date_of_birth.is_some() {
            user.date_of_birth = request.date_of_birth;
        }
        if request.nationality.is_some() {
            user.nationality = request.nationality;
        }

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(user.to_profile())
    }

    pub fn limits(&self, user_id: &str) -> Result<UserLimitsResponse, ApiError> {
        self.user(user_id).map(|user| tier_limits(user.kyc_tier))
    }

    /// Today's (UTC) completed transfer totals for the user.
    pub fn daily_usage(&self, user_id: &str) -> Result<DailyUsageResponse, ApiError> {
        self.user(user_id)?;
        let today = Utc::now().date_naive();

        let mut usage = DailyUsageResponse {
            user_id: user_id.to_string(),
            usage_date: today,
            total_sent_cents: 0,
            total_sent_count: 0,
            total_received_cents: 0,
            total_received_count: 0,
        };

        let todays = self.transactions.iter().filter(|tx| {
            tx.status == TransactionStatus::Completed && tx.created_at.date_naive() == today
        });
        for tx in todays {
            if tx.from_user_id == user_id {
                usage.total_sent_cents += tx.amount_cents;
                usage.total_sent_count += 1;
            }
            if tx.to_user_id == user_id {
                usage.total_received_cents += tx.amount_cents;
                usage.total_received_count += 1;
            }
        }
        Ok(usage)
    }

    /// Check an amount against the user's tier limits.
    ///
    /// `remainingDailyCents` is the headroom before this amount.
    pub fn check_limit(&self, user_id: &str, request: CheckLimitRequest) -> Result<LimitCheckResponse, ApiError> {
        if request.amount_cents <= 0 {
            return Err(ApiError::validation("amountCents must be positive"));
        }

        let limits = self.limits(user_id)?;
        let usage = self.daily_usage(user_id)?;
        let (daily_limit, used, label) = match request.direction {
            LimitDirection::Send => (limits.daily_send_limit_cents, usage.total_sent_cents, "send"),
            LimitDirection::Receive => (
                limits.daily_receive_limit_cents,
                usage.total_received_cents,
                "receive",
            ),
        };
        let remaining = (daily_limit - used).max(0);

        let reason = if request.direction == LimitDirection::Send
            && request.amount_cents > limits.single_transaction_max_cents
        {
            Some(format!(
                "Amount exceeds single transaction maximum of {} cents",
                limits.single_transaction_max_cents
            ))
        } else if request.amount_cents > remaining {
            Some(format!("Daily {label} limit exceeded"))
        } else {
            None
        };

        Ok(LimitCheckResponse {
            allowed: reason.is_none(),
            reason,
            remaining_daily_cents: Some(remaining),
        })
    }

    pub fn upload_kyc_document(
        &mut self,
        user_id: &str,
        request: UploadKycDocumentRequest,
    ) -> Result<KycDocumentResponse, ApiError> {
        validate_file_url(&request.file_url)?;
        if let Some(country) = &request.document_country {
            validate_nationality(country)?;
        }

        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| ApiError::not_found(format!("User not found: {user_id}")))?;
        user.kyc_status = KycStatus::Pending;

        let now = Utc::now();
        let document = KycDocumentResponse {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            document_type: request.document_type,
            document_number: request.document_number,
            document_country: request.document_country,
            file_url: request.file_url,
            verification_status: KycStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        tracing::info!(
            user_id = %user_id,
            document_id = %document.id,
            document_type = ?document.document_type,
            "KYC document uploaded"
        );
        self.kyc_documents.push(document.clone());
        Ok(document)
    }

    /// The user's documents, newest first.
    pub fn kyc_documents(&self, user_id: &str) -> Vec<KycDocumentResponse> {
        self.kyc_documents
            .iter()
            .rev()
            .filter(|doc| doc.user_id == user_id)
            .cloned()
            .collect()
    }

    /// One of the user's documents. Other users' documents are not found.
    pub fn kyc_document(&self, user_id: &str, document_id: &str) -> Result<KycDocumentResponse, ApiError> {
        self.kyc_documents
            .iter()
            .find(|doc| doc.id == document_id && doc.user_id == user_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("KYC document not found: {document_id}")))
    }
}
