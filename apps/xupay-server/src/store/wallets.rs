// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet operations.
//!
//! Each user owns at most one wallet. Wallets are provisioned on first use
//! with an opening balance so that transfers between freshly registered
//! users work out of the box.

use chrono::Utc;
use uuid::Uuid;

use super::{InMemoryStore, WalletRecord};
use crate::error::{codes, ApiError};
use crate::models::{
    cents_to_amount, CreateWalletRequest, CreateWalletResponse, FreezeWalletRequest,
    WalletBalanceResponse, WalletType, DEFAULT_CURRENCY,
};

/// Balance every new wallet opens with.
pub const OPENING_BALANCE_CENTS: i64 = 500_000;

impl WalletRecord {
    fn open(wallet_id: String, user_id: &str, wallet_type: WalletType, currency: &str) -> Self {
        Self {
            wallet_id,
            user_id: user_id.to_string(),
            wallet_type,
            currency: currency.to_string(),
            balance_cents: OPENING_BALANCE_CENTS,
            is_active: true,
            is_frozen: false,
            freeze_reason: None,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn to_balance(&self) -> WalletBalanceResponse {
        WalletBalanceResponse {
            wallet_id: self.wallet_id.clone(),
            user_id: self.user_id.clone(),
            balance_cents: self.balance_cents,
            balance_amount: cents_to_amount(self.balance_cents),
            currency: self.currency.clone(),
            is_active: self.is_active,
            is_frozen: self.is_frozen,
        }
    }

    fn to_created(&self) -> CreateWalletResponse {
        CreateWalletResponse {
            wallet_id: self.wallet_id.clone(),
            user_id: self.user_id.clone(),
            gl_account_code: self.wallet_type.gl_account_code().to_string(),
            wallet_type: self.wallet_type,
            currency: self.currency.clone(),
            balance_cents: self.balance_cents,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::validation("userId is required"));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), ApiError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::validation(format!(
            "currency must be a 3-letter ISO code, got {currency:?}"
        )));
    }
    Ok(())
}

impl InMemoryStore {
    pub fn create_wallet(&mut self, request: CreateWalletRequest) -> Result<CreateWalletResponse, ApiError> {
        validate_user_id(&request.user_id)?;
        validate_currency(&request.currency)?;

        if self.wallets_by_user.contains_key(&request.user_id) {
            return Err(ApiError::conflict(
                codes::WALLET_EXISTS,
                format!("Wallet already exists for user {}", request.user_id),
            ));
        }

        let record = WalletRecord::open(
            Uuid::new_v4().to_string(),
            &request.user_id,
            request.wallet_type,
            &request.currency,
        );
        let response = record.to_created();

        tracing::info!(
            wallet_id = %record.wallet_id,
            user_id = %record.user_id,
            gl_account_code = %response.gl_account_code,
            "Wallet created"
        );
        self.wallets_by_user
            .insert(record.user_id.clone(), record.wallet_id.clone());
        self.wallets.insert(record.wallet_id.clone(), record);
        Ok(response)
    }

    /// The user's wallet, provisioning a personal one if none exists.
    pub(crate) fn ensure_wallet(&mut self, user_id: &str) -> &mut WalletRecord {
        let wallet_id = self
            .wallets_by_user
            .entry(user_id.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone();

        self.wallets.entry(wallet_id.clone()).or_insert_with(|| {
            tracing::info!(wallet_id = %wallet_id, user_id = %user_id, "Provisioned wallet on first use");
            WalletRecord::open(wallet_id, user_id, WalletType::Personal, DEFAULT_CURRENCY)
        })
    }

    /// Wallet for `user_id`, provisioning it on first access.
    pub fn wallet_by_user(&mut self, user_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        validate_user_id(user_id)?;
        Ok(self.ensure_wallet(user_id).to_balance())
    }

    /// Wallet for `user_id` without provisioning.
    pub fn wallet_for_user(&self, user_id: &str) -> Option<WalletBalanceResponse> {
        let wallet_id = self.wallets_by_user.get(user_id)?;
        self.wallets.get(wallet_id).map(WalletRecord::to_balance)
    }

    pub fn wallet_balance(&self, wallet_id: &str) -> Result<WalletBalanceResponse, ApiError> {
        self.wallets
            .get(wallet_id)
            .map(WalletRecord::to_balance)
            .ok_or_else(|| ApiError::not_found(format!("Wallet not found: {wallet_id}")))
    }

    /// Freeze or unfreeze. Never touches the balance.
    pub fn freeze_wallet(
        &mut self,
        wallet_id: &str,
        request: FreezeWalletRequest,
    ) -> Result<WalletBalanceResponse, ApiError> {
        let wallet = self
            .wallets
            .get_mut(wallet_id)
            .ok_or_else(|| ApiError::not_found(format!("Wallet not found: {wallet_id}")))?;

        wallet.is_frozen = request.freeze;
        wallet.freeze_reason = if request.freeze { request.reason } else { None };

        tracing::info!(
            wallet_id = %wallet_id,
            frozen = wallet.is_frozen,
            reason = ?wallet.freeze_reason,
            "Wallet freeze state changed"
        );
        Ok(wallet.to_balance())
    }

    pub fn set_wallet_active(&mut self, wallet_id: &str, active: bool) -> Result<WalletBalanceResponse, ApiError> {
        let wallet = self
            .wallets
            .get_mut(wallet_id)
            .ok_or_else(|| ApiError::not_found(format!("Wallet not found: {wallet_id}")))?;
        wallet.is_active = active;
        tracing::info!(wallet_id = %wallet_id, active, "Wallet activation changed");
        Ok(wallet.to_balance())
    }

    /// Credit funds from outside the ledger (seeding, top-ups).
    pub fn deposit(&mut self, user_id: &str, amount_cents: i64) -> Result<WalletBalanceResponse, ApiError> {
        validate_user_id(user_id)?;
        if amount_cents <= 0 {
            return Err(ApiError::validation("amountCents must be positive"));
        }
        let wallet = self.ensure_wallet(user_id);
        wallet.balance_cents = wallet
            .balance_cents
            .checked_add(amount_cents)
            .ok_or_else(|| ApiError::validation("deposit overflows wallet balance"))?;
        Ok(wallet.to_balance())
    }
}
