// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # In-Memory Store
//!
//! Process-lifetime collections for users, sessions, KYC documents, wallets,
//! transactions and idempotency records. Nothing is persisted.
//!
//! All operations are synchronous. The store is shared behind
//! `Arc<tokio::sync::RwLock<_>>`; every mutating operation runs entirely
//! under the write lock, which is what makes the transfer idempotency
//! check-and-insert atomic.
//!
//! ## Layout
//!
//! - [`users`]: registration, login, sessions, profile, limits, KYC
//! - [`wallets`]: wallet creation, auto-provisioning, balance, freeze
//! - [`transfers`]: the idempotent transfer engine and transaction queries
//! - [`idempotency`]: idempotency-key index
//! - [`fraud`]: fraud scoring rules

pub mod fraud;
pub mod idempotency;
pub mod transfers;
pub mod users;
pub mod wallets;

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::auth::PasswordDigest;
use crate::config::StoreConfig;
use crate::error::ApiError;
use crate::models::{
    KycDocumentResponse, KycStatus, KycTier, RegisterRequest, TransactionDetailResponse, WalletType,
};

use fraud::FraudEngine;
use idempotency::IdempotencyIndex;

pub use transfers::TransferOutcome;

/// Password used by the seeded demo accounts.
pub const DEMO_PASSWORD: &str = "Passw0rd!";

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub id: String,
    pub email: String,
    pub password: PasswordDigest,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub kyc_status: KycStatus,
    pub kyc_tier: KycTier,
    pub is_active: bool,
    pub is_suspended: bool,
    pub fraud_score: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct WalletRecord {
    pub wallet_id: String,
    pub user_id: String,
    pub wallet_type: WalletType,
    pub currency: String,
    pub balance_cents: i64,
    pub is_active: bool,
    pub is_frozen: bool,
    pub freeze_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Store
// =============================================================================

pub struct InMemoryStore {
    users: HashMap<String, UserRecord>,
    /// Lowercased email → user ID.
    users_by_email: HashMap<String, String>,
    sessions: HashMap<String, Session>,
    kyc_documents: Vec<KycDocumentResponse>,
    wallets: HashMap<String, WalletRecord>,
    /// User ID → wallet ID. One wallet per user.
    wallets_by_user: HashMap<String, String>,
    /// Insertion order; newest last.
    transactions: Vec<TransactionDetailResponse>,
    transaction_index: HashMap<String, usize>,
    idempotency: IdempotencyIndex,
    fraud: FraudEngine,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            users: HashMap::new(),
            users_by_email: HashMap::new(),
            sessions: HashMap::new(),
            kyc_documents: Vec::new(),
            wallets: HashMap::new(),
            wallets_by_user: HashMap::new(),
            transactions: Vec::new(),
            transaction_index: HashMap::new(),
            idempotency: IdempotencyIndex::new(
                config.idempotency_cache_capacity,
                config.idempotency_cache_ttl,
            ),
            fraud: FraudEngine::new(config.fraud_blocklist),
        }
    }

    /// Seed two demo accounts with funded wallets.
    ///
    /// Returns the created user IDs. Both use [`DEMO_PASSWORD`].
    pub fn seed_demo_data(&mut self) -> Result<Vec<String>, ApiError> {
        let demo = [
            ("alice@xupay.dev", "Alice", "Nguyen", 50_000_000),
            ("bob@xupay.dev", "Bob", "Tran", 5_000_000),
        ];

        let mut ids = Vec::with_capacity(demo.len());
        for (email, first_name, last_name, balance_cents) in demo {
            let user = self.create_user(RegisterRequest {
                email: email.to_string(),
                password: DEMO_PASSWORD.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone: None,
            })?;
            self.ensure_wallet(&user.id);
            self.deposit(&user.id, balance_cents)?;
            tracing::info!(user_id = %user.id, email = %email, "Seeded demo account");
            ids.push(user.id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_demo_data_creates_funded_accounts() {
        let mut store = InMemoryStore::default();
        let ids = store.seed_demo_data().unwrap();
        assert_eq!(ids.len(), 2);

        let alice = store.wallet_for_user(&ids[0]).unwrap();
        assert_eq!(alice.balance_cents, 500_000 + 50_000_000);
        assert!(!alice.is_frozen);
    }

    #[test]
    fn seeding_twice_conflicts_on_email() {
        let mut store = InMemoryStore::default();
        store.seed_demo_data().unwrap();
        let err = store.seed_demo_data().unwrap_err();
        assert_eq!(err.status_code, 409);
    }
}
