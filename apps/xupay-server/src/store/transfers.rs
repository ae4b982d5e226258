// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transfer Engine
//!
//! Idempotent wallet-to-wallet transfers.
//!
//! ## Processing order
//!
//! 1. Validate the request (positive amount, distinct non-blank parties)
//! 2. Replay: a known idempotency key returns its stored record verbatim
//! 3. Reject amounts above [`MAX_TRANSFER_CENTS`]
//! 4. Provision both wallets; both must be active and not frozen
//! 5. Fraud rules: block, or flag and continue
//! 6. Balance check; a shortfall records a `FAILED` transaction for audit
//! 7. Post both ledger entries, complete, bind the record to its key
//!
//! Calls without a key get a generated one, so every completed transfer is
//! retrievable by key. Failed attempts are never bound to a key: a retry
//! after topping up the wallet can still succeed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::fraud::{FraudContext, VELOCITY_WINDOW};
use super::idempotency::normalize_key;
use super::{InMemoryStore, WalletRecord};
use crate::error::ApiError;
use crate::models::{
    cents_to_amount, EntryType, LedgerEntry, ListTransactionsQuery, TransactionDetailResponse,
    TransactionPage, TransactionStatus, TransactionType, TransferRequest, TransferResponse,
};

/// Largest amount a single transfer may move.
pub const MAX_TRANSFER_CENTS: i64 = 100_000_000;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Result of [`InMemoryStore::transfer`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub response: TransferResponse,
    /// `true` when an earlier record was returned for the same key.
    pub replayed: bool,
}

fn validate_transfer(request: &TransferRequest) -> Result<(), ApiError> {
    if request.from_user_id.trim().is_empty() {
        return Err(ApiError::validation("fromUserId is required"));
    }
    if request.to_user_id.trim().is_empty() {
        return Err(ApiError::validation("toUserId is required"));
    }
    if request.from_user_id == request.to_user_id {
        return Err(ApiError::validation("Cannot transfer to the same user"));
    }
    if request.amount_cents <= 0 {
        return Err(ApiError::validation("amountCents must be a positive integer"));
    }
    Ok(())
}

fn ensure_usable(wallet: &WalletRecord) -> Result<(), ApiError> {
    if wallet.is_frozen {
        return Err(ApiError::wallet_frozen(&wallet.wallet_id));
    }
    if !wallet.is_active {
        return Err(ApiError::wallet_inactive(&wallet.wallet_id));
    }
    Ok(())
}

fn to_transfer_response(detail: &TransactionDetailResponse, key: &str) -> TransferResponse {
    TransferResponse {
        transaction_id: detail.transaction_id.clone(),
        idempotency_key: Some(key.to_string()),
        from_wallet_id: detail.from_wallet_id.clone(),
        to_wallet_id: detail.to_wallet_id.clone(),
        from_user_id: detail.from_user_id.clone(),
        to_user_id: detail.to_user_id.clone(),
        amount_cents: detail.amount_cents,
        amount: cents_to_amount(detail.amount_cents),
        currency: detail.currency.clone(),
        transaction_type: detail.transaction_type,
        status: detail.status,
        description: detail.description.clone(),
        is_flagged: detail.is_flagged,
        fraud_score: detail.fraud_score,
        created_at: detail.created_at,
        completed_at: detail.completed_at,
    }
}

impl InMemoryStore {
    fn wallet_mut(&mut self, wallet_id: &str) -> Result<&mut WalletRecord, ApiError> {
        self.wallets
            .get_mut(wallet_id)
            .ok_or_else(|| ApiError::internal(format!("wallet {wallet_id} vanished mid-transfer")))
    }

    fn recent_transfer_count(&self, user_id: &str, now: DateTime<Utc>) -> usize {
        let window = chrono::Duration::from_std(VELOCITY_WINDOW).unwrap_or_else(|_| chrono::Duration::hours(1));
        let since = now - window;
        self.transactions
            .iter()
            .filter(|tx| tx.from_user_id == user_id && tx.created_at >= since)
            .count()
    }

    fn record_transaction(&mut self, detail: TransactionDetailResponse) {
        self.transaction_index
            .insert(detail.transaction_id.clone(), self.transactions.len());
        self.transactions.push(detail);
    }

    /// Execute a transfer at most once per idempotency key.
    pub fn transfer(&mut self, request: TransferRequest) -> Result<TransferOutcome, ApiError> {
        validate_transfer(&request)?;

        let supplied_key = normalize_key(request.idempotency_key.as_deref());
        if let Some(key) = &supplied_key {
            if let Some(existing) = self.idempotency.get(key) {
                if existing.from_user_id != request.from_user_id
                    || existing.to_user_id != request.to_user_id
                    || existing.amount_cents != request.amount_cents
                {
                    tracing::warn!(
                        idempotency_key = %key,
                        transaction_id = %existing.transaction_id,
                        "Idempotency key reused with a different payload; returning original record"
                    );
                }
                tracing::info!(
                    idempotency_key = %key,
                    transaction_id = %existing.transaction_id,
                    "Idempotent replay"
                );
                return Ok(TransferOutcome {
                    response: existing,
                    replayed: true,
                });
            }
        }
        let key = supplied_key.unwrap_or_else(|| Uuid::new_v4().to_string());

        if request.amount_cents > MAX_TRANSFER_CENTS {
            tracing::warn!(
                amount_cents = request.amount_cents,
                max_cents = MAX_TRANSFER_CENTS,
                "Transfer rejected: amount above maximum"
            );
            return Err(ApiError::insufficient_funds());
        }

        let from_wallet_id = self.ensure_wallet(&request.from_user_id).wallet_id.clone();
        let to_wallet_id = self.ensure_wallet(&request.to_user_id).wallet_id.clone();

        let (currency, sender_balance, from_gl) = {
            let sender = self.wallet_mut(&from_wallet_id)?;
            ensure_usable(sender).inspect_err(|e| {
                tracing::warn!(wallet_id = %from_wallet_id, code = %e.code, "Transfer rejected: sender wallet unusable");
            })?;
            (
                sender.currency.clone(),
                sender.balance_cents,
                sender.wallet_type.gl_account_code(),
            )
        };
        let to_gl = {
            let receiver = self.wallet_mut(&to_wallet_id)?;
            ensure_usable(receiver).inspect_err(|e| {
                tracing::warn!(wallet_id = %to_wallet_id, code = %e.code, "Transfer rejected: receiver wallet unusable");
            })?;
            if receiver.currency != currency {
                return Err(ApiError::validation(format!(
                    "Currency mismatch: sender wallet is {currency}, receiver wallet is {}",
                    receiver.currency
                )));
            }
            receiver.wallet_type.gl_account_code()
        };

        let now = Utc::now();
        let evaluation = self.fraud.evaluate(FraudContext {
            from_user_id: &request.from_user_id,
            amount_cents: request.amount_cents,
            recent_transfers: self.recent_transfer_count(&request.from_user_id, now),
            ip_address: request.ip_address.as_deref(),
            user_agent: request.user_agent.as_deref(),
        });
        if evaluation.should_block {
            tracing::warn!(
                from_user_id = %request.from_user_id,
                rules = ?evaluation.triggered_rules,
                "Transfer blocked by fraud rules"
            );
            return Err(ApiError::fraud_blocked(&evaluation.triggered_rules));
        }
        if evaluation.total_score > 0 {
            if let Some(user) = self.users.get_mut(&request.from_user_id) {
                user.fraud_score = user.fraud_score.max(evaluation.total_score.min(100));
            }
        }

        let mut detail = TransactionDetailResponse {
            transaction_id: Uuid::new_v4().to_string(),
            transaction_type: TransactionType::Transfer,
            status: TransactionStatus::Pending,
            amount_cents: request.amount_cents,
            currency,
            description: request.description.clone(),
            from_user_id: request.from_user_id.clone(),
            to_user_id: request.to_user_id.clone(),
            from_wallet_id: from_wallet_id.clone(),
            to_wallet_id: to_wallet_id.clone(),
            is_flagged: evaluation.should_flag,
            fraud_score: evaluation.total_score,
            fraud_reason: evaluation.reason(),
            created_at: now,
            completed_at: None,
            ledger_entries: Vec::new(),
        };

        if sender_balance < request.amount_cents {
            detail.status = TransactionStatus::Failed;
            tracing::warn!(
                transaction_id = %detail.transaction_id,
                wallet_id = %from_wallet_id,
                balance_cents = sender_balance,
                amount_cents = request.amount_cents,
                "Transfer failed: insufficient funds"
            );
            self.record_transaction(detail);
            return Err(ApiError::insufficient_funds());
        }

        // Post both legs. Balances were checked above and the write lock is
        // held for the whole call, so neither leg can fail halfway.
        let sender_after = {
            let sender = self.wallet_mut(&from_wallet_id)?;
            sender.balance_cents -= request.amount_cents;
            sender.balance_cents
        };
        let receiver_after = {
            let receiver = self.wallet_mut(&to_wallet_id)?;
            receiver.balance_cents += request.amount_cents;
            receiver.balance_cents
        };
        detail.ledger_entries = vec![
            LedgerEntry {
                entry_id: Uuid::new_v4().to_string(),
                wallet_id: from_wallet_id,
                gl_account_code: from_gl.to_string(),
                entry_type: EntryType::Debit,
                amount_cents: request.amount_cents,
                balance_after_cents: sender_after,
                created_at: now,
            },
            LedgerEntry {
                entry_id: Uuid::new_v4().to_string(),
                wallet_id: to_wallet_id,
                gl_account_code: to_gl.to_string(),
                entry_type: EntryType::Credit,
                amount_cents: request.amount_cents,
                balance_after_cents: receiver_after,
                created_at: now,
            },
        ];
        detail.status = TransactionStatus::Completed;
        detail.completed_at = Some(Utc::now());

        let response = to_transfer_response(&detail, &key);
        self.record_transaction(detail);
        self.idempotency.insert(&key, response.clone());

        tracing::info!(
            transaction_id = %response.transaction_id,
            idempotency_key = %key,
            amount_cents = response.amount_cents,
            flagged = response.is_flagged,
            fraud_score = response.fraud_score,
            "Transfer completed"
        );

        Ok(TransferOutcome {
            response,
            replayed: false,
        })
    }

    pub fn transaction(&self, transaction_id: &str) -> Result<TransactionDetailResponse, ApiError> {
        self.transaction_index
            .get(transaction_id)
            .and_then(|idx| self.transactions.get(*idx))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Transaction not found: {transaction_id}")))
    }

    /// Stored record for a key; `None` for unknown or blank keys.
    pub fn by_idempotency_key(&self, key: &str) -> Option<TransferResponse> {
        let key = normalize_key(Some(key))?;
        self.idempotency.get(&key)
    }

    pub fn idempotency_key_count(&self) -> usize {
        self.idempotency.len()
    }

    /// Transactions newest first, optionally restricted to one user.
    pub fn list_transactions(&self, query: &ListTransactionsQuery) -> TransactionPage {
        let page = query.page.unwrap_or(0);
        let size = query
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let matching: Vec<&TransactionDetailResponse> = self
            .transactions
            .iter()
            .rev()
            .filter(|tx| match &query.user_id {
                Some(user_id) => &tx.from_user_id == user_id || &tx.to_user_id == user_id,
                None => true,
            })
            .collect();

        TransactionPage {
            total: matching.len(),
            items: matching
                .into_iter()
                .skip(page.saturating_mul(size))
                .take(size)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::models::FreezeWalletRequest;
    use crate::store::wallets::OPENING_BALANCE_CENTS;

    fn transfer_request(key: Option<&str>, amount_cents: i64) -> TransferRequest {
        TransferRequest {
            idempotency_key: key.map(str::to_string),
            from_user_id: "user-a".to_string(),
            to_user_id: "user-b".to_string(),
            amount_cents,
            description: Some("lunch".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn same_key_returns_same_record_and_moves_money_once() {
        let mut store = InMemoryStore::default();

        let first = store.transfer(transfer_request(Some("k1"), 1_000)).unwrap();
        let second = store.transfer(transfer_request(Some("k1"), 1_000)).unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.response, second.response);
        assert_eq!(first.response.status, TransactionStatus::Completed);
        assert_eq!(first.response.amount_cents, 1_000);
        assert_eq!(first.response.amount, 10.0);

        let sender = store.wallet_for_user("user-a").unwrap();
        let receiver = store.wallet_for_user("user-b").unwrap();
        assert_eq!(sender.balance_cents, OPENING_BALANCE_CENTS - 1_000);
        assert_eq!(receiver.balance_cents, OPENING_BALANCE_CENTS + 1_000);
        assert_eq!(store.list_transactions(&Default::default()).total, 1);
    }

    #[test]
    fn missing_key_generates_distinct_transactions() {
        let mut store = InMemoryStore::default();
        let a = store.transfer(transfer_request(None, 100)).unwrap().response;
        let b = store.transfer(transfer_request(None, 100)).unwrap().response;

        assert_ne!(a.transaction_id, b.transaction_id);
        let key_a = a.idempotency_key.clone().unwrap();
        assert_ne!(Some(key_a.clone()), b.idempotency_key);
        assert_eq!(store.by_idempotency_key(&key_a), Some(a));
    }

    #[test]
    fn blank_key_is_treated_as_absent() {
        let mut store = InMemoryStore::default();
        let a = store.transfer(transfer_request(Some("  "), 100)).unwrap().response;
        let b = store.transfer(transfer_request(Some(""), 100)).unwrap().response;
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[test]
    fn by_idempotency_key_unknown_then_known() {
        let mut store = InMemoryStore::default();
        assert!(store.by_idempotency_key("k1").is_none());

        let created = store.transfer(transfer_request(Some("k1"), 500)).unwrap().response;
        assert_eq!(store.by_idempotency_key("k1"), Some(created));
    }

    #[test]
    fn invalid_requests_create_nothing() {
        let mut store = InMemoryStore::default();

        for amount in [0, -5] {
            let err = store.transfer(transfer_request(Some("bad"), amount)).unwrap_err();
            assert_eq!(err.status_code, 400);
            assert_eq!(err.code, codes::VALIDATION_ERROR);
        }

        let mut missing = transfer_request(None, 100);
        missing.to_user_id = " ".into();
        assert!(store.transfer(missing).is_err());

        let mut same = transfer_request(None, 100);
        same.to_user_id = same.from_user_id.clone();
        assert!(store.transfer(same).is_err());

        assert!(store.by_idempotency_key("bad").is_none());
        assert_eq!(store.list_transactions(&Default::default()).total, 0);
        assert!(store.wallet_for_user("user-a").is_none());
    }

    #[test]
    fn oversized_amount_is_insufficient_funds() {
        let mut store = InMemoryStore::default();
        let err = store
            .transfer(transfer_request(Some("big"), MAX_TRANSFER_CENTS + 1))
            .unwrap_err();
        assert_eq!(err.status_code, 422);
        assert_eq!(err.code, codes::INSUFFICIENT_FUNDS);
        assert_eq!(err.message, "Insufficient funds");
        assert!(store.by_idempotency_key("big").is_none());
    }

    #[test]
    fn shortfall_records_failed_transaction_without_binding_key() {
        let mut store = InMemoryStore::default();
        let err = store
            .transfer(transfer_request(Some("k-short"), OPENING_BALANCE_CENTS + 1))
            .unwrap_err();
        assert_eq!(err.code, codes::INSUFFICIENT_FUNDS);

        let page = store.list_transactions(&Default::default());
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, TransactionStatus::Failed);
        assert!(page.items[0].ledger_entries.is_empty());
        assert!(store.by_idempotency_key("k-short").is_none());

        // Retry after a top-up succeeds under the same key.
        store.deposit("user-a", 10).unwrap();
        let retried = store
            .transfer(transfer_request(Some("k-short"), OPENING_BALANCE_CENTS + 1))
            .unwrap();
        assert_eq!(retried.response.status, TransactionStatus::Completed);
        assert_eq!(store.wallet_for_user("user-a").unwrap().balance_cents, 9);
    }

    #[test]
    fn frozen_sender_and_receiver_are_rejected() {
        let mut store = InMemoryStore::default();
        let sender = store.wallet_by_user("user-a").unwrap();
        let receiver = store.wallet_by_user("user-b").unwrap();

        let freeze = FreezeWalletRequest {
            freeze: true,
            reason: Some("review".into()),
        };
        store.freeze_wallet(&sender.wallet_id, freeze.clone()).unwrap();
        let err = store.transfer(transfer_request(Some("k1"), 100)).unwrap_err();
        assert_eq!(err.status_code, 422);
        assert_eq!(err.code, codes::WALLET_FROZEN);

        store
            .freeze_wallet(
                &sender.wallet_id,
                FreezeWalletRequest {
                    freeze: false,
                    reason: None,
                },
            )
            .unwrap();
        store.freeze_wallet(&receiver.wallet_id, freeze).unwrap();
        let err = store.transfer(transfer_request(Some("k1"), 100)).unwrap_err();
        assert_eq!(err.code, codes::WALLET_FROZEN);

        assert_eq!(
            store.wallet_balance(&sender.wallet_id).unwrap().balance_cents,
            OPENING_BALANCE_CENTS
        );
    }

    #[test]
    fn inactive_wallet_is_rejected() {
        let mut store = InMemoryStore::default();
        let receiver = store.wallet_by_user("user-b").unwrap();
        store.set_wallet_active(&receiver.wallet_id, false).unwrap();

        let err = store.transfer(transfer_request(None, 100)).unwrap_err();
        assert_eq!(err.code, codes::WALLET_INACTIVE);
    }

    #[test]
    fn completed_transfer_posts_balanced_ledger() {
        let mut store = InMemoryStore::default();
        let created = store.transfer(transfer_request(Some("k1"), 2_500)).unwrap().response;
        let detail = store.transaction(&created.transaction_id).unwrap();

        assert_eq!(detail.ledger_entries.len(), 2);
        let debit = &detail.ledger_entries[0];
        let credit = &detail.ledger_entries[1];
        assert_eq!(debit.entry_type, EntryType::Debit);
        assert_eq!(credit.entry_type, EntryType::Credit);
        assert_eq!(debit.amount_cents, credit.amount_cents);
        assert_eq!(debit.wallet_id, created.from_wallet_id);
        assert_eq!(debit.balance_after_cents, OPENING_BALANCE_CENTS - 2_500);
        assert_eq!(debit.gl_account_code, "1110");
        assert!(detail.completed_at.is_some());
    }

    #[test]
    fn large_round_transfer_is_flagged_but_completes() {
        let mut store = InMemoryStore::default();
        store.deposit("user-a", 60_000_000).unwrap();

        let created = store
            .transfer(transfer_request(Some("big-round"), 60_000_000))
            .unwrap()
            .response;
        assert_eq!(created.status, TransactionStatus::Completed);
        assert!(created.is_flagged);
        assert_eq!(created.fraud_score, 70);

        let detail = store.transaction(&created.transaction_id).unwrap();
        assert!(detail.fraud_reason.unwrap().contains("ROUND_AMOUNT"));
    }

    #[test]
    fn blocklisted_sender_is_blocked() {
        let mut store = InMemoryStore::new(crate::config::StoreConfig {
            fraud_blocklist: vec!["user-a".to_string()],
            ..Default::default()
        });
        let err = store.transfer(transfer_request(Some("k1"), 100)).unwrap_err();
        assert_eq!(err.status_code, 403);
        assert_eq!(err.code, codes::FRAUD_BLOCKED);
        assert!(store.by_idempotency_key("k1").is_none());
    }

    #[test]
    fn blocklisted_origin_ip_is_blocked() {
        let mut store = InMemoryStore::new(crate::config::StoreConfig {
            fraud_blocklist: vec!["203.0.113.7".to_string()],
            ..Default::default()
        });
        let err = store
            .transfer(TransferRequest {
                ip_address: Some("203.0.113.7".to_string()),
                ..transfer_request(Some("k1"), 100)
            })
            .unwrap_err();
        assert_eq!(err.code, codes::FRAUD_BLOCKED);
        assert_eq!(store.wallet_for_user("user-a").unwrap().balance_cents, OPENING_BALANCE_CENTS);

        let ok = store.transfer(transfer_request(Some("k2"), 100)).unwrap();
        assert_eq!(ok.response.status, TransactionStatus::Completed);
    }

    #[test]
    fn velocity_rule_counts_recent_transfers() {
        let mut store = InMemoryStore::default();
        for _ in 0..10 {
            store.transfer(transfer_request(None, 10)).unwrap();
        }
        let eleventh = store.transfer(transfer_request(None, 10)).unwrap().response;
        assert_eq!(eleventh.fraud_score, 40);
        assert!(!eleventh.is_flagged);
    }

    #[test]
    fn list_transactions_paginates_newest_first() {
        let mut store = InMemoryStore::default();
        let mut ids = Vec::new();
        for amount in 1..=5 {
            ids.push(store.transfer(transfer_request(None, amount)).unwrap().response.transaction_id);
        }
        let mut other = transfer_request(None, 7);
        other.from_user_id = "user-c".into();
        other.to_user_id = "user-d".into();
        store.transfer(other).unwrap();

        let page = store.list_transactions(&ListTransactionsQuery {
            user_id: Some("user-a".into()),
            page: Some(1),
            size: Some(2),
        });
        assert_eq!(page.total, 5);
        let got: Vec<_> = page.items.iter().map(|tx| tx.transaction_id.clone()).collect();
        assert_eq!(got, vec![ids[2].clone(), ids[1].clone()]);

        assert_eq!(store.list_transactions(&Default::default()).total, 6);
    }

    #[test]
    fn unknown_transaction_is_not_found() {
        let store = InMemoryStore::default();
        assert_eq!(store.transaction("nope").unwrap_err().status_code, 404);
    }
}
