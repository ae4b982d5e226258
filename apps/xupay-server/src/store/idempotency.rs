// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Idempotency-key index for transfers.
//!
//! Two layers: a bounded TTL cache for hot lookups, and a permanent map that
//! is the source of truth. A cache miss falls through to the map and
//! repopulates the cache.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::models::TransferResponse;

pub struct IdempotencyIndex {
    hot: TtlCache<TransferResponse>,
    records: HashMap<String, TransferResponse>,
}

impl IdempotencyIndex {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            hot: TtlCache::new(capacity, ttl),
            records: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<TransferResponse> {
        if let Some(hit) = self.hot.get(key) {
            tracing::debug!(idempotency_key = %key, "Idempotency cache hit");
            return Some(hit);
        }

        let stored = self.records.get(key)?.clone();
        tracing::debug!(idempotency_key = %key, "Idempotency index hit, repopulating cache");
        self.hot.put(key, stored.clone());
        Some(stored)
    }

    /// Bind `key` to `record`. The first binding wins; later calls for the
    /// same key are ignored and return `false`.
    pub fn insert(&mut self, key: &str, record: TransferResponse) -> bool {
        if self.records.contains_key(key) {
            return false;
        }
        self.hot.put(key, record.clone());
        self.records.insert(key.to_string(), record);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Normalize a client-supplied key: trimmed, blank treated as absent.
pub fn normalize_key(key: Option<&str>) -> Option<String> {
    key.map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TransactionStatus, TransactionType};
    use chrono::Utc;

    fn record(id: &str) -> TransferResponse {
        TransferResponse {
            transaction_id: id.to_string(),
            idempotency_key: Some("k1".to_string()),
            from_wallet_id: "w1".to_string(),
            to_wallet_id: "w2".to_string(),
            from_user_id: "a".to_string(),
            to_user_id: "b".to_string(),
            amount_cents: 1000,
            amount: 10.0,
            currency: "VND".to_string(),
            transaction_type: TransactionType::Transfer,
            status: TransactionStatus::Completed,
            description: None,
            is_flagged: false,
            fraud_score: 0,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn first_binding_wins() {
        let mut index = IdempotencyIndex::new(10, Duration::from_secs(60));
        assert!(index.insert("k1", record("tx-1")));
        assert!(!index.insert("k1", record("tx-2")));
        assert_eq!(index.get("k1").unwrap().transaction_id, "tx-1");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn falls_back_to_records_after_cache_expiry() {
        let mut index = IdempotencyIndex::new(10, Duration::from_millis(1));
        index.insert("k1", record("tx-1"));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(index.get("k1").unwrap().transaction_id, "tx-1");
    }

    #[test]
    fn falls_back_to_records_after_eviction() {
        let mut index = IdempotencyIndex::new(1, Duration::from_secs(60));
        index.insert("k1", record("tx-1"));
        index.insert("k2", record("tx-2"));

        assert!(index.contains("k1"));
        assert_eq!(index.get("k1").unwrap().transaction_id, "tx-1");
        assert_eq!(index.get("k2").unwrap().transaction_id, "tx-2");
    }

    #[test]
    fn unknown_key_is_none() {
        let index = IdempotencyIndex::new(10, Duration::from_secs(60));
        assert!(index.get("missing").is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn normalize_key_trims_and_drops_blank() {
        assert_eq!(normalize_key(Some(" k1 ")), Some("k1".to_string()));
        assert_eq!(normalize_key(Some("   ")), None);
        assert_eq!(normalize_key(None), None);
    }
}
