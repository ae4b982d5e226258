// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::auth::TokenIssuer;
use crate::config::{DEFAULT_TOKEN_TTL_SECS, DEV_JWT_SECRET};
use crate::store::InMemoryStore;

/// Shared state: the store behind one lock, plus the token issuer.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<InMemoryStore>>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(store: InMemoryStore, tokens: TokenIssuer) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            tokens: Arc::new(tokens),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            InMemoryStore::default(),
            TokenIssuer::new(DEV_JWT_SECRET, Duration::from_secs(DEFAULT_TOKEN_TTL_SECS)),
        )
    }
}
