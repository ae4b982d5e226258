// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side access token storage.

use std::sync::{Arc, RwLock};

/// Shared slot holding the current access token.
///
/// Clones share the slot, so the user and payment clients built from one
/// registry see the same token: logging in through one authorizes the
/// other.
#[derive(Debug, Clone, Default)]
pub struct TokenStorage {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().ok().and_then(|token| token.clone())
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = None;
        }
    }
}
