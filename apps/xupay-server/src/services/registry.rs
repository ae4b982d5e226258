// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client registry.
//!
//! Hands out the active [`UserService`] and [`PaymentService`]. Defaults are
//! built lazily from [`ClientConfig`]: HTTP clients unless `use_mocks` is
//! set, in which case both mocks share one seeded in-memory backend. An
//! explicit override replaces the default until it is reset with `None`.
//!
//! [`ClientRegistry`] is an ordinary value for callers that want scoped
//! wiring (tests, embedded use). The free functions operate on a
//! process-wide registry configured from the environment.

use std::sync::{Arc, OnceLock, RwLock};

use super::{
    MockPaymentService, MockUserService, PaymentService, PaymentServiceClient, TokenStorage,
    UserService, UserServiceClient,
};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub struct ClientRegistry {
    config: ClientConfig,
    tokens: TokenStorage,
    mock_state: OnceLock<AppState>,
    user: RwLock<Option<Arc<dyn UserService>>>,
    payment: RwLock<Option<Arc<dyn PaymentService>>>,
}

impl ClientRegistry {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            tokens: TokenStorage::new(),
            mock_state: OnceLock::new(),
            user: RwLock::new(None),
            payment: RwLock::new(None),
        }
    }

    /// Registry whose mocks run against `state` instead of a fresh backend.
    pub fn with_mock_state(config: ClientConfig, state: AppState) -> Self {
        let registry = Self::new(config);
        let _ = registry.mock_state.set(state);
        registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token slot shared by the default clients.
    pub fn tokens(&self) -> TokenStorage {
        self.tokens.clone()
    }

    /// Replace the user client. `None` restores the default.
    pub fn set_user_service(&self, client: Option<Arc<dyn UserService>>) {
        if let Ok(mut slot) = self.user.write() {
            *slot = client;
        }
    }

    /// Replace the payment client. `None` restores the default.
    pub fn set_payment_service(&self, client: Option<Arc<dyn PaymentService>>) {
        if let Ok(mut slot) = self.payment.write() {
            *slot = client;
        }
    }

    pub fn user_service(&self) -> Result<Arc<dyn UserService>, ApiError> {
        if let Some(client) = self.user.read().ok().and_then(|slot| slot.clone()) {
            return Ok(client);
        }
        let client = self.default_user_service()?;
        let mut slot = self
            .user
            .write()
            .map_err(|_| ApiError::internal("client registry lock poisoned"))?;
        Ok(slot.get_or_insert(client).clone())
    }

    pub fn payment_service(&self) -> Result<Arc<dyn PaymentService>, ApiError> {
        if let Some(client) = self.payment.read().ok().and_then(|slot| slot.clone()) {
            return Ok(client);
        }
        let client = self.default_payment_service()?;
        let mut slot = self
            .payment
            .write()
            .map_err(|_| ApiError::internal("client registry lock poisoned"))?;
        Ok(slot.get_or_insert(client).clone())
    }

    fn default_user_service(&self) -> Result<Arc<dyn UserService>, ApiError> {
        if self.config.use_mocks {
            return Ok(Arc::new(MockUserService::new(
                self.mock_state().clone(),
                self.tokens(),
            )));
        }
        let client = UserServiceClient::new(
            &self.config.user_service_url,
            self.config.request_timeout,
            self.tokens(),
        )?;
        Ok(Arc::new(client))
    }

    fn default_payment_service(&self) -> Result<Arc<dyn PaymentService>, ApiError> {
        if self.config.use_mocks {
            return Ok(Arc::new(MockPaymentService::new(
                self.mock_state().clone(),
                self.tokens(),
            )));
        }
        let client = PaymentServiceClient::new(
            &self.config.payment_service_url,
            self.config.request_timeout,
            self.tokens(),
        )?;
        Ok(Arc::new(client))
    }

    fn mock_state(&self) -> &AppState {
        self.mock_state.get_or_init(|| {
            let state = AppState::default();
            if let Ok(mut store) = state.store.try_write() {
                if let Err(e) = store.seed_demo_data() {
                    tracing::warn!(error = %e, "Failed to seed mock backend");
                }
            }
            tracing::info!("Using in-memory mock services");
            state
        })
    }
}

// =============================================================================
// Process-wide registry
// =============================================================================

static DEFAULT_REGISTRY: OnceLock<ClientRegistry> = OnceLock::new();

/// Registry configured from the environment on first use.
pub fn default_registry() -> &'static ClientRegistry {
    DEFAULT_REGISTRY.get_or_init(|| {
        let config = ClientConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid client configuration; using defaults");
            ClientConfig::default()
        });
        ClientRegistry::new(config)
    })
}

pub fn user_service_client() -> Result<Arc<dyn UserService>, ApiError> {
    default_registry().user_service()
}

pub fn payment_service_client() -> Result<Arc<dyn PaymentService>, ApiError> {
    default_registry().payment_service()
}

pub fn set_default_user_service_client(client: Option<Arc<dyn UserService>>) {
    default_registry().set_user_service(client);
}

pub fn set_default_payment_service_client(client: Option<Arc<dyn PaymentService>>) {
    default_registry().set_payment_service(client);
}
